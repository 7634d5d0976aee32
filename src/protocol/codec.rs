//! SOCKS5 Wire Codec
//!
//! Stateless frame decoders and reply encoders. Every decode step issues its
//! own exact-length read; a short read is a framing error, never a retry.
//! Multi-byte integers are big-endian.

use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{
    Credentials, Socks5Greeting, Socks5Reply, Socks5RequestHeader, TargetAddr, TargetAddress,
};
use crate::error::ProtocolError;
use crate::protocol::constants::*;

/// Read the client greeting.
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
pub async fn read_greeting<R>(reader: &mut R) -> Result<Socks5Greeting, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ProtocolError::read("greeting header"))?;

    let version = header[0];
    if version != SOCKS5_VERSION {
        return Err(ProtocolError::Version(version));
    }

    let mut methods = vec![0u8; header[1] as usize];
    reader
        .read_exact(&mut methods)
        .await
        .map_err(ProtocolError::read("auth methods"))?;

    Ok(Socks5Greeting { version, methods })
}

/// Read the username/password sub-negotiation frame.
///
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
/// +----+------+----------+------+----------+
/// ```
pub async fn read_credentials<R>(reader: &mut R) -> Result<Credentials, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ProtocolError::read("userpass auth header"))?;

    if header[0] != SOCKS5_USERPASS_VERSION {
        return Err(ProtocolError::AuthVersion(header[0]));
    }

    let mut username = vec![0u8; header[1] as usize];
    reader
        .read_exact(&mut username)
        .await
        .map_err(ProtocolError::read("username"))?;

    let password_len = reader
        .read_u8()
        .await
        .map_err(ProtocolError::read("password length"))?;

    let mut password = vec![0u8; password_len as usize];
    reader
        .read_exact(&mut password)
        .await
        .map_err(ProtocolError::read("password"))?;

    Ok(Credentials { username, password })
}

/// Read the fixed request header.
///
/// ```text
/// +----+-----+-------+------+
/// |VER | CMD |  RSV  | ATYP |
/// +----+-----+-------+------+
/// | 1  |  1  | X'00' |  1   |
/// +----+-----+-------+------+
/// ```
pub async fn read_request_header<R>(reader: &mut R) -> Result<Socks5RequestHeader, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ProtocolError::read("request header"))?;

    if header[0] != SOCKS5_VERSION {
        return Err(ProtocolError::Version(header[0]));
    }

    Ok(Socks5RequestHeader {
        version: header[0],
        command: header[1],
        reserved: header[2],
        address_type: header[3],
    })
}

/// Read the address body selected by `address_type`.
pub async fn read_target_addr<R>(
    reader: &mut R,
    address_type: u8,
) -> Result<TargetAddr, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match address_type {
        SOCKS5_ADDR_IPV4 => {
            let mut octets = [0u8; 4];
            reader
                .read_exact(&mut octets)
                .await
                .map_err(ProtocolError::read("IPv4 address"))?;
            Ok(TargetAddr::Ipv4(Ipv4Addr::from(octets)))
        }
        SOCKS5_ADDR_DOMAIN => {
            let len = reader
                .read_u8()
                .await
                .map_err(ProtocolError::read("domain length"))?;
            if len == 0 {
                return Err(ProtocolError::EmptyDomain);
            }

            let mut name = vec![0u8; len as usize];
            reader
                .read_exact(&mut name)
                .await
                .map_err(ProtocolError::read("domain name"))?;
            let domain = String::from_utf8(name).map_err(|_| ProtocolError::DomainEncoding)?;
            Ok(TargetAddr::Domain(domain))
        }
        SOCKS5_ADDR_IPV6 => {
            let mut octets = [0u8; 16];
            reader
                .read_exact(&mut octets)
                .await
                .map_err(ProtocolError::read("IPv6 address"))?;
            Ok(TargetAddr::Ipv6(Ipv6Addr::from(octets)))
        }
        other => Err(ProtocolError::AddressType(other)),
    }
}

/// Read the 2-byte big-endian port that follows the address body.
pub async fn read_port<R>(reader: &mut R) -> Result<u16, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    reader
        .read_u16()
        .await
        .map_err(ProtocolError::read("port"))
}

/// Read address body and port.
pub async fn read_target_address<R>(
    reader: &mut R,
    address_type: u8,
) -> Result<TargetAddress, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let addr = read_target_addr(reader, address_type).await?;
    let port = read_port(reader).await?;
    Ok(TargetAddress::new(addr, port))
}

/// `VER METHOD`
pub fn encode_method_selection(method: u8) -> [u8; 2] {
    [SOCKS5_VERSION, method]
}

/// `VER STATUS` for the username/password sub-negotiation
pub fn encode_auth_status(success: bool) -> [u8; 2] {
    let status = if success {
        SOCKS5_USERPASS_SUCCESS
    } else {
        SOCKS5_USERPASS_FAILURE
    };
    [SOCKS5_USERPASS_VERSION, status]
}

/// Encode a reply.
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub fn encode_reply(reply: &Socks5Reply) -> Vec<u8> {
    let (address_type, address) = reply.bound_address();

    let mut bytes = Vec::with_capacity(6 + address.len());
    bytes.push(SOCKS5_VERSION);
    bytes.push(reply.reply_code as u8);
    bytes.push(SOCKS5_RESERVED);
    bytes.push(address_type);
    bytes.extend_from_slice(&address);
    bytes.extend_from_slice(&reply.bound.port().to_be_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ReplyCode;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_greeting() {
        let mut mock = Builder::new().read(&[5, 2, 0, 2]).build();
        let greeting = read_greeting(&mut mock).await.unwrap();
        assert_eq!(greeting.version, 5);
        assert_eq!(greeting.methods, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_read_greeting_without_methods() {
        let mut mock = Builder::new().read(&[5, 0]).build();
        let greeting = read_greeting(&mut mock).await.unwrap();
        assert!(greeting.methods.is_empty());
    }

    #[tokio::test]
    async fn test_read_greeting_rejects_socks4() {
        let mut mock = Builder::new().read(&[4, 1]).build();
        let err = read_greeting(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Version(4)));
    }

    #[tokio::test]
    async fn test_read_greeting_short_read() {
        // Announces three methods but only delivers one
        let mut mock = Builder::new().read(&[5, 3, 0]).build();
        match read_greeting(&mut mock).await.unwrap_err() {
            ProtocolError::Read { what, source } => {
                assert_eq!(what, "auth methods");
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_credentials() {
        let mut mock = Builder::new()
            .read(&[1, 5])
            .read(b"alice")
            .read(&[3])
            .read(b"pw!")
            .build();
        let creds = read_credentials(&mut mock).await.unwrap();
        assert_eq!(creds.username, b"alice");
        assert_eq!(creds.password, b"pw!");
    }

    #[tokio::test]
    async fn test_read_credentials_bad_version() {
        let mut mock = Builder::new().read(&[5, 1]).build();
        let err = read_credentials(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::AuthVersion(5)));
    }

    #[tokio::test]
    async fn test_read_request_header() {
        let mut mock = Builder::new().read(&[5, 1, 0, 3]).build();
        let header = read_request_header(&mut mock).await.unwrap();
        assert_eq!(header.command, SOCKS5_CMD_CONNECT);
        assert_eq!(header.address_type, SOCKS5_ADDR_DOMAIN);
    }

    #[tokio::test]
    async fn test_read_ipv4_target() {
        let mut mock = Builder::new().read(&[127, 0, 0, 1, 0x23, 0x28]).build();
        let target = read_target_address(&mut mock, SOCKS5_ADDR_IPV4).await.unwrap();
        assert_eq!(target.addr.host(), "127.0.0.1");
        assert_eq!(target.port, 9000);
        assert_eq!(target.to_string(), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_read_domain_target_is_not_resolved() {
        let mut mock = Builder::new()
            .read(&[11])
            .read(b"example.com")
            .read(&[0, 80])
            .build();
        let target = read_target_address(&mut mock, SOCKS5_ADDR_DOMAIN).await.unwrap();
        assert_eq!(target.addr, TargetAddr::Domain("example.com".to_string()));
        assert_eq!(target.port, 80);
    }

    #[tokio::test]
    async fn test_read_ipv6_target() {
        let mut body = Ipv6Addr::LOCALHOST.octets().to_vec();
        body.extend_from_slice(&443u16.to_be_bytes());
        let mut mock = Builder::new().read(&body).build();
        let target = read_target_address(&mut mock, SOCKS5_ADDR_IPV6).await.unwrap();
        assert_eq!(target.addr, TargetAddr::Ipv6(Ipv6Addr::LOCALHOST));
        assert_eq!(target.to_string(), "[::1]:443");
    }

    #[tokio::test]
    async fn test_read_target_unknown_type() {
        let mut mock = Builder::new().build();
        let err = read_target_addr(&mut mock, 0x02).await.unwrap_err();
        assert!(matches!(err, ProtocolError::AddressType(0x02)));
    }

    #[tokio::test]
    async fn test_read_empty_domain() {
        let mut mock = Builder::new().read(&[0]).build();
        let err = read_target_addr(&mut mock, SOCKS5_ADDR_DOMAIN).await.unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyDomain));
    }

    #[tokio::test]
    async fn test_read_non_utf8_domain() {
        let mut mock = Builder::new().read(&[2]).read(&[0xff, 0xfe]).build();
        let err = read_target_addr(&mut mock, SOCKS5_ADDR_DOMAIN).await.unwrap_err();
        assert!(matches!(err, ProtocolError::DomainEncoding));
    }

    #[tokio::test]
    async fn test_read_empty_credentials() {
        let mut mock = Builder::new().read(&[1, 0, 0]).build();
        let creds = read_credentials(&mut mock).await.unwrap();
        assert!(creds.username.is_empty());
        assert!(creds.password.is_empty());
    }

    #[test]
    fn test_encode_error_reply() {
        let reply = Socks5Reply::error(ReplyCode::CommandNotSupported);
        assert_eq!(encode_reply(&reply), vec![5, 7, 0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_success_reply() {
        let reply = Socks5Reply::success("10.1.2.3:8080".parse().unwrap());
        assert_eq!(encode_reply(&reply), vec![5, 0, 0, 1, 10, 1, 2, 3, 0x1F, 0x90]);

        let reply = Socks5Reply::success("[2001:db8::1]:1".parse().unwrap());
        let bytes = encode_reply(&reply);
        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[3], SOCKS5_ADDR_IPV6);
        assert_eq!(&bytes[20..], &[0, 1]);
    }

    #[test]
    fn test_encode_small_frames() {
        assert_eq!(encode_method_selection(SOCKS5_AUTH_USERPASS), [5, 2]);
        assert_eq!(encode_auth_status(true), [1, 0]);
        assert_eq!(encode_auth_status(false), [1, 1]);
    }
}
