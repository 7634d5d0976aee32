//! CONNECT Request Handler

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::codec::{encode_reply, read_request_header, read_target_address};
use super::{ReplyCode, Socks5Reply, TargetAddress, SOCKS5_CMD_CONNECT};
use crate::error::{ProtocolError, SessionError};

/// Outbound connection established on behalf of a client
#[derive(Debug)]
pub struct ConnectedTarget {
    pub stream: TcpStream,
    pub target: TargetAddress,
    /// Proxy's local endpoint of the outbound connection
    pub bound: SocketAddr,
}

/// Decodes a CONNECT request, dials the target and answers the client
#[derive(Debug, Clone, Default)]
pub struct RequestHandler {
    connect_timeout: Option<Duration>,
}

impl RequestHandler {
    /// Dial without a deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on a dial after `connect_timeout`, reporting the target unreachable
    pub fn with_connect_timeout(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Handle the client's request and return the connected target.
    ///
    /// A wrong version drops the connection without a reply. Unsupported
    /// commands and address types, and failed dials, are answered with the
    /// matching error reply before the error is returned.
    pub async fn handle<S>(&self, client: &mut S) -> Result<ConnectedTarget, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let header = read_request_header(client).await?;

        if header.command != SOCKS5_CMD_CONNECT {
            warn!(command = header.command, "Unsupported command");
            send_reply(client, &Socks5Reply::error(ReplyCode::CommandNotSupported)).await?;
            return Err(SessionError::UnsupportedCommand(header.command));
        }

        let target = match read_target_address(client, header.address_type).await {
            Ok(target) => target,
            Err(ProtocolError::AddressType(address_type)) => {
                warn!(address_type, "Unsupported address type");
                send_reply(client, &Socks5Reply::error(ReplyCode::AddressTypeNotSupported)).await?;
                return Err(ProtocolError::AddressType(address_type).into());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(dest = %target, "CONNECT request received");

        let stream = match self.dial(&target).await {
            Ok(stream) => stream,
            Err(e) => {
                send_reply(client, &Socks5Reply::error(ReplyCode::HostUnreachable)).await?;
                return Err(e);
            }
        };

        let bound = reply_connected(client, &target, stream.local_addr()).await?;
        info!(dest = %target, bound = %bound, "Connected to target");

        Ok(ConnectedTarget {
            stream,
            target,
            bound,
        })
    }

    /// Dial `host:port`; domain names are resolved here
    async fn dial(&self, target: &TargetAddress) -> Result<TcpStream, SessionError> {
        let addr = target.to_string();
        let connect = TcpStream::connect(addr.as_str());

        let result = match self.connect_timeout {
            Some(limit) => match timeout(limit, connect).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", limit),
                )),
            },
            None => connect.await,
        };

        result.map_err(|source| SessionError::Dial {
            target: addr,
            source,
        })
    }
}

/// Answer a completed dial. The bound address is reported on success; if it
/// cannot be read the client is told the host is unreachable.
async fn reply_connected<S>(
    client: &mut S,
    target: &TargetAddress,
    bound: std::io::Result<SocketAddr>,
) -> Result<SocketAddr, SessionError>
where
    S: AsyncWrite + Unpin,
{
    match bound {
        Ok(bound) => {
            send_reply(client, &Socks5Reply::success(bound)).await?;
            Ok(bound)
        }
        Err(source) => {
            send_reply(client, &Socks5Reply::error(ReplyCode::HostUnreachable)).await?;
            Err(SessionError::Dial {
                target: target.to_string(),
                source,
            })
        }
    }
}

async fn send_reply<S>(client: &mut S, reply: &Socks5Reply) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    client
        .write_all(&encode_reply(reply))
        .await
        .map_err(SessionError::write("reply"))
}
