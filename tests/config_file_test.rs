//! Configuration file loading

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use socks5lite::config::ConfigManager;
use socks5lite::Config;

#[test]
fn test_load_full_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[server]
listen_ip = "127.0.0.1"
port = 1090
max_connections = 128
handshake_timeout = "10s"
connect_timeout = "3s"

[auth]
need_auth = true
username = "admin"
password = "hunter2"

[logging]
level = "debug"
"#
    )
    .unwrap();

    let config = ConfigManager::load_from_file(file.path()).unwrap();
    assert_eq!(config.listen_addr().to_string(), "127.0.0.1:1090");
    assert_eq!(config.server.max_connections, Some(128));
    assert_eq!(config.server.handshake_timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.server.connect_timeout, Some(Duration::from_secs(3)));
    assert!(config.auth.need_auth);
    assert_eq!(config.auth.username, "admin");
    assert_eq!(config.auth.password, "hunter2");
    assert_eq!(config.logging.level, "debug");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigManager::load_from_file(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[server]\nport = \"not a number\"\n").unwrap();

    let err = ConfigManager::load_from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_password_is_not_printed() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "[auth]\nneed_auth = true\nusername = \"admin\"\npassword = \"hunter2\"\n"
    )
    .unwrap();

    let config = ConfigManager::load_from_file(file.path()).unwrap();
    let printed = format!("{:?}", config);
    assert!(printed.contains("admin"));
    assert!(!printed.contains("hunter2"));
}
