//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

const MAX_CREDENTIAL_LEN: usize = 255;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist.
    ///
    /// Runs before logging is installed, so nothing here logs.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::load_from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn load_from_str(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Override fields from `SOCKS5LITE_*` environment variables
    pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// arbitrary variable source
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SOCKS5LITE_PORT") {
            config.server.port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid SOCKS5LITE_PORT: {}", port))?;
        }

        if let Some(ip) = lookup("SOCKS5LITE_LISTEN_IP") {
            config.server.listen_ip = ip
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid SOCKS5LITE_LISTEN_IP: {}", ip))?;
        }

        if let Some(max_conn) = lookup("SOCKS5LITE_MAX_CONNECTIONS") {
            config.server.max_connections = Some(
                max_conn
                    .parse::<usize>()
                    .with_context(|| format!("Invalid SOCKS5LITE_MAX_CONNECTIONS: {}", max_conn))?,
            );
        }

        if let Some(timeout) = lookup("SOCKS5LITE_HANDSHAKE_TIMEOUT") {
            config.server.handshake_timeout = Some(
                humantime::parse_duration(&timeout)
                    .with_context(|| format!("Invalid SOCKS5LITE_HANDSHAKE_TIMEOUT: {}", timeout))?,
            );
        }

        if let Some(timeout) = lookup("SOCKS5LITE_CONNECT_TIMEOUT") {
            config.server.connect_timeout = Some(
                humantime::parse_duration(&timeout)
                    .with_context(|| format!("Invalid SOCKS5LITE_CONNECT_TIMEOUT: {}", timeout))?,
            );
        }

        if let Some(need_auth) = lookup("SOCKS5LITE_NEED_AUTH") {
            config.auth.need_auth = need_auth
                .parse::<bool>()
                .with_context(|| format!("Invalid SOCKS5LITE_NEED_AUTH: {}", need_auth))?;
        }

        if let Some(username) = lookup("SOCKS5LITE_USERNAME") {
            config.auth.username = username;
        }

        if let Some(password) = lookup("SOCKS5LITE_PASSWORD") {
            config.auth.password = password;
        }

        if let Some(level) = lookup("SOCKS5LITE_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

/// Command-line overrides, highest priority
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub listen_ip: Option<IpAddr>,
    pub port: Option<u16>,
    pub need_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .context("Server configuration validation failed")?;

        self.validate_auth_config()
            .context("Authentication configuration validation failed")?;

        self.validate_logging_config()
            .context("Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_connections == Some(0) {
            bail!("max_connections must be greater than 0 when set");
        }

        if self.server.handshake_timeout == Some(Duration::ZERO) {
            bail!("handshake_timeout must be greater than 0 when set");
        }

        if self.server.connect_timeout == Some(Duration::ZERO) {
            bail!("connect_timeout must be greater than 0 when set");
        }

        Ok(())
    }

    /// Credentials only matter when authentication is enabled
    fn validate_auth_config(&self) -> Result<()> {
        if !self.auth.need_auth {
            return Ok(());
        }

        if self.auth.username.is_empty() {
            bail!("username must be set when need_auth is enabled");
        }

        if self.auth.username.len() > MAX_CREDENTIAL_LEN {
            bail!("username exceeds {} bytes", MAX_CREDENTIAL_LEN);
        }

        if self.auth.password.len() > MAX_CREDENTIAL_LEN {
            bail!("password exceeds {} bytes", MAX_CREDENTIAL_LEN);
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments, returning the names of the settings that
    /// were overridden
    pub fn merge_with_cli_args(&mut self, cli: &CliOverrides) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(ip) = cli.listen_ip {
            self.server.listen_ip = ip;
            applied.push("server.listen_ip");
        }

        if let Some(port) = cli.port {
            self.server.port = port;
            applied.push("server.port");
        }

        if cli.need_auth {
            self.auth.need_auth = true;
            applied.push("auth.need_auth");
        }

        if let Some(username) = &cli.username {
            self.auth.username = username.clone();
            applied.push("auth.username");
        }

        if let Some(password) = &cli.password {
            self.auth.password = password.clone();
            applied.push("auth.password");
        }

        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
            applied.push("logging.level");
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 1080);
        assert!(!config.auth.need_auth);
        assert_eq!(config.server.max_connections, None);
        assert_eq!(config.server.connect_timeout, None);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:1080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = ConfigManager::load_from_str(
            r#"
            [server]
            port = 2080
            connect_timeout = "5s"

            [auth]
            need_auth = true
            username = "proxy"
            password = "pa55"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 2080);
        assert_eq!(config.server.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.server.handshake_timeout, None);
        assert!(config.auth.need_auth);
        assert_eq!(config.auth.username, "proxy");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ConfigManager::load_from_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_credentials_ignored_without_auth() {
        let mut config = Config::default();
        config.auth.username = String::new();
        config.auth.password = "x".repeat(400);
        assert!(config.validate().is_ok());

        config.auth.need_auth = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_requires_username() {
        let mut config = Config::default();
        config.auth.need_auth = true;
        config.auth.password = "secret".into();
        assert!(config.validate().is_err());

        config.auth.username = "admin".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = Config::default();
        config.server.max_connections = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.connect_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SOCKS5LITE_PORT", "9050"),
            ("SOCKS5LITE_NEED_AUTH", "true"),
            ("SOCKS5LITE_USERNAME", "env-user"),
            ("SOCKS5LITE_PASSWORD", "env-pass"),
            ("SOCKS5LITE_CONNECT_TIMEOUT", "1m"),
            ("SOCKS5LITE_MAX_CONNECTIONS", "64"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        ConfigManager::apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9050);
        assert!(config.auth.need_auth);
        assert_eq!(config.auth.username, "env-user");
        assert_eq!(config.server.connect_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.server.max_connections, Some(64));

        let applied = config.merge_with_cli_args(&CliOverrides {
            port: Some(1081),
            ..Default::default()
        });
        assert_eq!(applied, vec!["server.port"]);
        assert_eq!(config.server.port, 1081);
        assert_eq!(config.auth.username, "env-user");
    }

    #[test]
    fn test_cli_overrides_are_reported() {
        let mut config = Config::default();
        let applied = config.merge_with_cli_args(&CliOverrides {
            listen_ip: Some("127.0.0.1".parse().unwrap()),
            need_auth: true,
            username: Some("cli-user".into()),
            password: Some("cli-pass".into()),
            ..Default::default()
        });

        assert_eq!(
            applied,
            vec![
                "server.listen_ip",
                "auth.need_auth",
                "auth.username",
                "auth.password"
            ]
        );
        assert!(config.auth.need_auth);
        assert_eq!(config.auth.username, "cli-user");

        assert!(config.merge_with_cli_args(&CliOverrides::default()).is_empty());
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let result = ConfigManager::apply_overrides(&mut config, |key| {
            (key == "SOCKS5LITE_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
