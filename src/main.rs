//! socks5lite - a small SOCKS5 proxy server
//!
//! CONNECT only, with optional username/password authentication.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use socks5lite::{
    config::{CliOverrides, ConfigManager},
    Config, ConnectionManager,
};

/// CLI arguments for socks5lite
#[derive(Parser, Debug)]
#[command(name = "socks5lite")]
#[command(about = "socks5lite - a small SOCKS5 proxy server")]
#[command(version)]
#[command(long_about = "
socks5lite - a small SOCKS5 proxy server (CONNECT only)

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  SOCKS5LITE_LISTEN_IP          - Listen address (e.g., 127.0.0.1)
  SOCKS5LITE_PORT               - Listen port
  SOCKS5LITE_NEED_AUTH          - Require username/password (true/false)
  SOCKS5LITE_USERNAME           - Username
  SOCKS5LITE_PASSWORD           - Password
  SOCKS5LITE_MAX_CONNECTIONS    - Cap on concurrent sessions
  SOCKS5LITE_HANDSHAKE_TIMEOUT  - Handshake deadline (e.g., 10s)
  SOCKS5LITE_CONNECT_TIMEOUT    - Dial deadline (e.g., 5s)
  SOCKS5LITE_LOG_LEVEL          - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "socks5lite.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Port to listen on (overrides config file)
    #[arg(short, long, help = "Port to listen on")]
    pub port: Option<u16>,

    /// Listen address (overrides config file)
    #[arg(long, help = "IP address to listen on")]
    pub listen_ip: Option<IpAddr>,

    /// Require username/password authentication
    #[arg(long, help = "Require username/password authentication")]
    pub need_auth: bool,

    #[arg(long, help = "Username for authentication")]
    pub username: Option<String>,

    #[arg(long, help = "Password for authentication")]
    pub password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

impl CliArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            listen_ip: self.listen_ip,
            port: self.port,
            need_auth: self.need_auth,
            username: self.username.clone(),
            password: self.password.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let (config, cli_overrides) = load_config(&args)?;

    init_tracing(&config, args.verbose)?;

    info!("Starting socks5lite v{}", env!("CARGO_PKG_VERSION"));
    if args.config.exists() {
        info!("Loaded configuration from: {}", args.config.display());
    } else {
        warn!(
            "Configuration file {} not found, using defaults",
            args.config.display()
        );
    }
    for setting in cli_overrides {
        info!("CLI override: {}", setting);
    }

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Listen address: {}", config.listen_addr());
        info!(
            "  Authentication: {}",
            if config.auth.need_auth {
                "enabled"
            } else {
                "disabled"
            }
        );
        info!("  Max connections: {:?}", config.server.max_connections);
        info!("  Handshake timeout: {:?}", config.server.handshake_timeout);
        info!("  Connect timeout: {:?}", config.server.connect_timeout);
        return Ok(());
    }

    let listen_addr = config.listen_addr();
    let manager = ConnectionManager::new(Arc::new(config));
    let server = manager.start(listen_addr).await?;

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shut down");
    server.shutdown_coordinator().wait_for_os_signal().await?;

    server.stop().await?;
    info!("Server shutdown complete");

    Ok(())
}

/// Load configuration: file, then environment, then CLI, then validate.
///
/// Also returns the settings the CLI overrode, to be logged once tracing is up.
fn load_config(args: &CliArgs) -> Result<(Config, Vec<&'static str>)> {
    let mut config = ConfigManager::load_from_file(&args.config)?;
    ConfigManager::apply_env_overrides(&mut config)?;
    let cli_overrides = config.merge_with_cli_args(&args.overrides());

    config
        .validate()
        .context("Final configuration validation failed")?;

    Ok((config, cli_overrides))
}

/// Initialize tracing/logging
fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true),
        )
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
