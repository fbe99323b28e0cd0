//! x11relay - X11 forwarding toolkit
//!
//! Operator commands around the forwarding library: inspect the request that
//! would be sent and check which local display transport is reachable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use x11relay::{
    config::{Config, ConfigManager},
    protocol::{CookieGenerator, ForwardingRequest, X11_REQUEST},
    transport::DisplayResolver,
};

/// CLI arguments for x11relay
#[derive(Parser, Debug)]
#[command(name = "x11relay")]
#[command(about = "X11 display forwarding over SSH")]
#[command(version)]
#[command(long_about = "
x11relay - X11 display forwarding over SSH

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  X11RELAY_DISPLAY            - Local display number (e.g., 0)
  X11RELAY_SOCKET_DIR         - Directory holding X<n> display sockets
  X11RELAY_TCP_HOST           - Host of the TCP display fallback
  X11RELAY_BUFFER_SIZE        - Relay buffer size in bytes
  X11RELAY_SINGLE_CONNECTION  - Forward a single connection (true/false)
  X11RELAY_LOG_LEVEL          - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "x11relay.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Local display number (overrides config file)
    #[arg(short, long, help = "Local display number")]
    pub display: Option<u16>,

    /// Ask the remote side to forward one connection only
    #[arg(long, help = "Forward a single X11 connection")]
    pub single_connection: bool,

    /// Buffer size in bytes
    #[arg(long, help = "Relay buffer size in bytes")]
    pub buffer_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a forwarding request and print its wire payload
    Request {
        /// Print the request as JSON instead of hex
        #[arg(long)]
        json: bool,
    },
    /// Connect to the local display the way forwarded channels would
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(args.display, args.single_connection, args.buffer_size);

    init_tracing(&args, &config)?;

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Display: :{}", config.display.number);
        info!("  Unix socket: {}", config.display.socket_path().display());
        if let Some(addr) = config.display.tcp_addr() {
            info!("  TCP fallback: {}", addr);
        }
        info!("  Buffer size: {} bytes", config.relay.buffer_size);
        info!("  Single connection: {}", config.forwarding.single_connection);
        return Ok(());
    }

    match args.command.unwrap_or(Command::Probe) {
        Command::Request { json } => print_request(&config, json),
        Command::Probe => probe(&config).await,
    }
}

fn print_request(config: &Config, json: bool) -> Result<()> {
    let request = ForwardingRequest::new(&mut CookieGenerator::new())
        .with_single_connection(config.forwarding.single_connection)
        .with_screen_number(config.forwarding.screen_number);

    if request.auth_cookie.is_empty() {
        anyhow::bail!("Random source unavailable, could not generate auth cookie");
    }

    if json {
        let rendered = serde_json::to_string_pretty(&request)
            .context("Failed to serialize forwarding request")?;
        println!("{}", rendered);
    } else {
        println!("{} {}", X11_REQUEST, hex::encode(request.encode()));
    }

    Ok(())
}

async fn probe(config: &Config) -> Result<()> {
    let resolver = DisplayResolver::new(&config.display)?;
    info!(
        "Probing display :{} ({} target(s))",
        config.display.number,
        resolver.plan().len()
    );

    match resolver.resolve().await {
        Ok((_stream, target)) => {
            info!("Local display reachable at {}", target);
            println!("{}", target);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e).context("Local display is not reachable")
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(&config.logging.level)
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
