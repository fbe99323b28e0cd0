//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{Context, bail};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(display) = std::env::var("X11RELAY_DISPLAY") {
            config.display.number = display.parse::<u16>()
                .with_context(|| format!("Invalid X11RELAY_DISPLAY: {}", display))?;
        }

        if let Ok(socket_dir) = std::env::var("X11RELAY_SOCKET_DIR") {
            config.display.socket_dir = PathBuf::from(socket_dir);
        }

        if let Ok(tcp_host) = std::env::var("X11RELAY_TCP_HOST") {
            config.display.tcp_host = tcp_host.parse::<IpAddr>()
                .with_context(|| format!("Invalid X11RELAY_TCP_HOST: {}", tcp_host))?;
        }

        if let Ok(buffer_size) = std::env::var("X11RELAY_BUFFER_SIZE") {
            config.relay.buffer_size = buffer_size.parse::<usize>()
                .with_context(|| format!("Invalid X11RELAY_BUFFER_SIZE: {}", buffer_size))?;
        }

        if let Ok(single) = std::env::var("X11RELAY_SINGLE_CONNECTION") {
            config.forwarding.single_connection = single.parse::<bool>()
                .with_context(|| format!("Invalid X11RELAY_SINGLE_CONNECTION: {}", single))?;
        }

        if let Ok(log_level) = std::env::var("X11RELAY_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_display_config()
            .with_context(|| "Display configuration validation failed")?;

        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    /// Validate display configuration
    fn validate_display_config(&self) -> Result<()> {
        if self.display.tcp_addr().is_none() {
            bail!(
                "display {} is out of range for base port {}",
                self.display.number,
                self.display.base_port
            );
        }

        if self.display.socket_dir.as_os_str().is_empty() {
            bail!("display.socket_dir must not be empty");
        }

        Ok(())
    }

    /// Validate relay configuration
    fn validate_relay_config(&self) -> Result<()> {
        if self.relay.buffer_size < 1024 {
            bail!("buffer_size must be at least 1024 bytes");
        }

        if self.relay.buffer_size > 1048576 {
            bail!("buffer_size cannot exceed 1MB");
        }

        if self.relay.outcome_capacity == 0 {
            bail!("outcome_capacity must be greater than 0");
        }

        if self.relay.error_sink_capacity == 0 {
            bail!("error_sink_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Validate logging configuration
    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        display: Option<u16>,
        single_connection: bool,
        buffer_size: Option<usize>,
    ) {
        if let Some(number) = display {
            self.display.number = number;
            tracing::info!("CLI override: display set to :{}", number);
        }

        if single_connection {
            self.forwarding.single_connection = true;
            tracing::info!("CLI override: single connection forwarding enabled");
        }

        if let Some(buffer_size) = buffer_size {
            self.relay.buffer_size = buffer_size;
            tracing::info!("CLI override: buffer size set to {} bytes", buffer_size);
        }
    }
}
