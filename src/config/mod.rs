//! Configuration Module
//! 
//! Display location, request defaults and relay sizing, loaded from TOML,
//! the environment or CLI overrides.

pub mod manager;
pub mod types;

pub use manager::ConfigManager;
pub use types::*;
