//! Configuration for use-methods
//!
//! This crate provides:
//! - Configuration file loading (TOML)
//! - Engine defaults (MethodsConfig)

pub mod config_file;
pub mod methods_config;

pub use config_file::{load_config_file, load_config_file_from};
pub use methods_config::MethodsConfig;
