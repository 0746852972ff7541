//! Shared types, error model, and configuration for oobswap.
//!
//! This crate is the foundation depended on by all other oobswap crates.
//! It provides:
//! - [`OobError`]: the unified error type
//! - Domain types ([`SwapStrategy`], [`SwapTiming`], interval parsing)
//! - Configuration ([`AppConfig`], [`SwapConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, SwapConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, render_config,
};
pub use error::{OobError, Result};
pub use types::{SwapStrategy, SwapTiming, format_interval, parse_interval};
