//! Configuration module for Sumi-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {} into {}", config.crawl.entrypoint, config.output.directory);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserSettings, Config, CrawlSettings, FailurePolicy, OutputSettings};

// Re-export parser functions
pub use parser::{load_config, read_config, read_config_with_hash};
pub use validation::validate;
