//! Shared types, error model, and configuration for docketwatch.
//!
//! This crate is the foundation depended on by all other docketwatch crates.
//! It provides:
//! - [`DocketwatchError`] — the unified error type
//! - Domain types ([`CaseRecord`], [`DocumentKind`], [`Category`])
//! - Configuration ([`AppConfig`], config loading, secret resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DeliveryConfig, EnrichmentConfig, FeedConfig, LedgerConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    resolve_smtp_password,
};
pub use error::{DocketwatchError, Result};
pub use types::{CaseRecord, Category, DocumentKind, UNKNOWN_ORIGIN};
