//! Error types for docketwatch.
//!
//! Library crates use [`DocketwatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! The variants mirror the pipeline's failure taxonomy: a fetch failure
//! aborts the whole run, a parse failure is isolated to one feed entry,
//! a ledger failure is fatal at dedup-read and commit time, an enrichment
//! failure leaves the record unenriched, and a delivery failure blocks the
//! ledger commit so the next run retries the same records.

use std::path::PathBuf;

/// Top-level error type for all docketwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum DocketwatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Feed unreachable, timed out, or returned a non-success status.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A single feed entry could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Delivery ledger storage fault (disk/connection), never duplicate keys.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Enrichment failure (document fetch, text extraction, or model call).
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// The delivery sink reported failure for the rendered digest.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocketwatchError>;

impl DocketwatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a ledger error from any displayable message.
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    /// Create an enrichment error from any displayable message.
    pub fn enrichment(msg: impl Into<String>) -> Self {
        Self::Enrichment(msg.into())
    }

    /// Create a delivery error from any displayable message.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
