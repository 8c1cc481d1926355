//! Core pipeline orchestration for docketwatch.
//!
//! This crate ties together feed ingestion, ledger deduplication, LLM
//! enrichment, and digest delivery into the end-to-end `run_digest` workflow.

pub mod enrichment;
pub mod pipeline;

pub use enrichment::EnrichmentStats;
pub use pipeline::{run_digest, RunOptions, RunProgress, RunReport, SilentProgress};
