//! Certo turns scanned or digitally-produced Certificates of Insurance into
//! structured General Liability coverage records.
//!
//! The pipeline classifies raw text, extracts dates, policy identifiers and
//! monetary limits with multi-strategy regex parsing, filters implausible
//! values, attaches a composite quality score, escalates to an external AI
//! extraction path when heuristics fall short, and persists each outcome as
//! a replaceable snapshot. Run state is an explicit machine with bounded
//! acquisition retries and per-certificate failure isolation.

pub mod compliance;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding binaries. Honors RUST_LOG, falling back
/// to the crate default. Call once at process start.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
