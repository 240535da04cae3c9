//! The extraction pipeline: acquisition, classification, parsing, scoring,
//! AI fallback, and run orchestration.

pub mod acquire;
pub mod batch;
pub mod classify;
pub mod fallback;
pub mod parsing;
pub mod runner;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::RunStatus;

use self::acquire::AcquisitionError;

/// Failures that end a run. Acquisition errors may retry first; everything
/// else is terminal the moment it happens.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("text acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("no usable data extracted: {0}")]
    NoUsableData(String),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("illegal run status transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}
