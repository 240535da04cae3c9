//! Extraction run rows: creation, status writes, queries, and the explicit
//! reset operation.
//!
//! Status writes here are raw row updates; the orchestrator owns transition
//! legality via [`RunStatus::can_transition_to`]. The one place this module
//! enforces state is `reset_to_pending`, the single sanctioned backward move.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{CertificateStatus, ExtractionRun, RunStatus};

use super::certificate::set_certificate_status;

pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a run for a certificate. The row is born `Started` (creation is
/// the PENDING → STARTED transition).
pub fn create_run(conn: &Connection, certificate_id: i64) -> Result<ExtractionRun, DatabaseError> {
    let run = ExtractionRun {
        id: new_run_id(),
        certificate_id,
        status: RunStatus::Started,
        provider: None,
        error_detail: None,
        started_at: Utc::now().naive_utc(),
        finished_at: None,
    };

    conn.execute(
        "INSERT INTO extraction_runs (id, certificate_id, status, started_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![run.id, run.certificate_id, run.status.as_str(), run.started_at],
    )?;

    tracing::info!(run_id = %run.id, certificate_id, "Extraction run created");
    Ok(run)
}

pub fn get_run(conn: &Connection, run_id: &str) -> Result<ExtractionRun, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, certificate_id, status, provider, error_detail, started_at, finished_at
             FROM extraction_runs WHERE id = ?1",
            params![run_id],
            map_run_row,
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "extraction_run".to_string(),
            id: run_id.to_string(),
        })?;
    run_from_row(row)
}

/// All runs for a certificate, most recent first. Read-only inspection.
pub fn runs_for_certificate(
    conn: &Connection,
    certificate_id: i64,
) -> Result<Vec<ExtractionRun>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, certificate_id, status, provider, error_detail, started_at, finished_at
         FROM extraction_runs
         WHERE certificate_id = ?1
         ORDER BY started_at DESC, id",
    )?;
    let rows = stmt.query_map(params![certificate_id], map_run_row)?;

    let mut runs = Vec::new();
    for row in rows {
        runs.push(run_from_row(row?)?);
    }
    Ok(runs)
}

/// Write a run's status. Terminal statuses also stamp `finished_at`.
pub fn set_run_status(
    conn: &Connection,
    run_id: &str,
    status: RunStatus,
    error_detail: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = if status.is_terminal() {
        conn.execute(
            "UPDATE extraction_runs
             SET status = ?1, error_detail = ?2, finished_at = ?3
             WHERE id = ?4",
            params![status.as_str(), error_detail, Utc::now().naive_utc(), run_id],
        )?
    } else {
        conn.execute(
            "UPDATE extraction_runs SET status = ?1, error_detail = ?2 WHERE id = ?3",
            params![status.as_str(), error_detail, run_id],
        )?
    };

    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "extraction_run".to_string(),
            id: run_id.to_string(),
        });
    }
    tracing::info!(run_id, status = %status, "Run status updated");
    Ok(())
}

/// Record which text provider served the run.
pub fn set_run_provider(
    conn: &Connection,
    run_id: &str,
    provider: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE extraction_runs SET provider = ?1 WHERE id = ?2",
        params![provider, run_id],
    )?;
    Ok(())
}

/// Explicit external reset: return a terminally-failed run and its
/// certificate to `Pending` for a fresh attempt. The only sanctioned
/// backward move in the state machine; succeeded runs stay final.
pub fn reset_to_pending(conn: &Connection, run_id: &str) -> Result<(), DatabaseError> {
    let run = get_run(conn, run_id)?;
    if !run.status.is_resettable() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "run {run_id} is {} and cannot be reset",
            run.status
        )));
    }

    conn.execute(
        "UPDATE extraction_runs
         SET status = ?1, error_detail = NULL, finished_at = NULL
         WHERE id = ?2",
        params![RunStatus::Pending.as_str(), run_id],
    )?;
    set_certificate_status(conn, run.certificate_id, CertificateStatus::Pending)?;

    tracing::info!(run_id, certificate_id = run.certificate_id, "Run reset to PENDING");
    Ok(())
}

type RunRow = (
    String,
    i64,
    String,
    Option<String>,
    Option<String>,
    chrono::NaiveDateTime,
    Option<chrono::NaiveDateTime>,
);

fn map_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn run_from_row(row: RunRow) -> Result<ExtractionRun, DatabaseError> {
    let status = RunStatus::from_str(&row.2).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "status".to_string(),
        value: row.2.clone(),
    })?;
    Ok(ExtractionRun {
        id: row.0,
        certificate_id: row.1,
        status,
        provider: row.3,
        error_detail: row.4,
        started_at: row.5,
        finished_at: row.6,
    })
}
