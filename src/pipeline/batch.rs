//! Batch driver: runs the orchestrator over pending certificates.
//!
//! Selection and iteration only. One certificate's failure
//! is recorded and the batch moves on.

use std::time::Instant;

use rusqlite::Connection;

use crate::db::repository::pending_certificates;
use crate::db::DatabaseError;
use crate::models::RunStatus;
use crate::pipeline::acquire::DocumentRef;
use crate::pipeline::runner::{PipelineDeps, RunOrchestrator};

/// Summary of one batch pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self {
            processed: 0,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Process up to `batch_size` PENDING certificates, oldest id first.
pub fn process_pending_batch(
    conn: &Connection,
    deps: &PipelineDeps<'_>,
    orchestrator: &RunOrchestrator,
    batch_size: u32,
) -> Result<BatchResult, DatabaseError> {
    let start = Instant::now();
    let pending = pending_certificates(conn, batch_size)?;

    if pending.is_empty() {
        tracing::info!("No pending certificates");
        return Ok(BatchResult::empty());
    }

    tracing::info!(count = pending.len(), "Processing pending certificates");
    let mut result = BatchResult::empty();

    for cert in pending {
        let doc = DocumentRef::new(&cert.file_path);
        result.processed += 1;

        match orchestrator.process_certificate(conn, deps, cert.id, &doc) {
            Ok(summary) if summary.status == RunStatus::Success => {
                result.succeeded += 1;
            }
            Ok(summary) => {
                result.failed += 1;
                result.errors.push(format!(
                    "certificate {}: {} ({})",
                    cert.id,
                    summary.status,
                    summary.error.as_deref().unwrap_or("no detail")
                ));
            }
            Err(e) => {
                result.failed += 1;
                result.errors.push(format!("certificate {}: {e}", cert.id));
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        processed = result.processed,
        succeeded = result.succeeded,
        failed = result.failed,
        "Batch complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::db::repository::{get_certificate, insert_certificate, set_certificate_status};
    use crate::db::sqlite::open_memory_database;
    use crate::models::CertificateStatus;
    use crate::pipeline::acquire::{
        AcquiredText, AcquisitionConfig, AcquisitionError, PageText, TextAcquirer, TextProvider,
    };
    use crate::pipeline::classify::DocumentClassifier;
    use crate::pipeline::runner::RunnerConfig;

    const GOOD_TEXT: &str = "GENERAL LIABILITY\n\
        POLICY NUMBER: GL-1234567 EFF 01/15/2024 EXP 01/15/2025\n\
        EACH OCCURRENCE $1,000,000\n\
        GENERAL AGGREGATE $2,000,000";

    /// Serves good text except for documents whose path contains "broken".
    struct PathSensitiveAcquirer;

    impl TextAcquirer for PathSensitiveAcquirer {
        fn acquire(
            &self,
            doc: &DocumentRef,
            config: &AcquisitionConfig,
        ) -> Result<AcquiredText, AcquisitionError> {
            if doc.path.to_string_lossy().contains("broken") {
                return Err(AcquisitionError::DocumentUnreadable("bad scan".to_string()));
            }
            Ok(AcquiredText {
                pages: vec![PageText::from_text(1, GOOD_TEXT)],
                provider: TextProvider::NativeLayer,
                used_fallback: false,
                mode: config.mode,
            })
        }
    }

    fn test_orchestrator() -> RunOrchestrator {
        RunOrchestrator::new(RunnerConfig {
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            ..RunnerConfig::default()
        })
    }

    fn run_batch(conn: &rusqlite::Connection, batch_size: u32) -> BatchResult {
        let acquirer = PathSensitiveAcquirer;
        let classifier = DocumentClassifier::new();
        let deps = PipelineDeps {
            acquirer: &acquirer,
            cache: None,
            ai: None,
            renderer: None,
            classifier: &classifier,
        };
        process_pending_batch(conn, &deps, &test_orchestrator(), batch_size).unwrap()
    }

    #[test]
    fn empty_queue_is_a_noop() {
        let conn = open_memory_database().unwrap();
        let result = run_batch(&conn, 10);
        assert_eq!(result, BatchResult::empty());
    }

    #[test]
    fn batch_continues_past_a_failed_certificate() {
        let conn = open_memory_database().unwrap();
        let good_a = insert_certificate(&conn, 1, 1, "/docs/a.pdf").unwrap();
        let broken = insert_certificate(&conn, 1, 1, "/docs/broken.pdf").unwrap();
        let good_b = insert_certificate(&conn, 1, 1, "/docs/b.pdf").unwrap();

        let result = run_batch(&conn, 10);

        assert_eq!(result.processed, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains(&broken.to_string()));

        assert_eq!(
            get_certificate(&conn, good_a).unwrap().extraction_status,
            CertificateStatus::Extracted
        );
        assert_eq!(
            get_certificate(&conn, broken).unwrap().extraction_status,
            CertificateStatus::Failed
        );
        assert_eq!(
            get_certificate(&conn, good_b).unwrap().extraction_status,
            CertificateStatus::Extracted
        );
    }

    #[test]
    fn batch_size_bounds_the_selection() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            insert_certificate(&conn, 1, 1, &format!("/docs/{i}.pdf")).unwrap();
        }

        let result = run_batch(&conn, 2);
        assert_eq!(result.processed, 2);

        // The rest stay pending for the next pass.
        let remaining = crate::db::repository::pending_certificates(&conn, 10).unwrap();
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn non_pending_certificates_are_not_selected() {
        let conn = open_memory_database().unwrap();
        let done = insert_certificate(&conn, 1, 1, "/docs/done.pdf").unwrap();
        set_certificate_status(&conn, done, CertificateStatus::Extracted).unwrap();

        let result = run_batch(&conn, 10);
        assert_eq!(result.processed, 0);
    }
}
