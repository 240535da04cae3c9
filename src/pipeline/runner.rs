//! Run orchestration: drives one certificate from text acquisition through
//! persisted outcome as an explicit state machine.
//!
//! Acquisition is the only retried stage (bounded attempts, exponential
//! delay, retryable failures only). Extraction, scoring, and persistence
//! failures are terminal for the run; an operator resets the run to PENDING
//! for another attempt. Run-status and certificate-status writes are
//! separate, causally ordered statements so a crash leaves an inspectable
//! trail: a run stuck in ACQUIRING_TEXT signals an interrupted process.

use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::db::repository::{
    create_run, replace_outcome, set_certificate_status, set_run_provider, set_run_status,
};
use crate::models::{CertificateStatus, ExtractionRun, RunStatus, SourceMethod};
use crate::pipeline::acquire::{
    content_hash, AcquiredText, AcquisitionConfig, AcquisitionError, CachedText, DocumentRef,
    PageText, TextAcquirer, TextCache,
};
use crate::pipeline::classify::DocumentClassifier;
use crate::pipeline::fallback::{escalate, AiExtractor, PageRenderer};
use crate::pipeline::parsing::extract_certificate;
use crate::pipeline::PipelineError;

/// Orchestrator tuning. Defaults mirror production behavior.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Total acquisition attempts before the run fails.
    pub max_acquisition_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Upper bound on any single retry delay.
    pub backoff_cap: Duration,
    pub acquisition: AcquisitionConfig,
    /// Heuristic scores below this trigger AI escalation.
    pub quality_acceptance_threshold: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_acquisition_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(10),
            acquisition: AcquisitionConfig::default(),
            quality_acceptance_threshold: 0.7,
        }
    }
}

/// External collaborators, injected per call.
pub struct PipelineDeps<'a> {
    pub acquirer: &'a dyn TextAcquirer,
    pub cache: Option<&'a dyn TextCache>,
    pub ai: Option<&'a dyn AiExtractor>,
    pub renderer: Option<&'a dyn PageRenderer>,
    pub classifier: &'a DocumentClassifier,
}

/// What one run did, for batch reporting and operator queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub certificate_id: i64,
    pub run_id: String,
    pub status: RunStatus,
    pub quality_score: Option<f64>,
    pub source_method: Option<SourceMethod>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Drives Classification → Extraction → Scoring → (Fallback) → Persistence
/// for one certificate at a time.
pub struct RunOrchestrator {
    config: RunnerConfig,
}

impl RunOrchestrator {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Process one certificate end to end.
    ///
    /// Step failures land in the run's terminal status with a readable
    /// detail string; `Err` is reserved for the persistence layer itself
    /// being unusable (nothing further can be recorded).
    pub fn process_certificate(
        &self,
        conn: &Connection,
        deps: &PipelineDeps<'_>,
        certificate_id: i64,
        doc: &DocumentRef,
    ) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        tracing::info!(certificate_id, "Processing certificate");

        let mut run = create_run(conn, certificate_id)?;
        set_certificate_status(conn, certificate_id, CertificateStatus::Processing)?;

        self.advance(conn, &mut run, RunStatus::AcquiringText, None)?;

        let acquired = match self.acquire_with_retry(deps, doc) {
            Ok(acquired) => acquired,
            Err(e) => {
                let detail = format!("text acquisition failed: {e}");
                tracing::error!(certificate_id, error = %e, "Acquisition failed, run is terminal");
                self.advance(conn, &mut run, RunStatus::AcquisitionFailed, Some(&detail))?;
                set_certificate_status(conn, certificate_id, CertificateStatus::Failed)?;
                return Ok(self.summary(&run, start, None, None, Some(detail)));
            }
        };
        set_run_provider(conn, &run.id, acquired.provider.as_str())?;

        self.advance(conn, &mut run, RunStatus::Parsing, None)?;

        let text = acquired.full_text();
        let classification = deps.classifier.classify(&text);
        tracing::info!(
            certificate_id,
            doc_type = %classification.doc_type,
            confidence = classification.confidence,
            "Document classified"
        );

        // Classification never gates extraction: GL parsing runs for every
        // document and the scorer catches nonsense output.
        let mut chosen = extract_certificate(certificate_id, &acquired.pages);

        if chosen.report.score < self.config.quality_acceptance_threshold {
            if let Some(ai) = deps.ai {
                if let Some(better) = escalate(
                    ai,
                    deps.renderer,
                    certificate_id,
                    doc,
                    &text,
                    &chosen,
                    self.config.quality_acceptance_threshold,
                ) {
                    chosen = better;
                }
            } else {
                tracing::debug!(certificate_id, "No AI extractor configured, keeping heuristic result");
            }
        }

        if chosen.report.score <= 0.0 || chosen.outcome.is_empty() {
            let detail = "no usable data extracted (quality score 0)".to_string();
            tracing::error!(certificate_id, "Parsing produced no usable data");
            self.advance(conn, &mut run, RunStatus::ParsingFailed, Some(&detail))?;
            set_certificate_status(conn, certificate_id, CertificateStatus::Failed)?;
            return Ok(self.summary(&run, start, None, None, Some(detail)));
        }

        if let Err(e) = replace_outcome(conn, &chosen.outcome) {
            let detail = format!("failed to persist outcome: {e}");
            tracing::error!(certificate_id, error = %e, "Persistence failed, run is terminal");
            self.advance(conn, &mut run, RunStatus::Failed, Some(&detail))?;
            set_certificate_status(conn, certificate_id, CertificateStatus::Failed)?;
            return Ok(self.summary(&run, start, None, None, Some(detail)));
        }

        self.advance(conn, &mut run, RunStatus::Success, None)?;
        set_certificate_status(conn, certificate_id, CertificateStatus::Extracted)?;

        tracing::info!(
            certificate_id,
            quality = chosen.report.score,
            source = %chosen.outcome.source_method,
            "Certificate processed"
        );
        Ok(self.summary(
            &run,
            start,
            Some(chosen.report.score),
            Some(chosen.outcome.source_method),
            None,
        ))
    }

    /// Checked state-machine move. Illegal transitions are a logic error and
    /// surface instead of writing.
    fn advance(
        &self,
        conn: &Connection,
        run: &mut ExtractionRun,
        next: RunStatus,
        detail: Option<&str>,
    ) -> Result<(), PipelineError> {
        if !run.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: run.status,
                to: next,
            });
        }
        set_run_status(conn, &run.id, next, detail)?;
        run.status = next;
        Ok(())
    }

    /// Cache lookup, then bounded retry around the acquirer. Only
    /// [`AcquisitionError::retryable`] failures are retried.
    fn acquire_with_retry(
        &self,
        deps: &PipelineDeps<'_>,
        doc: &DocumentRef,
    ) -> Result<AcquiredText, AcquisitionError> {
        if let Some(cache) = deps.cache {
            match content_hash(&doc.path) {
                Ok(hash) => {
                    if let Some(cached) = cache.get(&hash) {
                        tracing::info!(doc = %doc.path.display(), "Serving text from cache");
                        return Ok(AcquiredText {
                            pages: vec![PageText::from_text(1, cached.text)],
                            provider: cached.provider,
                            used_fallback: false,
                            mode: self.config.acquisition.mode,
                        });
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Could not hash document for cache lookup");
                }
            }
        }

        let mut attempt = 1;
        loop {
            match deps.acquirer.acquire(doc, &self.config.acquisition) {
                Ok(acquired) => {
                    if let Some(cache) = deps.cache {
                        if let Ok(hash) = content_hash(&doc.path) {
                            cache.put(
                                &hash,
                                &CachedText {
                                    text: acquired.full_text(),
                                    provider: acquired.provider,
                                },
                            );
                        }
                    }
                    return Ok(acquired);
                }
                Err(e) if e.retryable() && attempt < self.config.max_acquisition_attempts => {
                    let delay = backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Acquisition attempt failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn summary(
        &self,
        run: &ExtractionRun,
        start: Instant,
        quality_score: Option<f64>,
        source_method: Option<SourceMethod>,
        error: Option<String>,
    ) -> RunSummary {
        RunSummary {
            certificate_id: run.certificate_id,
            run_id: run.id.clone(),
            status: run.status,
            quality_score,
            source_method,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Exponential delay: base doubles per completed attempt, bounded by `cap`.
fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << (attempt - 1).min(16);
    cap.min(base.saturating_mul(factor))
}
