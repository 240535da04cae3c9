//! Minimum-coverage evaluation for General Liability.
//!
//! Compares a certificate's stored GL limits against the most recent active
//! requirement for its client/project and records the verdict. Reuses the
//! persisted extraction snapshot; never re-runs extraction.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::repository::{get_certificate, requirement_for};
use crate::db::DatabaseError;
use crate::models::{CoverageCode, LobCode};

pub const GL_ENGINE_VERSION: &str = "gl-engine-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    NotEvaluated,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::NotEvaluated => "NOT_EVALUATED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COMPLIANT" => Some(Self::Compliant),
            "NON_COMPLIANT" => Some(Self::NonCompliant),
            "NOT_EVALUATED" => Some(Self::NotEvaluated),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceEvaluation {
    pub certificate_id: i64,
    pub lob_code: LobCode,
    pub engine_version: String,
    pub requirement_id: Option<i64>,
    pub status: ComplianceStatus,
    pub gap_count: u32,
    pub gap_summary: String,
}

/// Stored GL primary limits for a certificate, if any coverage exists.
fn gl_primary_limits(
    conn: &Connection,
    certificate_id: i64,
) -> Result<Option<(Option<f64>, Option<f64>)>, DatabaseError> {
    let policy_id: Option<i64> = conn
        .query_row(
            "SELECT id FROM policies
             WHERE certificate_id = ?1 AND lob_code = ?2
             ORDER BY id LIMIT 1",
            params![certificate_id, LobCode::GeneralLiability.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(policy_id) = policy_id else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT coverage_code, limit_amount FROM coverages
         WHERE policy_id = ?1 AND coverage_code IN (?2, ?3)",
    )?;
    let rows = stmt.query_map(
        params![
            policy_id,
            CoverageCode::GlEachOcc.as_str(),
            CoverageCode::GlAggregate.as_str()
        ],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?)),
    )?;

    let mut each = None;
    let mut agg = None;
    let mut any = false;
    for row in rows {
        let (code, amount) = row?;
        any = true;
        match code.as_str() {
            "GL_EACH_OCC" => each = amount,
            "GL_AGGREGATE" => agg = amount,
            _ => {}
        }
    }
    Ok(if any { Some((each, agg)) } else { None })
}

/// Evaluate GL compliance for one certificate and record the result.
pub fn evaluate_gl(
    conn: &Connection,
    certificate_id: i64,
) -> Result<ComplianceEvaluation, DatabaseError> {
    let certificate = get_certificate(conn, certificate_id)?;

    let requirement = requirement_for(
        conn,
        certificate.client_id,
        certificate.project_id,
        LobCode::GeneralLiability,
    )?;

    let evaluation = match requirement {
        None => {
            tracing::warn!(certificate_id, "No active GL requirement configured");
            ComplianceEvaluation {
                certificate_id,
                lob_code: LobCode::GeneralLiability,
                engine_version: GL_ENGINE_VERSION.to_string(),
                requirement_id: None,
                status: ComplianceStatus::NotEvaluated,
                gap_count: 1,
                gap_summary: "NO_REQUIREMENT_FOUND".to_string(),
            }
        }
        Some(requirement) => match gl_primary_limits(conn, certificate_id)? {
            None => {
                tracing::warn!(certificate_id, "No stored GL coverage to evaluate");
                ComplianceEvaluation {
                    certificate_id,
                    lob_code: LobCode::GeneralLiability,
                    engine_version: GL_ENGINE_VERSION.to_string(),
                    requirement_id: Some(requirement.id),
                    status: ComplianceStatus::NotEvaluated,
                    gap_count: 1,
                    gap_summary: "NO_GL_COVERAGE_FOUND".to_string(),
                }
            }
            Some((each, agg)) => {
                let each_min = requirement.each_occurrence_min.unwrap_or(0.0);
                let agg_min = requirement.general_aggregate_min.unwrap_or(0.0);
                let each_val = each.unwrap_or(0.0);
                let agg_val = agg.unwrap_or(0.0);

                let mut gaps = Vec::new();
                if each_val < each_min {
                    gaps.push(format!("EACH_OCCURRENCE_BELOW_MIN ({each_val} < {each_min})"));
                }
                if agg_val < agg_min {
                    gaps.push(format!("AGGREGATE_BELOW_MIN ({agg_val} < {agg_min})"));
                }

                let (status, gap_summary) = if gaps.is_empty() {
                    (ComplianceStatus::Compliant, "OK".to_string())
                } else {
                    (ComplianceStatus::NonCompliant, gaps.join("; "))
                };

                ComplianceEvaluation {
                    certificate_id,
                    lob_code: LobCode::GeneralLiability,
                    engine_version: GL_ENGINE_VERSION.to_string(),
                    requirement_id: Some(requirement.id),
                    status,
                    gap_count: gaps.len() as u32,
                    gap_summary,
                }
            }
        },
    };

    conn.execute(
        "INSERT INTO compliance_evaluations
            (certificate_id, lob_code, engine_version, requirement_id,
             status, gap_count, gap_summary, evaluated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            evaluation.certificate_id,
            evaluation.lob_code.as_str(),
            evaluation.engine_version,
            evaluation.requirement_id,
            evaluation.status.as_str(),
            evaluation.gap_count,
            evaluation.gap_summary,
            Utc::now().naive_utc(),
        ],
    )?;

    tracing::info!(
        certificate_id,
        status = %evaluation.status,
        gaps = evaluation.gap_count,
        "GL compliance evaluated"
    );
    Ok(evaluation)
}
