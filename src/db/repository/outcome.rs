//! Extraction outcome persistence.
//!
//! An outcome is a snapshot: `replace_outcome` deletes everything previously
//! extracted for the certificate and inserts the new record set inside one
//! transaction, scoped to that certificate only.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{
    CoverageCode, ExtractedClause, ExtractedCoverage, ExtractedPolicy, ExtractionOutcome, LobCode,
    SourceMethod,
};

/// Replace the stored outcome for `outcome.certificate_id` with this one.
pub fn replace_outcome(conn: &Connection, outcome: &ExtractionOutcome) -> Result<(), DatabaseError> {
    if !outcome.references_resolve() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "outcome for certificate {} has dangling policy references",
            outcome.certificate_id
        )));
    }

    let certificate_id = outcome.certificate_id;
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "DELETE FROM policy_clauses WHERE policy_id IN
            (SELECT id FROM policies WHERE certificate_id = ?1)",
        params![certificate_id],
    )?;
    tx.execute(
        "DELETE FROM coverages WHERE policy_id IN
            (SELECT id FROM policies WHERE certificate_id = ?1)",
        params![certificate_id],
    )?;
    tx.execute(
        "DELETE FROM policies WHERE certificate_id = ?1",
        params![certificate_id],
    )?;
    tx.execute(
        "DELETE FROM extraction_outcomes WHERE certificate_id = ?1",
        params![certificate_id],
    )?;

    let mut policy_ids: HashMap<usize, i64> = HashMap::new();
    for (index, policy) in outcome.policies.iter().enumerate() {
        tx.execute(
            "INSERT INTO policies (certificate_id, lob_code, carrier_name, policy_number,
                                   effective_date, expiration_date, cancellation_notice_days,
                                   source_method, confidence_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                certificate_id,
                policy.lob_code.as_str(),
                policy.carrier_name,
                policy.policy_number,
                policy.effective_date,
                policy.expiration_date,
                policy.cancellation_notice_days,
                policy.source_method.as_str(),
                policy.confidence_score,
            ],
        )?;
        policy_ids.insert(index, tx.last_insert_rowid());
    }

    for coverage in &outcome.coverages {
        let policy_id = policy_ids[&coverage.policy_index];
        tx.execute(
            "INSERT INTO coverages (policy_id, coverage_code, limit_amount, limit_currency,
                                    source_method, confidence_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                policy_id,
                coverage.coverage_code.as_str(),
                coverage.limit_amount,
                coverage.limit_currency,
                coverage.source_method.as_str(),
                coverage.confidence_score,
            ],
        )?;
    }

    for clause in &outcome.clauses {
        let policy_id = policy_ids[&clause.policy_index];
        tx.execute(
            "INSERT INTO policy_clauses (policy_id, clause_code, clause_text,
                                         source_method, confidence_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                policy_id,
                clause.clause_code,
                clause.clause_text,
                clause.source_method.as_str(),
                clause.confidence_score,
            ],
        )?;
    }

    tx.execute(
        "INSERT INTO extraction_outcomes (certificate_id, source_method, quality_score, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            certificate_id,
            outcome.source_method.as_str(),
            outcome.quality_score,
            Utc::now().naive_utc(),
        ],
    )?;

    tx.commit()?;
    tracing::info!(
        certificate_id,
        policies = outcome.policies.len(),
        coverages = outcome.coverages.len(),
        quality = outcome.quality_score,
        "Extraction outcome replaced"
    );
    Ok(())
}

/// Reconstruct the stored outcome for a certificate, if any.
pub fn outcome_for_certificate(
    conn: &Connection,
    certificate_id: i64,
) -> Result<Option<ExtractionOutcome>, DatabaseError> {
    let header = conn
        .query_row(
            "SELECT source_method, quality_score FROM extraction_outcomes
             WHERE certificate_id = ?1",
            params![certificate_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )
        .optional()?;
    let Some((source, quality_score)) = header else {
        return Ok(None);
    };
    let source_method = parse_source(&source)?;

    let mut stmt = conn.prepare(
        "SELECT id, lob_code, carrier_name, policy_number, effective_date, expiration_date,
                cancellation_notice_days, source_method, confidence_score
         FROM policies WHERE certificate_id = ?1 ORDER BY id",
    )?;
    let policy_rows = stmt.query_map(params![certificate_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<chrono::NaiveDate>>(4)?,
            row.get::<_, Option<chrono::NaiveDate>>(5)?,
            row.get::<_, Option<u32>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, f64>(8)?,
        ))
    })?;

    let mut policies = Vec::new();
    let mut index_by_policy_id: HashMap<i64, usize> = HashMap::new();
    for row in policy_rows {
        let row = row?;
        index_by_policy_id.insert(row.0, policies.len());
        policies.push(ExtractedPolicy {
            lob_code: LobCode::from_str(&row.1).ok_or_else(|| DatabaseError::InvalidEnum {
                field: "lob_code".to_string(),
                value: row.1.clone(),
            })?,
            carrier_name: row.2,
            policy_number: row.3,
            effective_date: row.4,
            expiration_date: row.5,
            cancellation_notice_days: row.6,
            source_method: parse_source(&row.7)?,
            confidence_score: row.8,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT c.policy_id, c.coverage_code, c.limit_amount, c.limit_currency,
                c.source_method, c.confidence_score
         FROM coverages c
         JOIN policies p ON p.id = c.policy_id
         WHERE p.certificate_id = ?1
         ORDER BY c.id",
    )?;
    let coverage_rows = stmt.query_map(params![certificate_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<f64>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, f64>(5)?,
        ))
    })?;

    let mut coverages = Vec::new();
    for row in coverage_rows {
        let row = row?;
        coverages.push(ExtractedCoverage {
            policy_index: index_by_policy_id[&row.0],
            coverage_code: CoverageCode::from_str(&row.1).ok_or_else(|| {
                DatabaseError::InvalidEnum {
                    field: "coverage_code".to_string(),
                    value: row.1.clone(),
                }
            })?,
            limit_amount: row.2,
            limit_currency: row.3,
            source_method: parse_source(&row.4)?,
            confidence_score: row.5,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT c.policy_id, c.clause_code, c.clause_text, c.source_method, c.confidence_score
         FROM policy_clauses c
         JOIN policies p ON p.id = c.policy_id
         WHERE p.certificate_id = ?1
         ORDER BY c.id",
    )?;
    let clause_rows = stmt.query_map(params![certificate_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
        ))
    })?;

    let mut clauses = Vec::new();
    for row in clause_rows {
        let row = row?;
        clauses.push(ExtractedClause {
            policy_index: index_by_policy_id[&row.0],
            clause_code: row.1,
            clause_text: row.2,
            source_method: parse_source(&row.3)?,
            confidence_score: row.4,
        });
    }

    Ok(Some(ExtractionOutcome {
        certificate_id,
        policies,
        coverages,
        clauses,
        source_method,
        quality_score,
    }))
}

fn parse_source(value: &str) -> Result<SourceMethod, DatabaseError> {
    SourceMethod::from_str(value).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "source_method".to_string(),
        value: value.to_string(),
    })
}
