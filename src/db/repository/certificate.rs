//! Certificate rows: status writes and batch selection.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::CertificateStatus;

/// A certificate row as the pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRow {
    pub id: i64,
    pub client_id: i64,
    pub project_id: i64,
    pub file_path: String,
    pub extraction_status: CertificateStatus,
}

/// Insert a certificate in `Pending` status. Used by ingestion and tests.
pub fn insert_certificate(
    conn: &Connection,
    client_id: i64,
    project_id: i64,
    file_path: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO certificates (client_id, project_id, file_path, extraction_status)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            client_id,
            project_id,
            file_path,
            CertificateStatus::Pending.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_certificate(conn: &Connection, id: i64) -> Result<CertificateRow, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, client_id, project_id, file_path, extraction_status
             FROM certificates WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "certificate".to_string(),
            id: id.to_string(),
        })?;

    let status =
        CertificateStatus::from_str(&row.4).ok_or_else(|| DatabaseError::InvalidEnum {
            field: "extraction_status".to_string(),
            value: row.4.clone(),
        })?;

    Ok(CertificateRow {
        id: row.0,
        client_id: row.1,
        project_id: row.2,
        file_path: row.3,
        extraction_status: status,
    })
}

/// Write the certificate's extraction status. Independent of run-status
/// writes: each is its own causally ordered statement, never one transaction.
pub fn set_certificate_status(
    conn: &Connection,
    id: i64,
    status: CertificateStatus,
) -> Result<(), DatabaseError> {
    let now = Utc::now().naive_utc();
    let updated = conn.execute(
        "UPDATE certificates SET extraction_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "certificate".to_string(),
            id: id.to_string(),
        });
    }
    tracing::debug!(certificate_id = id, status = %status, "Certificate status updated");
    Ok(())
}

/// Certificates awaiting extraction, oldest id first, bounded by `limit`.
pub fn pending_certificates(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<CertificateRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, project_id, file_path, extraction_status
         FROM certificates
         WHERE extraction_status = ?1
         ORDER BY id
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![CertificateStatus::Pending.as_str(), limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut certificates = Vec::new();
    for row in rows {
        let row = row?;
        let status =
            CertificateStatus::from_str(&row.4).ok_or_else(|| DatabaseError::InvalidEnum {
                field: "extraction_status".to_string(),
                value: row.4.clone(),
            })?;
        certificates.push(CertificateRow {
            id: row.0,
            client_id: row.1,
            project_id: row.2,
            file_path: row.3,
            extraction_status: status,
        });
    }
    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_get_roundtrip() {
        let conn = open_memory_database().unwrap();
        let id = insert_certificate(&conn, 10, 20, "/docs/coi.pdf").unwrap();

        let cert = get_certificate(&conn, id).unwrap();
        assert_eq!(cert.client_id, 10);
        assert_eq!(cert.project_id, 20);
        assert_eq!(cert.file_path, "/docs/coi.pdf");
        assert_eq!(cert.extraction_status, CertificateStatus::Pending);
    }

    #[test]
    fn get_missing_certificate_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_certificate(&conn, 999).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn status_update_roundtrip() {
        let conn = open_memory_database().unwrap();
        let id = insert_certificate(&conn, 1, 1, "/a.pdf").unwrap();

        set_certificate_status(&conn, id, CertificateStatus::Extracted).unwrap();
        let cert = get_certificate(&conn, id).unwrap();
        assert_eq!(cert.extraction_status, CertificateStatus::Extracted);
    }

    #[test]
    fn status_update_on_missing_row_errors() {
        let conn = open_memory_database().unwrap();
        let err = set_certificate_status(&conn, 404, CertificateStatus::Failed).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn pending_selection_is_ordered_and_bounded() {
        let conn = open_memory_database().unwrap();
        let a = insert_certificate(&conn, 1, 1, "/a.pdf").unwrap();
        let b = insert_certificate(&conn, 1, 1, "/b.pdf").unwrap();
        let c = insert_certificate(&conn, 1, 1, "/c.pdf").unwrap();
        set_certificate_status(&conn, b, CertificateStatus::Extracted).unwrap();

        let pending = pending_certificates(&conn, 10).unwrap();
        let ids: Vec<i64> = pending.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, c]);

        let bounded = pending_certificates(&conn, 1).unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].id, a);
    }
}
