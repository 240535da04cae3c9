//! Minimum-coverage requirement lookup.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::LobCode;

/// A minimum-limit requirement configured for a client/project.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRequirement {
    pub id: i64,
    pub client_id: i64,
    pub project_id: i64,
    pub lob_code: LobCode,
    pub each_occurrence_min: Option<f64>,
    pub general_aggregate_min: Option<f64>,
    pub effective_from: NaiveDate,
    pub is_active: bool,
}

/// Insert a requirement. Used by seeding and tests; rule CRUD lives outside
/// this crate.
pub fn insert_requirement(
    conn: &Connection,
    client_id: i64,
    project_id: i64,
    lob_code: LobCode,
    each_occurrence_min: Option<f64>,
    general_aggregate_min: Option<f64>,
    effective_from: NaiveDate,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO coverage_requirements
            (client_id, project_id, lob_code, each_occurrence_min,
             general_aggregate_min, effective_from, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![
            client_id,
            project_id,
            lob_code.as_str(),
            each_occurrence_min,
            general_aggregate_min,
            effective_from,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent active requirement for a client/project/LOB, or none.
pub fn requirement_for(
    conn: &Connection,
    client_id: i64,
    project_id: i64,
    lob_code: LobCode,
) -> Result<Option<CoverageRequirement>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, client_id, project_id, lob_code, each_occurrence_min,
                    general_aggregate_min, effective_from, is_active
             FROM coverage_requirements
             WHERE lob_code = ?1
               AND is_active = 1
               AND client_id = ?2
               AND project_id = ?3
             ORDER BY effective_from DESC, id DESC
             LIMIT 1",
            params![lob_code.as_str(), client_id, project_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, NaiveDate>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            },
        )
        .optional()?;

    let Some(row) = row else { return Ok(None) };
    let lob = LobCode::from_str(&row.3).ok_or_else(|| DatabaseError::InvalidEnum {
        field: "lob_code".to_string(),
        value: row.3.clone(),
    })?;

    Ok(Some(CoverageRequirement {
        id: row.0,
        client_id: row.1,
        project_id: row.2,
        lob_code: lob,
        each_occurrence_min: row.4,
        general_aggregate_min: row.5,
        effective_from: row.6,
        is_active: row.7,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn lookup_returns_most_recent_active() {
        let conn = open_memory_database().unwrap();
        insert_requirement(
            &conn,
            1,
            2,
            LobCode::GeneralLiability,
            Some(1_000_000.0),
            Some(2_000_000.0),
            date(2023, 1, 1),
        )
        .unwrap();
        let newer = insert_requirement(
            &conn,
            1,
            2,
            LobCode::GeneralLiability,
            Some(2_000_000.0),
            Some(4_000_000.0),
            date(2024, 1, 1),
        )
        .unwrap();

        let req = requirement_for(&conn, 1, 2, LobCode::GeneralLiability)
            .unwrap()
            .unwrap();
        assert_eq!(req.id, newer);
        assert_eq!(req.each_occurrence_min, Some(2_000_000.0));
    }

    #[test]
    fn lookup_scoped_by_client_and_project() {
        let conn = open_memory_database().unwrap();
        insert_requirement(
            &conn,
            1,
            2,
            LobCode::GeneralLiability,
            Some(1_000_000.0),
            None,
            date(2024, 1, 1),
        )
        .unwrap();

        assert!(requirement_for(&conn, 1, 3, LobCode::GeneralLiability)
            .unwrap()
            .is_none());
        assert!(requirement_for(&conn, 9, 2, LobCode::GeneralLiability)
            .unwrap()
            .is_none());
    }

    #[test]
    fn inactive_requirements_ignored() {
        let conn = open_memory_database().unwrap();
        let id = insert_requirement(
            &conn,
            1,
            2,
            LobCode::GeneralLiability,
            Some(1_000_000.0),
            None,
            date(2024, 1, 1),
        )
        .unwrap();
        conn.execute(
            "UPDATE coverage_requirements SET is_active = 0 WHERE id = ?1",
            params![id],
        )
        .unwrap();

        assert!(requirement_for(&conn, 1, 2, LobCode::GeneralLiability)
            .unwrap()
            .is_none());
    }

    #[test]
    fn lob_codes_do_not_cross() {
        let conn = open_memory_database().unwrap();
        insert_requirement(
            &conn,
            1,
            2,
            LobCode::AutoLiability,
            Some(1_000_000.0),
            None,
            date(2024, 1, 1),
        )
        .unwrap();

        assert!(requirement_for(&conn, 1, 2, LobCode::GeneralLiability)
            .unwrap()
            .is_none());
    }
}
