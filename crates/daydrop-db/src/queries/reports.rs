use anyhow::Result;
use rusqlite::Connection;

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Report, ReportTarget};

use super::{Inserted, OptionalExt, insert_unique};
use crate::models::ReportRow;
use crate::now_timestamp;

/// Live report by `reporter_id` against one target.
pub fn find_report(
    conn: &Connection,
    reporter_id: DbId,
    target: ReportTarget,
    target_id: DbId,
) -> Result<Lookup<Report>> {
    let row = conn
        .query_row(
            "SELECT id, reporter_id, target_kind, target_id, reason, created_at FROM reports
             WHERE reporter_id = ?1 AND target_kind = ?2 AND target_id = ?3 AND deleted_at IS NULL",
            (reporter_id, target.code(), target_id),
            |row| {
                Ok(ReportRow {
                    id: row.get(0)?,
                    reporter_id: row.get(1)?,
                    target_kind: row.get(2)?,
                    target_id: row.get(3)?,
                    reason: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    row.map(Report::try_from).transpose().map(Lookup::from)
}

pub fn insert_report(
    conn: &Connection,
    reporter_id: DbId,
    target: ReportTarget,
    target_id: DbId,
    reason: &str,
) -> Result<Inserted<Report>> {
    let created_at = now_timestamp();
    let inserted = insert_unique(
        conn,
        "INSERT INTO reports (reporter_id, target_kind, target_id, reason, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        (reporter_id, target.code(), target_id, reason, &created_at),
    )?;

    match inserted {
        Inserted::Created(id) => Ok(Inserted::Created(Report::try_from(ReportRow {
            id,
            reporter_id,
            target_kind: target.code(),
            target_id,
            reason: reason.to_string(),
            created_at,
        })?)),
        Inserted::Duplicate => Ok(Inserted::Duplicate),
    }
}
