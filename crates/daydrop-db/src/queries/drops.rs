use anyhow::Result;
use rusqlite::{Connection, Row};

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Drop, DropNotification};

use super::{Inserted, OptionalExt, insert_unique};
use crate::models::{DropNotificationRow, DropRow};
use crate::{Database, now_timestamp};

const DROP_COLUMNS: &str = "id, drop_notification_id, created_by_id, caption, created_at";

impl Database {
    // -- Drop notifications --

    pub fn insert_notification(&self, kind: &str) -> Result<DropNotification> {
        self.with_conn_mut(|conn| insert_notification(conn, kind))
    }

    pub fn current_notification(&self) -> Result<Lookup<DropNotification>> {
        self.with_conn(current_notification)
    }
}

pub fn insert_notification(conn: &Connection, kind: &str) -> Result<DropNotification> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO drop_notifications (type, created_at) VALUES (?1, ?2)",
        (kind, &created_at),
    )?;

    DropNotification::try_from(DropNotificationRow {
        id: conn.last_insert_rowid(),
        kind: kind.to_string(),
        created_at,
    })
}

/// The most recently inserted notification. AUTOINCREMENT ids give the
/// store's own insertion order; `created_at` comes from the writer's clock.
pub fn current_notification(conn: &Connection) -> Result<Lookup<DropNotification>> {
    let row = conn
        .query_row(
            "SELECT id, type, created_at FROM drop_notifications
             ORDER BY id DESC
             LIMIT 1",
            [],
            |row| {
                Ok(DropNotificationRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;

    row.map(DropNotification::try_from).transpose().map(Lookup::from)
}

// -- Drops --

pub fn find_drop(conn: &Connection, id: DbId) -> Result<Lookup<Drop>> {
    let sql = format!("SELECT {DROP_COLUMNS} FROM drops WHERE id = ?1 AND deleted_at IS NULL");
    let row = conn.query_row(&sql, [id], drop_row).optional()?;

    row.map(Drop::try_from).transpose().map(Lookup::from)
}

/// Live drop by `created_by_id` against `drop_notification_id`.
pub fn find_drop_for(conn: &Connection, drop_notification_id: DbId, created_by_id: DbId) -> Result<Lookup<Drop>> {
    let sql = format!(
        "SELECT {DROP_COLUMNS} FROM drops
         WHERE drop_notification_id = ?1 AND created_by_id = ?2 AND deleted_at IS NULL"
    );
    let row = conn
        .query_row(&sql, (drop_notification_id, created_by_id), drop_row)
        .optional()?;

    row.map(Drop::try_from).transpose().map(Lookup::from)
}

pub fn insert_drop(
    conn: &Connection,
    drop_notification_id: DbId,
    created_by_id: DbId,
    caption: &str,
) -> Result<Inserted<Drop>> {
    let created_at = now_timestamp();
    let inserted = insert_unique(
        conn,
        "INSERT INTO drops (drop_notification_id, created_by_id, caption, created_at) VALUES (?1, ?2, ?3, ?4)",
        (drop_notification_id, created_by_id, caption, &created_at),
    )?;

    match inserted {
        Inserted::Created(id) => Ok(Inserted::Created(Drop::try_from(DropRow {
            id,
            drop_notification_id,
            created_by_id,
            caption: caption.to_string(),
            created_at,
        })?)),
        Inserted::Duplicate => Ok(Inserted::Duplicate),
    }
}

pub fn soft_delete_drop(conn: &Connection, id: DbId) -> Result<()> {
    conn.execute(
        "UPDATE drops SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (now_timestamp(), id),
    )?;
    Ok(())
}

fn drop_row(row: &Row<'_>) -> rusqlite::Result<DropRow> {
    Ok(DropRow {
        id: row.get(0)?,
        drop_notification_id: row.get(1)?,
        created_by_id: row.get(2)?,
        caption: row.get(3)?,
        created_at: row.get(4)?,
    })
}
