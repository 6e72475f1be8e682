use anyhow::Result;
use rusqlite::{Connection, Row};

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Follow, FollowStatus};

use super::{Inserted, OptionalExt, insert_unique};
use crate::models::FollowRow;
use crate::now_timestamp;

const FOLLOW_COLUMNS: &str = "id, follower_id, followed_id, status, created_at";

/// Live (not soft-deleted) follow by id.
pub fn find_follow(conn: &Connection, id: DbId) -> Result<Lookup<Follow>> {
    let sql = format!("SELECT {FOLLOW_COLUMNS} FROM follows WHERE id = ?1 AND deleted_at IS NULL");
    let row = conn.query_row(&sql, [id], follow_row).optional()?;

    row.map(Follow::try_from).transpose().map(Lookup::from)
}

/// Live follow for the ordered pair `follower -> followed`.
pub fn find_between(conn: &Connection, follower_id: DbId, followed_id: DbId) -> Result<Lookup<Follow>> {
    let sql = format!(
        "SELECT {FOLLOW_COLUMNS} FROM follows
         WHERE follower_id = ?1 AND followed_id = ?2 AND deleted_at IS NULL"
    );
    let row = conn
        .query_row(&sql, (follower_id, followed_id), follow_row)
        .optional()?;

    row.map(Follow::try_from).transpose().map(Lookup::from)
}

pub fn insert_follow(
    conn: &Connection,
    follower_id: DbId,
    followed_id: DbId,
    status: FollowStatus,
) -> Result<Inserted<Follow>> {
    let created_at = now_timestamp();
    let inserted = insert_unique(
        conn,
        "INSERT INTO follows (follower_id, followed_id, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        (follower_id, followed_id, status.code(), &created_at),
    )?;

    match inserted {
        Inserted::Created(id) => Ok(Inserted::Created(Follow::try_from(FollowRow {
            id,
            follower_id,
            followed_id,
            status: status.code(),
            created_at,
        })?)),
        Inserted::Duplicate => Ok(Inserted::Duplicate),
    }
}

pub fn set_follow_status(conn: &Connection, id: DbId, status: FollowStatus) -> Result<()> {
    conn.execute(
        "UPDATE follows SET status = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (status.code(), id),
    )?;
    Ok(())
}

pub fn soft_delete_follow(conn: &Connection, id: DbId) -> Result<()> {
    conn.execute(
        "UPDATE follows SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (now_timestamp(), id),
    )?;
    Ok(())
}

/// Live edges pointing at `user_id` with the given status.
pub fn followers_of(conn: &Connection, user_id: DbId, status: FollowStatus) -> Result<Vec<Follow>> {
    let sql = format!(
        "SELECT {FOLLOW_COLUMNS} FROM follows
         WHERE followed_id = ?1 AND status = ?2 AND deleted_at IS NULL
         ORDER BY created_at, id"
    );
    collect_follows(conn, &sql, user_id, status)
}

/// Live edges leaving `user_id` with the given status.
pub fn following_of(conn: &Connection, user_id: DbId, status: FollowStatus) -> Result<Vec<Follow>> {
    let sql = format!(
        "SELECT {FOLLOW_COLUMNS} FROM follows
         WHERE follower_id = ?1 AND status = ?2 AND deleted_at IS NULL
         ORDER BY created_at, id"
    );
    collect_follows(conn, &sql, user_id, status)
}

fn collect_follows(conn: &Connection, sql: &str, user_id: DbId, status: FollowStatus) -> Result<Vec<Follow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map((user_id, status.code()), follow_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Follow::try_from).collect()
}

fn follow_row(row: &Row<'_>) -> rusqlite::Result<FollowRow> {
    Ok(FollowRow {
        id: row.get(0)?,
        follower_id: row.get(1)?,
        followed_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}
