use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Group, MemberRole, MemberStatus};

use super::members::insert_membership;
use super::{Inserted, OptionalExt};
use crate::models::GroupRow;
use crate::{Database, now_timestamp};

impl Database {
    // -- Groups --

    /// Create a group together with the creator's own Active `member` row.
    /// Authority still comes from `created_by_id`, not from that row's role.
    pub fn create_group(&self, name: &str, is_private: bool, created_by_id: DbId) -> Result<Group> {
        self.with_tx(|tx| {
            let created_at = now_timestamp();
            tx.execute(
                "INSERT INTO social_groups (name, is_private, created_by_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                (name, is_private, created_by_id, &created_at),
            )?;

            let group = Group::try_from(GroupRow {
                id: tx.last_insert_rowid(),
                name: name.to_string(),
                is_private,
                created_by_id,
                created_at,
            })?;

            match insert_membership(tx, group.id, created_by_id, MemberRole::Member, MemberStatus::Active)? {
                Inserted::Created(_) => Ok(group),
                Inserted::Duplicate => Err(anyhow!("group {} already has a creator row", group.id)),
            }
        })
    }

    pub fn get_group(&self, id: DbId) -> Result<Lookup<Group>> {
        self.with_conn(|conn| find_group(conn, id))
    }

    pub fn list_user_groups(&self, user_id: DbId) -> Result<Vec<Group>> {
        self.with_conn(|conn| groups_with_active_member(conn, user_id))
    }
}

pub fn find_group(conn: &Connection, id: DbId) -> Result<Lookup<Group>> {
    let row = conn
        .query_row(
            "SELECT id, name, is_private, created_by_id, created_at FROM social_groups WHERE id = ?1",
            [id],
            group_row,
        )
        .optional()?;

    row.map(Group::try_from).transpose().map(Lookup::from)
}

/// Groups in which `user_id` holds a live, Active membership.
pub fn groups_with_active_member(conn: &Connection, user_id: DbId) -> Result<Vec<Group>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.name, g.is_private, g.created_by_id, g.created_at
         FROM social_groups g
         JOIN group_members m ON m.group_id = g.id
         WHERE m.member_id = ?1 AND m.status = ?2 AND m.deleted_at IS NULL
         ORDER BY g.id",
    )?;

    let rows = stmt
        .query_map((user_id, MemberStatus::Active.code()), group_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Group::try_from).collect()
}

fn group_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        is_private: row.get(2)?,
        created_by_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}
