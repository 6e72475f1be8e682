use anyhow::Result;
use rusqlite::{Connection, Row};

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, GroupMember, MemberRole, MemberStatus};

use super::{Inserted, OptionalExt, insert_unique};
use crate::models::GroupMemberRow;
use crate::now_timestamp;

const MEMBER_COLUMNS: &str = "id, group_id, member_id, role, status, created_at";

/// Live membership of `member_id` in `group_id`, pending or active.
pub fn find_membership(conn: &Connection, group_id: DbId, member_id: DbId) -> Result<Lookup<GroupMember>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM group_members
         WHERE group_id = ?1 AND member_id = ?2 AND deleted_at IS NULL"
    );
    let row = conn
        .query_row(&sql, (group_id, member_id), member_row)
        .optional()?;

    row.map(GroupMember::try_from).transpose().map(Lookup::from)
}

pub fn insert_membership(
    conn: &Connection,
    group_id: DbId,
    member_id: DbId,
    role: MemberRole,
    status: MemberStatus,
) -> Result<Inserted<GroupMember>> {
    let created_at = now_timestamp();
    let inserted = insert_unique(
        conn,
        "INSERT INTO group_members (group_id, member_id, role, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        (group_id, member_id, role.code(), status.code(), &created_at),
    )?;

    match inserted {
        Inserted::Created(id) => Ok(Inserted::Created(GroupMember::try_from(GroupMemberRow {
            id,
            group_id,
            member_id,
            role: role.code(),
            status: status.code(),
            created_at,
        })?)),
        Inserted::Duplicate => Ok(Inserted::Duplicate),
    }
}

pub fn set_member_status(conn: &Connection, id: DbId, status: MemberStatus) -> Result<()> {
    conn.execute(
        "UPDATE group_members SET status = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (status.code(), id),
    )?;
    Ok(())
}

pub fn set_member_role(conn: &Connection, id: DbId, role: MemberRole) -> Result<()> {
    conn.execute(
        "UPDATE group_members SET role = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (role.code(), id),
    )?;
    Ok(())
}

pub fn soft_delete_membership(conn: &Connection, id: DbId) -> Result<()> {
    conn.execute(
        "UPDATE group_members SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (now_timestamp(), id),
    )?;
    Ok(())
}

/// Live memberships of a group with the given status, oldest first.
pub fn members_of(conn: &Connection, group_id: DbId, status: MemberStatus) -> Result<Vec<GroupMember>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM group_members
         WHERE group_id = ?1 AND status = ?2 AND deleted_at IS NULL
         ORDER BY created_at, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((group_id, status.code()), member_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(GroupMember::try_from).collect()
}

fn member_row(row: &Row<'_>) -> rusqlite::Result<GroupMemberRow> {
    Ok(GroupMemberRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        member_id: row.get(2)?,
        role: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use daydrop_types::models::UserRole;

    #[test]
    fn role_and_status_updates_persist() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner", false, UserRole::User).unwrap();
        let joiner = db.create_user("joiner", false, UserRole::User).unwrap();
        let group = db.create_group("climbers", true, owner.id).unwrap();

        db.with_conn_mut(|conn| {
            let Inserted::Created(m) =
                insert_membership(conn, group.id, joiner.id, MemberRole::Member, MemberStatus::Pending)?
            else {
                panic!("insert must succeed");
            };

            set_member_status(conn, m.id, MemberStatus::Active)?;
            set_member_role(conn, m.id, MemberRole::Manager)?;

            let stored = find_membership(conn, group.id, joiner.id)?.found().unwrap();
            assert_eq!(stored.status, MemberStatus::Active);
            assert_eq!(stored.role, MemberRole::Manager);

            // The joiner plus the creator's own row.
            assert_eq!(members_of(conn, group.id, MemberStatus::Active)?.len(), 2);
            assert!(members_of(conn, group.id, MemberStatus::Pending)?.is_empty());
            Ok(())
        })
        .unwrap();

        assert_eq!(db.list_user_groups(joiner.id).unwrap().len(), 1);
        assert_eq!(db.list_user_groups(owner.id).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_membership_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner", false, UserRole::User).unwrap();
        let joiner = db.create_user("joiner", false, UserRole::User).unwrap();
        let group = db.create_group("open", false, owner.id).unwrap();

        db.with_conn_mut(|conn| {
            let creator_again = insert_membership(conn, group.id, owner.id, MemberRole::Member, MemberStatus::Active)?;
            assert_eq!(creator_again, Inserted::Duplicate);

            insert_membership(conn, group.id, joiner.id, MemberRole::Member, MemberStatus::Active)?;
            let again = insert_membership(conn, group.id, joiner.id, MemberRole::Member, MemberStatus::Active)?;
            assert_eq!(again, Inserted::Duplicate);
            Ok(())
        })
        .unwrap();
    }
}
