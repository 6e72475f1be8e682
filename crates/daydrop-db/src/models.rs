//! Database row types. These map directly to SQLite rows and are converted
//! into the `daydrop-types` models at the edge of this crate, so an
//! unknown status code or a corrupt timestamp surfaces as an error instead
//! of a silently wrong value.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};

use daydrop_types::models::{
    DbId, Drop, DropNotification, Follow, FollowStatus, Group, GroupMember, MemberRole,
    MemberStatus, Report, ReportTarget, User, UserRole, UserStatus,
};

pub struct UserRow {
    pub id: DbId,
    pub username: String,
    pub is_private: bool,
    pub role: i64,
    pub status: i64,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: DbId,
    pub name: String,
    pub is_private: bool,
    pub created_by_id: DbId,
    pub created_at: String,
}

pub struct FollowRow {
    pub id: DbId,
    pub follower_id: DbId,
    pub followed_id: DbId,
    pub status: i64,
    pub created_at: String,
}

pub struct GroupMemberRow {
    pub id: DbId,
    pub group_id: DbId,
    pub member_id: DbId,
    pub role: i64,
    pub status: i64,
    pub created_at: String,
}

pub struct DropNotificationRow {
    pub id: DbId,
    pub kind: String,
    pub created_at: String,
}

pub struct DropRow {
    pub id: DbId,
    pub drop_notification_id: DbId,
    pub created_by_id: DbId,
    pub caption: String,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: DbId,
    pub reporter_id: DbId,
    pub target_kind: i64,
    pub target_id: DbId,
    pub reason: String,
    pub created_at: String,
}

/// Parse a stored timestamp. Rows written by this crate are RFC 3339; rows
/// inserted by hand through the sqlite shell use `datetime('now')`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .map_err(|e| anyhow!("Corrupt timestamp '{}': {}", raw, e))
}

fn corrupt(column: &str, table: &str, id: DbId, code: i64) -> anyhow::Error {
    anyhow!("Corrupt {} code {} on {} row {}", column, code, table, id)
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            role: UserRole::from_code(row.role).ok_or_else(|| corrupt("role", "users", row.id, row.role))?,
            status: UserStatus::from_code(row.status)
                .ok_or_else(|| corrupt("status", "users", row.id, row.status))?,
            created_at: parse_timestamp(&row.created_at)?,
            username: row.username,
            is_private: row.is_private,
        })
    }
}

impl TryFrom<GroupRow> for Group {
    type Error = anyhow::Error;

    fn try_from(row: GroupRow) -> Result<Self> {
        Ok(Group {
            id: row.id,
            created_at: parse_timestamp(&row.created_at)?,
            name: row.name,
            is_private: row.is_private,
            created_by_id: row.created_by_id,
        })
    }
}

impl TryFrom<FollowRow> for Follow {
    type Error = anyhow::Error;

    fn try_from(row: FollowRow) -> Result<Self> {
        Ok(Follow {
            id: row.id,
            follower_id: row.follower_id,
            followed_id: row.followed_id,
            status: FollowStatus::from_code(row.status)
                .ok_or_else(|| corrupt("status", "follows", row.id, row.status))?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<GroupMemberRow> for GroupMember {
    type Error = anyhow::Error;

    fn try_from(row: GroupMemberRow) -> Result<Self> {
        Ok(GroupMember {
            id: row.id,
            group_id: row.group_id,
            member_id: row.member_id,
            role: MemberRole::from_code(row.role)
                .ok_or_else(|| corrupt("role", "group_members", row.id, row.role))?,
            status: MemberStatus::from_code(row.status)
                .ok_or_else(|| corrupt("status", "group_members", row.id, row.status))?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<DropNotificationRow> for DropNotification {
    type Error = anyhow::Error;

    fn try_from(row: DropNotificationRow) -> Result<Self> {
        Ok(DropNotification {
            id: row.id,
            created_at: parse_timestamp(&row.created_at)?,
            kind: row.kind,
        })
    }
}

impl TryFrom<DropRow> for Drop {
    type Error = anyhow::Error;

    fn try_from(row: DropRow) -> Result<Self> {
        Ok(Drop {
            id: row.id,
            drop_notification_id: row.drop_notification_id,
            created_by_id: row.created_by_id,
            created_at: parse_timestamp(&row.created_at)?,
            caption: row.caption,
        })
    }
}

impl TryFrom<ReportRow> for Report {
    type Error = anyhow::Error;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(Report {
            id: row.id,
            reporter_id: row.reporter_id,
            target: ReportTarget::from_code(row.target_kind)
                .ok_or_else(|| corrupt("target_kind", "reports", row.id, row.target_kind))?,
            target_id: row.target_id,
            created_at: parse_timestamp(&row.created_at)?,
            reason: row.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_layouts() {
        assert!(parse_timestamp("2026-03-01T08:00:00.000000Z").is_ok());
        assert!(parse_timestamp("2026-03-01 08:00:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn unknown_status_code_is_an_error() {
        let row = FollowRow {
            id: 1,
            follower_id: 2,
            followed_id: 3,
            status: 9,
            created_at: "2026-03-01T08:00:00Z".into(),
        };
        assert!(Follow::try_from(row).is_err());
    }
}
