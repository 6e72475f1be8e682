use anyhow::Result;
use rusqlite::{Connection, Row};

use daydrop_types::Lookup;
use daydrop_types::models::{DbId, User, UserRole, UserStatus};

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, now_timestamp};

const USER_COLUMNS: &str = "id, username, is_private, role, status, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, is_private: bool, role: UserRole) -> Result<User> {
        self.with_conn_mut(|conn| insert_user(conn, username, is_private, role))
    }

    pub fn set_user_status(&self, id: DbId, status: UserStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET status = ?1 WHERE id = ?2",
                (status.code(), id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_user(&self, id: DbId) -> Result<Lookup<User>> {
        self.with_conn(|conn| find_user(conn, id))
    }
}

pub fn insert_user(conn: &Connection, username: &str, is_private: bool, role: UserRole) -> Result<User> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO users (username, is_private, role, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        (username, is_private, role.code(), UserStatus::Active.code(), &created_at),
    )?;

    User::try_from(UserRow {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        is_private,
        role: role.code(),
        status: UserStatus::Active.code(),
        created_at,
    })
}

pub fn find_user(conn: &Connection, id: DbId) -> Result<Lookup<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id], user_row).optional()?;

    row.map(User::try_from).transpose().map(Lookup::from)
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        is_private: row.get(2)?,
        role: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}
