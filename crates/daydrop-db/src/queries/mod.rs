pub mod drops;
pub mod follows;
pub mod groups;
pub mod members;
pub mod reports;
pub mod users;

use anyhow::Result;
use rusqlite::{Connection, Params};

use daydrop_types::models::DbId;

/// Outcome of an insert guarded by a partial unique index.
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<T> {
    Created(T),
    /// A live row for the same key already exists.
    Duplicate,
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Execute an INSERT, reporting a unique-index collision as `Duplicate`
/// instead of an error. Returns the new rowid.
fn insert_unique<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Inserted<DbId>> {
    match conn.execute(sql, params) {
        Ok(_) => Ok(Inserted::Created(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Ok(Inserted::Duplicate),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
