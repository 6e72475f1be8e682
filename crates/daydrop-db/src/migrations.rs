use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (directory, follows, groups)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                is_private  INTEGER NOT NULL DEFAULT 0,
                role        INTEGER NOT NULL DEFAULT 0,
                status      INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE social_groups (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                is_private      INTEGER NOT NULL DEFAULT 0,
                created_by_id   INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL
            );

            CREATE TABLE follows (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                follower_id INTEGER NOT NULL REFERENCES users(id),
                followed_id INTEGER NOT NULL REFERENCES users(id),
                status      INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                deleted_at  TEXT,
                CHECK (follower_id <> followed_id)
            );

            CREATE UNIQUE INDEX uq_follows_pair
                ON follows(follower_id, followed_id) WHERE deleted_at IS NULL;
            CREATE INDEX idx_follows_followed
                ON follows(followed_id, status) WHERE deleted_at IS NULL;

            CREATE TABLE group_members (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id    INTEGER NOT NULL REFERENCES social_groups(id),
                member_id   INTEGER NOT NULL REFERENCES users(id),
                role        INTEGER NOT NULL,
                status      INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            CREATE UNIQUE INDEX uq_group_members_pair
                ON group_members(group_id, member_id) WHERE deleted_at IS NULL;
            CREATE INDEX idx_group_members_member
                ON group_members(member_id, status) WHERE deleted_at IS NULL;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (drop notifications, drops, reports)");
        conn.execute_batch(
            "
            CREATE TABLE drop_notifications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                type        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE drops (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                drop_notification_id    INTEGER NOT NULL REFERENCES drop_notifications(id),
                created_by_id           INTEGER NOT NULL REFERENCES users(id),
                caption                 TEXT NOT NULL DEFAULT '',
                created_at              TEXT NOT NULL,
                deleted_at              TEXT
            );

            CREATE UNIQUE INDEX uq_drops_author_cycle
                ON drops(drop_notification_id, created_by_id) WHERE deleted_at IS NULL;

            CREATE TABLE reports (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                reporter_id INTEGER NOT NULL REFERENCES users(id),
                target_kind INTEGER NOT NULL,
                target_id   INTEGER NOT NULL,
                reason      TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            CREATE UNIQUE INDEX uq_reports_target
                ON reports(reporter_id, target_kind, target_id) WHERE deleted_at IS NULL;

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
