use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};

use daydrop_db::Database;
use daydrop_db::queries::Inserted;
use daydrop_db::queries::drops as store;
use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Drop, DropNotification};

use crate::error::{CoreError, CoreResult, DropRejection};
use crate::lookup::IdentityLookup;
use crate::policy;

/// One drop per user per notification cycle, and only against the cycle
/// that is current right now.
pub struct DropGate {
    db: Arc<Database>,
    identity: Arc<dyn IdentityLookup>,
}

impl DropGate {
    pub fn new(db: Arc<Database>, identity: Arc<dyn IdentityLookup>) -> Self {
        Self { db, identity }
    }

    /// Read-only eligibility check. [`DropGate::create_drop`] repeats it
    /// inside its own transaction, so a positive answer here is advisory.
    pub fn can_create_drop(&self, drop_notification_id: DbId, user_id: DbId) -> CoreResult<()> {
        self.db
            .with_conn(|conn| Ok(check_eligibility(conn, drop_notification_id, user_id)))?
    }

    pub fn create_drop(&self, drop_notification_id: DbId, user_id: DbId, caption: &str) -> CoreResult<Drop> {
        let drop = self.db.with_tx(|tx| {
            check_eligibility(tx, drop_notification_id, user_id)?;
            match store::insert_drop(tx, drop_notification_id, user_id, caption.trim())? {
                Inserted::Created(drop) => Ok(drop),
                Inserted::Duplicate => Err(CoreError::CannotDrop(DropRejection::AlreadyDropped)),
            }
        })?;

        info!(drop_id = drop.id, drop_notification_id, user_id, "Drop created");
        Ok(drop)
    }

    /// Authors can withdraw their drop; this reopens the cycle for them while
    /// it is still current.
    pub fn delete_drop(&self, drop_id: DbId, acting_user_id: DbId) -> CoreResult<()> {
        self.db.with_tx(|tx| {
            let drop = store::find_drop(tx, drop_id)?.or_else(|| CoreError::NotFound {
                entity: "drop",
                id: drop_id,
            })?;
            if !policy::is_self(acting_user_id, drop.created_by_id) {
                return Err(CoreError::Unauthorized("only the author can delete a drop".to_string()));
            }
            store::soft_delete_drop(tx, drop.id)?;
            Ok(())
        })?;

        info!(drop_id, acting_user_id, "Drop deleted");
        Ok(())
    }

    /// Open a new cycle. Called by the scheduler; the new notification
    /// immediately becomes current.
    pub fn publish_notification(&self, kind: &str) -> CoreResult<DropNotification> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(CoreError::Validation("notification type is required".to_string()));
        }

        let notification = self.db.insert_notification(kind)?;
        info!(notification_id = notification.id, kind, "Drop notification published");
        Ok(notification)
    }

    /// Same as [`DropGate::publish_notification`], restricted to admins.
    pub fn publish_notification_as(&self, acting_user_id: DbId, kind: &str) -> CoreResult<DropNotification> {
        let actor = self
            .identity
            .get_user(acting_user_id)?
            .or_else(|| CoreError::UserNotFound(acting_user_id))?;
        if !policy::is_admin(&actor) {
            return Err(CoreError::Unauthorized("only admins can publish notifications".to_string()));
        }
        self.publish_notification(kind)
    }

    pub fn current_notification(&self) -> CoreResult<Lookup<DropNotification>> {
        Ok(self.db.current_notification()?)
    }
}

fn check_eligibility(conn: &Connection, drop_notification_id: DbId, user_id: DbId) -> CoreResult<()> {
    if store::find_drop_for(conn, drop_notification_id, user_id)?.is_found() {
        debug!(drop_notification_id, user_id, "Drop refused: already dropped");
        return Err(CoreError::CannotDrop(DropRejection::AlreadyDropped));
    }

    let is_current = match store::current_notification(conn)? {
        Lookup::Found(current) => current.id == drop_notification_id,
        Lookup::NotFound => false,
    };
    if !is_current {
        debug!(drop_notification_id, user_id, "Drop refused: stale notification");
        return Err(CoreError::CannotDrop(DropRejection::NotCurrent));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::Fixture;
    use daydrop_types::models::UserRole;

    #[test]
    fn one_drop_per_cycle_and_only_the_current_one() {
        let fx = Fixture::new();
        let five = fx.user("five", false);
        let six = fx.user("six", false);

        let n1 = fx.engine.drops.publish_notification("daily").unwrap();
        fx.engine.drops.can_create_drop(n1.id, five).unwrap();
        let drop = fx.engine.drops.create_drop(n1.id, five, " sunrise ").unwrap();
        assert_eq!(drop.caption, "sunrise");

        let err = fx.engine.drops.can_create_drop(n1.id, five).unwrap_err();
        assert!(matches!(err, CoreError::CannotDrop(DropRejection::AlreadyDropped)));
        assert!(matches!(
            fx.engine.drops.create_drop(n1.id, five, ""),
            Err(CoreError::CannotDrop(DropRejection::AlreadyDropped))
        ));

        let n2 = fx.engine.drops.publish_notification("daily").unwrap();
        let err = fx.engine.drops.create_drop(n1.id, six, "late").unwrap_err();
        assert!(matches!(err, CoreError::CannotDrop(DropRejection::NotCurrent)));
        assert_eq!(err.reason(), "Cannot drop: not the current notification");

        assert!(fx.engine.drops.create_drop(n2.id, five, "").is_ok());
        assert_eq!(fx.engine.drops.current_notification().unwrap().found().map(|n| n.id), Some(n2.id));
    }

    #[test]
    fn a_later_notification_with_an_older_clock_is_still_current() {
        let fx = Fixture::new();
        let user = fx.user("user", false);
        let n1 = fx.engine.drops.publish_notification("daily").unwrap();

        // Written by an instance whose clock lags behind.
        let n2 = fx
            .db
            .with_conn_mut(|conn| {
                conn.execute(
                    "INSERT INTO drop_notifications (type, created_at) VALUES ('daily', '2000-01-01T00:00:00.000000Z')",
                    [],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();

        fx.engine.drops.can_create_drop(n2, user).unwrap();
        assert!(matches!(
            fx.engine.drops.can_create_drop(n1.id, user),
            Err(CoreError::CannotDrop(DropRejection::NotCurrent))
        ));
    }

    #[test]
    fn no_notification_means_nothing_is_current() {
        let fx = Fixture::new();
        let user = fx.user("early", false);

        let err = fx.engine.drops.can_create_drop(1, user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDrop);
    }

    #[test]
    fn deleting_a_drop_reopens_the_cycle_for_its_author() {
        let fx = Fixture::new();
        let author = fx.user("author", false);
        let other = fx.user("other", false);
        let n = fx.engine.drops.publish_notification("daily").unwrap();
        let drop = fx.engine.drops.create_drop(n.id, author, "first").unwrap();

        let err = fx.engine.drops.delete_drop(drop.id, other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        fx.engine.drops.delete_drop(drop.id, author).unwrap();
        assert!(matches!(
            fx.engine.drops.delete_drop(drop.id, author),
            Err(CoreError::NotFound { entity: "drop", .. })
        ));
        assert!(fx.engine.drops.create_drop(n.id, author, "second").is_ok());
    }

    #[test]
    fn publishing_validates_type_and_role() {
        let fx = Fixture::new();
        let user = fx.user("user", false);
        let admin = fx.db.create_user("admin", false, UserRole::Admin).unwrap().id;

        assert_eq!(
            fx.engine.drops.publish_notification("  ").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            fx.engine.drops.publish_notification_as(user, "daily").unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert!(fx.engine.drops.publish_notification_as(admin, "daily").is_ok());
    }

    #[test]
    fn concurrent_duplicate_drops_yield_one_success() {
        let fx = Fixture::on_disk();
        let user = fx.user("racer", false);
        let n = fx.engine.drops.publish_notification("daily").unwrap().id;

        let results = fx.race(8, move |engine| engine.drops.create_drop(n, user, "go"));

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| e.kind() == ErrorKind::CannotDrop)
        );
    }
}
