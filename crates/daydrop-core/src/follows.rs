use std::sync::Arc;

use tracing::{debug, info};

use daydrop_db::Database;
use daydrop_db::queries::Inserted;
use daydrop_db::queries::follows as store;
use daydrop_types::Lookup;
use daydrop_types::events::FeedEvent;
use daydrop_types::models::{DbId, Follow, FollowStatus, UserStatus};

use crate::error::{CoreError, CoreResult};
use crate::feed::{FeedSink, notify};
use crate::lookup::IdentityLookup;
use crate::policy;

/// Owns follow edges and their approval state machine:
/// `∅ -> Pending -> Accepted -> ∅`, or `∅ -> Accepted -> ∅` for public targets.
pub struct FollowLedger {
    db: Arc<Database>,
    identity: Arc<dyn IdentityLookup>,
    feed: Arc<dyn FeedSink>,
}

impl FollowLedger {
    pub fn new(db: Arc<Database>, identity: Arc<dyn IdentityLookup>, feed: Arc<dyn FeedSink>) -> Self {
        Self { db, identity, feed }
    }

    pub fn request_follow(&self, follower_id: DbId, followed_id: DbId) -> CoreResult<Follow> {
        if policy::is_self(follower_id, followed_id) {
            return Err(CoreError::SelfFollow);
        }

        let target = self
            .identity
            .get_user(followed_id)?
            .or_else(|| CoreError::UserNotFound(followed_id))?;
        if target.status != UserStatus::Active {
            debug!(follower_id, followed_id, "Follow refused: target is {:?}", target.status);
            return Err(CoreError::FollowNotAllowed(followed_id));
        }

        let status = if target.is_private {
            FollowStatus::Pending
        } else {
            FollowStatus::Accepted
        };

        let follow = self.db.with_tx(|tx| {
            if store::find_between(tx, follower_id, followed_id)?.is_found() {
                return Err(CoreError::AlreadyFollowing(followed_id));
            }
            match store::insert_follow(tx, follower_id, followed_id, status)? {
                Inserted::Created(follow) => Ok(follow),
                Inserted::Duplicate => Err(CoreError::AlreadyFollowing(followed_id)),
            }
        })?;

        info!(follow_id = follow.id, follower_id, followed_id, "Follow created as {:?}", follow.status);
        notify(
            self.feed.as_ref(),
            FeedEvent::FollowRequested {
                follow_id: follow.id,
                follower_id,
                followed_id,
                accepted: follow.status == FollowStatus::Accepted,
            },
        );
        Ok(follow)
    }

    /// Only the followed user may accept, and only a pending request.
    pub fn accept_follow(&self, follow_id: DbId, acting_user_id: DbId) -> CoreResult<Follow> {
        let follow = self.db.with_tx(|tx| {
            let mut follow = store::find_follow(tx, follow_id)?.or_else(|| CoreError::NotFound {
                entity: "follow",
                id: follow_id,
            })?;

            if !policy::is_self(acting_user_id, follow.followed_id) {
                return Err(CoreError::Unauthorized(
                    "only the followed user can accept a follow request".to_string(),
                ));
            }
            if follow.status != FollowStatus::Pending {
                return Err(CoreError::InvalidState("follow is already accepted".to_string()));
            }

            store::set_follow_status(tx, follow.id, FollowStatus::Accepted)?;
            follow.status = FollowStatus::Accepted;
            Ok(follow)
        })?;

        info!(follow_id, acting_user_id, "Follow accepted");
        notify(
            self.feed.as_ref(),
            FeedEvent::FollowAccepted {
                follow_id,
                follower_id: follow.follower_id,
                followed_id: follow.followed_id,
            },
        );
        Ok(follow)
    }

    /// Rejecting a pending request and unfollowing an accepted edge are the
    /// same operation: either party removes the row.
    pub fn reject_or_unfollow(&self, follow_id: DbId, acting_user_id: DbId) -> CoreResult<()> {
        self.db.with_tx(|tx| {
            let follow = store::find_follow(tx, follow_id)?.or_else(|| CoreError::NotFound {
                entity: "follow",
                id: follow_id,
            })?;

            if !policy::is_self(acting_user_id, follow.follower_id)
                && !policy::is_self(acting_user_id, follow.followed_id)
            {
                return Err(CoreError::Unauthorized(
                    "only the follower or the followed user can remove a follow".to_string(),
                ));
            }

            store::soft_delete_follow(tx, follow.id)?;
            Ok(())
        })?;

        info!(follow_id, acting_user_id, "Follow removed");
        Ok(())
    }

    pub fn list_followers(&self, user_id: DbId, requester_id: DbId) -> CoreResult<Vec<Follow>> {
        self.ensure_graph_visible(user_id, requester_id)?;
        Ok(self
            .db
            .with_conn(|conn| store::followers_of(conn, user_id, FollowStatus::Accepted))?)
    }

    pub fn list_following(&self, user_id: DbId, requester_id: DbId) -> CoreResult<Vec<Follow>> {
        self.ensure_graph_visible(user_id, requester_id)?;
        Ok(self
            .db
            .with_conn(|conn| store::following_of(conn, user_id, FollowStatus::Accepted))?)
    }

    /// Incoming requests still waiting on `user_id`.
    pub fn pending_requests(&self, user_id: DbId) -> CoreResult<Vec<Follow>> {
        Ok(self
            .db
            .with_conn(|conn| store::followers_of(conn, user_id, FollowStatus::Pending))?)
    }

    pub fn follow_between(&self, follower_id: DbId, followed_id: DbId) -> CoreResult<Lookup<Follow>> {
        Ok(self
            .db
            .with_conn(|conn| store::find_between(conn, follower_id, followed_id))?)
    }

    fn ensure_graph_visible(&self, user_id: DbId, requester_id: DbId) -> CoreResult<()> {
        let target = self
            .identity
            .get_user(user_id)?
            .or_else(|| CoreError::UserNotFound(user_id))?;

        let is_following = match self.follow_between(requester_id, user_id)? {
            Lookup::Found(follow) => follow.status == FollowStatus::Accepted,
            Lookup::NotFound => false,
        };

        if policy::is_private_and_unrelated(&target, requester_id, is_following) {
            return Err(CoreError::PrivateAccount(user_id));
        }
        Ok(())
    }
}
