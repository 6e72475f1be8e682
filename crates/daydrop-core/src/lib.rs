//! Relationship and membership authorization engine.
//!
//! Every operation is blocking and runs its check-then-act inside a single
//! store transaction. Callers on an async runtime should hop onto a blocking
//! thread first.

pub mod drops;
pub mod error;
pub mod feed;
pub mod follows;
pub mod groups;
pub mod lookup;
pub mod policy;
pub mod reports;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use daydrop_db::Database;

pub use drops::DropGate;
pub use error::{CoreError, CoreResult, DropRejection, ErrorKind};
pub use feed::{FeedSink, NullFeed, RecordingFeed};
pub use follows::FollowLedger;
pub use groups::GroupLedger;
pub use lookup::{GroupLookup, IdentityLookup};
pub use reports::ReportLedger;

/// All ledgers wired against one store and one feed.
pub struct Engine {
    pub follows: FollowLedger,
    pub groups: GroupLedger,
    pub drops: DropGate,
    pub reports: ReportLedger,
}

impl Engine {
    /// Uses the store itself as identity and group lookup.
    pub fn new(db: Arc<Database>, feed: Arc<dyn FeedSink>) -> Self {
        let identity: Arc<dyn IdentityLookup> = db.clone();
        let groups: Arc<dyn GroupLookup> = db.clone();
        Self::with_lookups(db, identity, groups, feed)
    }

    pub fn with_lookups(
        db: Arc<Database>,
        identity: Arc<dyn IdentityLookup>,
        groups: Arc<dyn GroupLookup>,
        feed: Arc<dyn FeedSink>,
    ) -> Self {
        Self {
            follows: FollowLedger::new(db.clone(), identity.clone(), feed.clone()),
            groups: GroupLedger::new(db.clone(), identity.clone(), groups, feed),
            drops: DropGate::new(db.clone(), identity.clone()),
            reports: ReportLedger::new(db, identity),
        }
    }
}
