use anyhow::Result;

use daydrop_db::Database;
use daydrop_types::Lookup;
use daydrop_types::models::{DbId, Group, User, UserStatus};

/// Resolves users. Owned by the identity component; read-only here.
pub trait IdentityLookup: Send + Sync {
    fn get_user(&self, id: DbId) -> Result<Lookup<User>>;

    fn is_active_user(&self, id: DbId) -> Result<bool> {
        Ok(self
            .get_user(id)?
            .found()
            .is_some_and(|u| u.status == UserStatus::Active))
    }
}

/// Resolves groups. Owned by the group component; read-only here.
pub trait GroupLookup: Send + Sync {
    fn get_group(&self, id: DbId) -> Result<Lookup<Group>>;
}

impl IdentityLookup for Database {
    fn get_user(&self, id: DbId) -> Result<Lookup<User>> {
        Database::get_user(self, id)
    }
}

impl GroupLookup for Database {
    fn get_group(&self, id: DbId) -> Result<Lookup<Group>> {
        Database::get_group(self, id)
    }
}
