use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};

use daydrop_db::Database;
use daydrop_db::queries::Inserted;
use daydrop_db::queries::groups as group_store;
use daydrop_db::queries::members as store;
use daydrop_types::Lookup;
use daydrop_types::events::FeedEvent;
use daydrop_types::models::{DbId, Group, GroupMember, MemberRole, MemberStatus, UserStatus};

use crate::error::{CoreError, CoreResult};
use crate::feed::{FeedSink, notify};
use crate::lookup::{GroupLookup, IdentityLookup};
use crate::policy;

/// Owns group memberships: `∅ -> Pending -> Active -> ∅` (public groups skip
/// Pending). Role is orthogonal and only changes while Active.
///
/// Authority over other members comes from being the group's creator or an
/// active manager. The creator's own row can only be touched by the creator.
pub struct GroupLedger {
    db: Arc<Database>,
    identity: Arc<dyn IdentityLookup>,
    groups: Arc<dyn GroupLookup>,
    feed: Arc<dyn FeedSink>,
}

impl GroupLedger {
    pub fn new(
        db: Arc<Database>,
        identity: Arc<dyn IdentityLookup>,
        groups: Arc<dyn GroupLookup>,
        feed: Arc<dyn FeedSink>,
    ) -> Self {
        Self {
            db,
            identity,
            groups,
            feed,
        }
    }

    /// Self-join. The requested role is validated and then ignored: a user
    /// joining on their own always enters as `member`, the creator included.
    /// The creator already holds a row from group creation; if they left and
    /// come back, their row is Active even in a private group.
    pub fn join_group(&self, group_id: DbId, acting_user_id: DbId, requested_role: &str) -> CoreResult<GroupMember> {
        let requested = parse_role(requested_role)?;
        if requested != MemberRole::Member {
            debug!(group_id, acting_user_id, "Self-join requested {}, forcing member", requested);
        }

        let group = self.group(group_id)?;
        let status = if group.is_private && !policy::is_group_creator(acting_user_id, &group) {
            MemberStatus::Pending
        } else {
            MemberStatus::Active
        };

        let member = self.db.with_tx(|tx| {
            insert_new_member(tx, group_id, acting_user_id, MemberRole::Member, status)
        })?;

        info!(group_id, member_id = acting_user_id, "Joined group as {:?}", member.status);
        notify(
            self.feed.as_ref(),
            FeedEvent::MemberJoined {
                group_id,
                member_id: acting_user_id,
                owner_id: group.created_by_id,
                status: member.status,
            },
        );
        Ok(member)
    }

    /// A manager (or the creator) adds someone else directly as Active.
    /// Adding yourself is a join.
    pub fn add_member(
        &self,
        group_id: DbId,
        member_id: DbId,
        acting_user_id: DbId,
        role: &str,
    ) -> CoreResult<GroupMember> {
        if policy::is_self(acting_user_id, member_id) {
            return self.join_group(group_id, acting_user_id, role);
        }

        let role = parse_role(role)?;
        let group = self.group(group_id)?;
        let user = self
            .identity
            .get_user(member_id)?
            .or_else(|| CoreError::UserNotFound(member_id))?;
        if user.status != UserStatus::Active {
            return Err(CoreError::InvalidState(format!("user {} is not active", member_id)));
        }

        let member = self.db.with_tx(|tx| {
            require_authority(tx, &group, acting_user_id)?;
            insert_new_member(tx, group_id, member_id, role, MemberStatus::Active)
        })?;

        info!(group_id, member_id, acting_user_id, "Member added as {}", role);
        notify(
            self.feed.as_ref(),
            FeedEvent::MemberAdded {
                group_id,
                member_id,
                role,
            },
        );
        Ok(member)
    }

    pub fn accept_member(&self, group_id: DbId, member_id: DbId, acting_user_id: DbId) -> CoreResult<GroupMember> {
        let group = self.group(group_id)?;

        let member = self.db.with_tx(|tx| {
            let mut target = find_target(tx, group_id, member_id)?;
            guard_action(tx, &group, &target, acting_user_id)?;

            if target.status != MemberStatus::Pending {
                return Err(CoreError::InvalidState("membership is not pending".to_string()));
            }

            store::set_member_status(tx, target.id, MemberStatus::Active)?;
            target.status = MemberStatus::Active;
            Ok(target)
        })?;

        info!(group_id, member_id, acting_user_id, "Membership accepted");
        notify(self.feed.as_ref(), FeedEvent::MemberAccepted { group_id, member_id });
        Ok(member)
    }

    pub fn update_role(
        &self,
        group_id: DbId,
        member_id: DbId,
        acting_user_id: DbId,
        new_role: &str,
    ) -> CoreResult<GroupMember> {
        let role = parse_role(new_role)?;
        let group = self.group(group_id)?;

        let (member, changed) = self.db.with_tx(|tx| {
            let mut target = find_target(tx, group_id, member_id)?;
            guard_action(tx, &group, &target, acting_user_id)?;

            if target.status != MemberStatus::Active {
                return Err(CoreError::InvalidState(
                    "role can only change on an active membership".to_string(),
                ));
            }

            let changed = target.role != role;
            if changed {
                store::set_member_role(tx, target.id, role)?;
                target.role = role;
            }
            Ok((target, changed))
        })?;

        if !changed {
            debug!(group_id, member_id, acting_user_id, "Member already has role {}", role);
            return Ok(member);
        }

        info!(group_id, member_id, acting_user_id, "Member role set to {}", role);
        notify(
            self.feed.as_ref(),
            FeedEvent::MemberRoleChanged {
                group_id,
                member_id,
                role,
            },
        );
        Ok(member)
    }

    /// Leaving is always allowed; removing someone else needs authority and
    /// cannot target the creator.
    pub fn remove_member(&self, group_id: DbId, member_id: DbId, acting_user_id: DbId) -> CoreResult<()> {
        let group = self.group(group_id)?;

        self.db.with_tx(|tx| {
            let target = find_target(tx, group_id, member_id)?;
            if !policy::is_self(acting_user_id, member_id) {
                guard_action(tx, &group, &target, acting_user_id)?;
            }

            store::soft_delete_membership(tx, target.id)?;
            Ok::<_, CoreError>(())
        })?;

        info!(group_id, member_id, acting_user_id, "Membership removed");
        Ok(())
    }

    /// Groups where `user_id` is an active member.
    pub fn list_user_groups(&self, user_id: DbId) -> CoreResult<Vec<Group>> {
        Ok(self
            .db
            .with_conn(|conn| group_store::groups_with_active_member(conn, user_id))?)
    }

    /// `user_id`'s groups as seen by `requester_id`: private groups are left
    /// out unless the requester is the user, the creator, or an active member.
    pub fn list_user_groups_for(&self, user_id: DbId, requester_id: DbId) -> CoreResult<Vec<Group>> {
        let groups = self.list_user_groups(user_id)?;
        if policy::is_self(requester_id, user_id) {
            return Ok(groups);
        }

        let shared: HashSet<DbId> = self
            .list_user_groups(requester_id)?
            .into_iter()
            .map(|g| g.id)
            .collect();
        Ok(groups
            .into_iter()
            .filter(|g| !g.is_private || policy::is_group_creator(requester_id, g) || shared.contains(&g.id))
            .collect())
    }

    /// Active members. Private groups only show them to the creator and to
    /// active members.
    pub fn list_members(&self, group_id: DbId, requester_id: DbId) -> CoreResult<Vec<GroupMember>> {
        let group = self.group(group_id)?;

        self.db.with_conn(|conn| {
            if group.is_private && !policy::is_group_creator(requester_id, &group) {
                let visible = match store::find_membership(conn, group_id, requester_id)? {
                    Lookup::Found(m) => m.status == MemberStatus::Active,
                    Lookup::NotFound => false,
                };
                if !visible {
                    return Ok(Err(CoreError::Unauthorized("group is private".to_string())));
                }
            }
            store::members_of(conn, group_id, MemberStatus::Active).map(Ok)
        })?
    }

    /// Join requests waiting on a manager.
    pub fn pending_members(&self, group_id: DbId, acting_user_id: DbId) -> CoreResult<Vec<GroupMember>> {
        let group = self.group(group_id)?;

        self.db.with_conn(|conn| {
            if let Err(e) = require_authority(conn, &group, acting_user_id) {
                return Ok(Err(e));
            }
            store::members_of(conn, group_id, MemberStatus::Pending).map(Ok)
        })?
    }

    fn group(&self, group_id: DbId) -> CoreResult<Group> {
        self.groups
            .get_group(group_id)?
            .or_else(|| CoreError::GroupNotFound(group_id))
    }
}

fn parse_role(raw: &str) -> CoreResult<MemberRole> {
    raw.parse().map_err(|_| CoreError::InvalidRole(raw.to_string()))
}

fn insert_new_member(
    conn: &Connection,
    group_id: DbId,
    member_id: DbId,
    role: MemberRole,
    status: MemberStatus,
) -> CoreResult<GroupMember> {
    if store::find_membership(conn, group_id, member_id)?.is_found() {
        return Err(CoreError::AlreadyMember(group_id));
    }
    match store::insert_membership(conn, group_id, member_id, role, status)? {
        Inserted::Created(member) => Ok(member),
        Inserted::Duplicate => Err(CoreError::AlreadyMember(group_id)),
    }
}

fn find_target(conn: &Connection, group_id: DbId, member_id: DbId) -> CoreResult<GroupMember> {
    store::find_membership(conn, group_id, member_id)?.or_else(|| CoreError::NotFound {
        entity: "membership",
        id: member_id,
    })
}

/// Creator protection first, then manager authority.
fn guard_action(conn: &Connection, group: &Group, target: &GroupMember, actor_id: DbId) -> CoreResult<()> {
    if policy::violates_creator_protection(target, group, actor_id) {
        debug!(group_id = group.id, actor_id, "Refused action on the group creator");
        return Err(CoreError::Unauthorized(
            "the group creator can only be acted on by themselves".to_string(),
        ));
    }
    require_authority(conn, group, actor_id)
}

fn require_authority(conn: &Connection, group: &Group, actor_id: DbId) -> CoreResult<()> {
    if policy::is_group_creator(actor_id, group) {
        return Ok(());
    }
    let acting = store::find_membership(conn, group.id, actor_id)?.found();
    if policy::has_group_authority(actor_id, group, acting.as_ref()) {
        Ok(())
    } else {
        Err(CoreError::not_a_manager())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::Fixture;

    /// Private group created by `creator`, plus an active manager.
    fn private_group_with_manager(fx: &Fixture, creator: DbId, manager: DbId) -> Group {
        let group = fx.db.create_group("darkroom", true, creator).unwrap();
        fx.engine.groups.add_member(group.id, manager, creator, "manager").unwrap();
        group
    }

    #[test]
    fn private_join_needs_a_manager_to_accept() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let joiner = fx.user("joiner", false);
        let plain = fx.user("plain", false);
        let group = fx.db.create_group("darkroom", true, creator).unwrap();
        fx.engine.groups.add_member(group.id, plain, creator, "member").unwrap();

        let pending = fx.engine.groups.join_group(group.id, joiner, "member").unwrap();
        assert_eq!(pending.status, MemberStatus::Pending);

        let err = fx.engine.groups.accept_member(group.id, joiner, plain).unwrap_err();
        assert!(matches!(&err, CoreError::Unauthorized(reason) if reason == "not a manager"));

        let accepted = fx.engine.groups.accept_member(group.id, joiner, creator).unwrap();
        assert_eq!(accepted.status, MemberStatus::Active);

        let err = fx.engine.groups.accept_member(group.id, joiner, creator).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn public_join_is_active_and_role_is_forced() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let joiner = fx.user("joiner", false);
        let group = fx.db.create_group("park", false, creator).unwrap();

        let member = fx.engine.groups.join_group(group.id, joiner, "manager").unwrap();
        assert_eq!(member.status, MemberStatus::Active);
        assert_eq!(member.role, MemberRole::Member);

        let err = fx.engine.groups.join_group(group.id, joiner, "member").unwrap_err();
        assert!(matches!(err, CoreError::AlreadyMember(id) if id == group.id));

        assert!(matches!(
            fx.engine.groups.join_group(group.id, creator, "owner"),
            Err(CoreError::InvalidRole(_))
        ));
        assert!(matches!(
            fx.engine.groups.join_group(999, joiner, "member"),
            Err(CoreError::GroupNotFound(999))
        ));

        assert!(matches!(
            fx.feed.events().first(),
            Some(FeedEvent::MemberJoined { owner_id, .. }) if *owner_id == creator
        ));
    }

    #[test]
    fn creator_starts_active_and_cannot_rejoin() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let group = fx.db.create_group("darkroom", true, creator).unwrap();

        let groups = fx.engine.groups.list_user_groups(creator).unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![group.id]);

        let members = fx.engine.groups.list_members(group.id, creator).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].member_id, creator);
        assert_eq!(members[0].role, MemberRole::Member);

        assert!(matches!(
            fx.engine.groups.join_group(group.id, creator, "member"),
            Err(CoreError::AlreadyMember(id)) if id == group.id
        ));
    }

    #[test]
    fn creator_rejoining_a_private_group_is_never_pending() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let group = fx.db.create_group("darkroom", true, creator).unwrap();

        fx.engine.groups.remove_member(group.id, creator, creator).unwrap();
        assert!(fx.engine.groups.list_user_groups(creator).unwrap().is_empty());

        let back = fx.engine.groups.join_group(group.id, creator, "manager").unwrap();
        assert_eq!(back.status, MemberStatus::Active);
        assert_eq!(back.role, MemberRole::Member);
    }

    #[test]
    fn creator_cannot_be_removed_by_a_manager() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let manager = fx.user("manager", false);
        let group = private_group_with_manager(&fx, creator, manager);

        let err = fx.engine.groups.remove_member(group.id, creator, manager).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = fx.engine.groups.update_role(group.id, creator, manager, "manager").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        fx.engine.groups.remove_member(group.id, creator, creator).unwrap();
        assert!(matches!(
            fx.engine.groups.remove_member(group.id, creator, creator),
            Err(CoreError::NotFound { entity: "membership", .. })
        ));
    }

    #[test]
    fn creator_row_cannot_be_accepted() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let manager = fx.user("manager", false);
        let group = private_group_with_manager(&fx, creator, manager);

        let err = fx.engine.groups.accept_member(group.id, creator, manager).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = fx.engine.groups.accept_member(group.id, creator, creator).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn managers_change_roles_of_active_members_only() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let manager = fx.user("manager", false);
        let joiner = fx.user("joiner", false);
        let group = private_group_with_manager(&fx, creator, manager);

        fx.engine.groups.join_group(group.id, joiner, "member").unwrap();
        let err = fx.engine.groups.update_role(group.id, joiner, manager, "manager").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        fx.engine.groups.accept_member(group.id, joiner, manager).unwrap();
        let promoted = fx.engine.groups.update_role(group.id, joiner, manager, "manager").unwrap();
        assert_eq!(promoted.role, MemberRole::Manager);

        assert!(matches!(
            fx.engine.groups.update_role(group.id, joiner, manager, "admin"),
            Err(CoreError::InvalidRole(_))
        ));

        // The promoted member now has authority of their own.
        let demoted = fx.engine.groups.update_role(group.id, manager, joiner, "member").unwrap();
        assert_eq!(demoted.role, MemberRole::Member);
        let err = fx.engine.groups.update_role(group.id, joiner, manager, "member").unwrap_err();
        assert!(matches!(&err, CoreError::Unauthorized(reason) if reason == "not a manager"));

        assert!(matches!(
            fx.feed.events().last(),
            Some(FeedEvent::MemberRoleChanged { role: MemberRole::Member, .. })
        ));
    }

    #[test]
    fn setting_the_same_role_publishes_nothing() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let manager = fx.user("manager", false);
        let group = private_group_with_manager(&fx, creator, manager);
        let before = fx.feed.events().len();

        let same = fx.engine.groups.update_role(group.id, manager, creator, "manager").unwrap();
        assert_eq!(same.role, MemberRole::Manager);
        assert_eq!(fx.feed.events().len(), before);

        fx.engine.groups.update_role(group.id, manager, creator, "member").unwrap();
        assert_eq!(fx.feed.events().len(), before + 1);
    }

    #[test]
    fn non_managers_cannot_remove_others_but_can_leave() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let a = fx.user("a", false);
        let b = fx.user("b", false);
        let group = fx.db.create_group("park", false, creator).unwrap();
        fx.engine.groups.join_group(group.id, a, "member").unwrap();
        fx.engine.groups.join_group(group.id, b, "member").unwrap();

        let err = fx.engine.groups.remove_member(group.id, b, a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        fx.engine.groups.remove_member(group.id, a, a).unwrap();
        fx.engine.groups.remove_member(group.id, b, creator).unwrap();
        assert!(fx.engine.groups.list_user_groups(a).unwrap().is_empty());

        // Leaving frees the pair for a later join.
        assert!(fx.engine.groups.join_group(group.id, a, "member").is_ok());
    }

    #[test]
    fn add_member_requires_authority() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let outsider = fx.user("outsider", false);
        let friend = fx.user("friend", false);
        let group = fx.db.create_group("darkroom", true, creator).unwrap();

        let err = fx.engine.groups.add_member(group.id, friend, outsider, "member").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let added = fx.engine.groups.add_member(group.id, friend, creator, "manager").unwrap();
        assert_eq!(added.status, MemberStatus::Active);
        assert_eq!(added.role, MemberRole::Manager);

        assert!(matches!(
            fx.engine.groups.add_member(group.id, friend, creator, "member"),
            Err(CoreError::AlreadyMember(_))
        ));
        assert!(matches!(
            fx.engine.groups.add_member(group.id, 999, creator, "member"),
            Err(CoreError::UserNotFound(999))
        ));
    }

    #[test]
    fn membership_listings_respect_privacy() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let manager = fx.user("manager", false);
        let joiner = fx.user("joiner", false);
        let group = private_group_with_manager(&fx, creator, manager);
        fx.engine.groups.join_group(group.id, joiner, "member").unwrap();

        // The creator's own row plus the manager.
        assert_eq!(fx.engine.groups.list_members(group.id, manager).unwrap().len(), 2);
        assert_eq!(fx.engine.groups.list_members(group.id, creator).unwrap().len(), 2);
        assert!(fx.engine.groups.list_members(group.id, joiner).is_err());

        let pending = fx.engine.groups.pending_members(group.id, manager).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].member_id, joiner);
        assert!(fx.engine.groups.pending_members(group.id, joiner).is_err());

        let groups = fx.engine.groups.list_user_groups(manager).unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![group.id]);
        assert!(fx.engine.groups.list_user_groups(joiner).unwrap().is_empty());
    }

    #[test]
    fn private_groups_are_hidden_from_outsiders_in_listings() {
        let fx = Fixture::new();
        let creator = fx.user("creator", false);
        let member = fx.user("member", false);
        let outsider = fx.user("outsider", false);
        let hidden = fx.db.create_group("darkroom", true, creator).unwrap();
        let open = fx.db.create_group("park", false, creator).unwrap();
        fx.engine.groups.add_member(hidden.id, member, creator, "member").unwrap();
        fx.engine.groups.join_group(open.id, member, "member").unwrap();

        let ids = |groups: Vec<Group>| groups.into_iter().map(|g| g.id).collect::<Vec<_>>();

        assert_eq!(ids(fx.engine.groups.list_user_groups_for(member, member).unwrap()), vec![hidden.id, open.id]);
        assert_eq!(ids(fx.engine.groups.list_user_groups_for(member, creator).unwrap()), vec![hidden.id, open.id]);
        assert_eq!(ids(fx.engine.groups.list_user_groups_for(member, outsider).unwrap()), vec![open.id]);
    }

    #[test]
    fn concurrent_joins_create_exactly_one_membership() {
        let fx = Fixture::on_disk();
        let creator = fx.user("creator", false);
        let joiner = fx.user("joiner", false);
        let group_id = fx.db.create_group("park", false, creator).unwrap().id;

        let results = fx.race(8, move |engine| engine.groups.join_group(group_id, joiner, "member"));

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, CoreError::AlreadyMember(_)))
        );
    }
}
