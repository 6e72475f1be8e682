//! Pure authorization predicates.
//!
//! Nothing here touches the store. The ledgers fetch the entities, ask these
//! questions, and translate a "no" into the specific `CoreError`.

use daydrop_types::models::{DbId, Group, GroupMember, MemberRole, MemberStatus, User, UserRole};

pub fn is_self(actor_id: DbId, target_id: DbId) -> bool {
    actor_id == target_id
}

/// True when `target` hides its graph from `requester_id`: the account is
/// private, the requester is someone else, and they do not hold an accepted follow.
pub fn is_private_and_unrelated(target: &User, requester_id: DbId, is_following: bool) -> bool {
    target.is_private && !is_self(requester_id, target.id) && !is_following
}

pub fn is_group_creator(user_id: DbId, group: &Group) -> bool {
    group.created_by_id == user_id
}

/// Manager role on a membership that is already active. A pending manager
/// row carries no authority.
pub fn has_manager_role(member: &GroupMember) -> bool {
    member.role == MemberRole::Manager && member.status == MemberStatus::Active
}

/// Authority to act on other members: the creator, or an active manager.
pub fn has_group_authority(actor_id: DbId, group: &Group, acting: Option<&GroupMember>) -> bool {
    is_group_creator(actor_id, group) || acting.is_some_and(has_manager_role)
}

/// The creator's membership may only be touched by the creator.
pub fn violates_creator_protection(target: &GroupMember, group: &Group, actor_id: DbId) -> bool {
    is_group_creator(target.member_id, group) && !is_self(actor_id, target.member_id)
}

pub fn is_admin(user: &User) -> bool {
    user.role == UserRole::Admin
}
