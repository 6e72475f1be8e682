use serde::{Deserialize, Serialize};

use crate::models::{DbId, MemberRole, MemberStatus};

/// Events pushed to a user's feed after a relationship changes.
///
/// Each event has exactly one recipient; delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// Someone asked to follow (or, for public accounts, started following) the recipient
    FollowRequested {
        follow_id: DbId,
        follower_id: DbId,
        followed_id: DbId,
        accepted: bool,
    },

    /// The recipient's pending follow request was accepted
    FollowAccepted {
        follow_id: DbId,
        follower_id: DbId,
        followed_id: DbId,
    },

    /// A user joined (or asked to join) a group the recipient created
    MemberJoined {
        group_id: DbId,
        member_id: DbId,
        owner_id: DbId,
        status: MemberStatus,
    },

    /// The recipient's pending membership was accepted
    MemberAccepted { group_id: DbId, member_id: DbId },

    /// A manager added the recipient to a group
    MemberAdded {
        group_id: DbId,
        member_id: DbId,
        role: MemberRole,
    },

    /// The recipient's role in a group changed
    MemberRoleChanged {
        group_id: DbId,
        member_id: DbId,
        role: MemberRole,
    },
}

impl FeedEvent {
    /// The user whose feed receives this event.
    pub fn recipient(&self) -> DbId {
        match self {
            Self::FollowRequested { followed_id, .. } => *followed_id,
            Self::FollowAccepted { follower_id, .. } => *follower_id,
            Self::MemberJoined { owner_id, .. } => *owner_id,
            Self::MemberAccepted { member_id, .. } => *member_id,
            Self::MemberAdded { member_id, .. } => *member_id,
            Self::MemberRoleChanged { member_id, .. } => *member_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FollowRequested { .. } => "follow_requested",
            Self::FollowAccepted { .. } => "follow_accepted",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberAccepted { .. } => "member_accepted",
            Self::MemberAdded { .. } => "member_added",
            Self::MemberRoleChanged { .. } => "member_role_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_events_route_to_the_other_party() {
        let requested = FeedEvent::FollowRequested {
            follow_id: 1,
            follower_id: 2,
            followed_id: 3,
            accepted: false,
        };
        assert_eq!(requested.recipient(), 3);

        let accepted = FeedEvent::FollowAccepted {
            follow_id: 1,
            follower_id: 2,
            followed_id: 3,
        };
        assert_eq!(accepted.recipient(), 2);
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = FeedEvent::MemberAccepted {
            group_id: 4,
            member_id: 9,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MemberAccepted");
        assert_eq!(json["data"]["member_id"], 9);
    }
}
