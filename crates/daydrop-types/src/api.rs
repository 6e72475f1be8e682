use serde::{Deserialize, Serialize};

use crate::models::{DbId, ReportTarget};

// -- JWT Claims --

/// Bearer-token claims. Tokens are issued elsewhere; this side only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: DbId,
    pub exp: usize,
}

// -- Follows --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub followed_id: DbId,
}

// -- Groups --

fn default_role() -> String {
    "member".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinGroupRequest {
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub member_id: DbId,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: String,
}

// -- Drops --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishNotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDropRequest {
    #[serde(default)]
    pub caption: String,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    pub target: ReportTarget,
    pub target_id: DbId,
    pub reason: String,
}

// -- Errors --

/// Body returned for every rejected request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub reason: String,
}
