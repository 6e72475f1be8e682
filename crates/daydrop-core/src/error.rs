use std::fmt;

use daydrop_types::models::DbId;

/// Why a drop was refused by the eligibility gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    AlreadyDropped,
    NotCurrent,
}

impl fmt::Display for DropRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDropped => f.write_str("already dropped this notification"),
            Self::NotCurrent => f.write_str("not the current notification"),
        }
    }
}

/// Coarse classification callers map to their own presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    InvalidState,
    CannotDrop,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::InvalidState => "invalid_state",
            Self::CannotDrop => "cannot_drop",
            Self::Storage => "storage",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("cannot follow yourself")]
    SelfFollow,

    #[error("invalid role '{0}', expected 'manager' or 'member'")]
    InvalidRole(String),

    #[error("user {0} not found")]
    UserNotFound(DbId),

    #[error("group {0} not found")]
    GroupNotFound(DbId),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("already following user {0}")]
    AlreadyFollowing(DbId),

    #[error("already a member of group {0}")]
    AlreadyMember(DbId),

    #[error("already reported this {0}")]
    AlreadyReported(&'static str),

    #[error("user {0} cannot be followed")]
    FollowNotAllowed(DbId),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("account {0} is private")]
    PrivateAccount(DbId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cannot drop: {0}")]
    CannotDrop(DropRejection),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::SelfFollow | Self::InvalidRole(_) => ErrorKind::Validation,
            Self::UserNotFound(_) | Self::GroupNotFound(_) | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyFollowing(_) | Self::AlreadyMember(_) | Self::AlreadyReported(_) => ErrorKind::Conflict,
            Self::FollowNotAllowed(_) | Self::Unauthorized(_) | Self::PrivateAccount(_) => ErrorKind::Unauthorized,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::CannotDrop(_) => ErrorKind::CannotDrop,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Human-readable reason. Storage details are not exposed.
    pub fn reason(&self) -> String {
        match self {
            Self::Storage(_) => "storage unavailable".to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn not_a_manager() -> Self {
        Self::Unauthorized("not a manager".to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.into())
    }
}
