use std::fmt;

use chrono::{DateTime, Utc};
use shared::domain::PointId;
use thiserror::Error;

/// Store mutation attempted while the session did not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Modify,
    Delete,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Capability,
    Remote,
    Session,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("cannot add point: timestamp {attempted} must be later than the previous point ({latest})")]
    TimestampOrderViolation {
        attempted: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
    #[error("cannot update point: timestamp {timestamp} conflicts with point {conflicting}")]
    TimestampConflict {
        timestamp: DateTime<Utc>,
        conflicting: PointId,
    },
    #[error("point {0} not found")]
    NotFound(PointId),
    #[error("cannot {0} points in testing mode")]
    ModeCapabilityDenied(Mutation),
    #[error("please add at least {required} points to create a course (have {found})")]
    InsufficientPoints { required: usize, found: usize },
    #[error("altitude must be a non-negative number of meters, got {0}")]
    InvalidAltitude(f64),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("remote request failed: {0}")]
    RemoteFailure(String),
    #[error("another request is still in progress")]
    Busy,
    #[error("no course loaded for testing")]
    NoActiveCourse,
    #[error("no point deletion awaiting confirmation")]
    NoPendingDeletion,
}

impl AnnotationError {
    pub fn remote(err: &anyhow::Error) -> Self {
        Self::RemoteFailure(format!("{err:#}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TimestampOrderViolation { .. }
            | Self::TimestampConflict { .. }
            | Self::NotFound(_)
            | Self::InsufficientPoints { .. }
            | Self::InvalidAltitude(_)
            | Self::InvalidSetting(_) => ErrorKind::Validation,
            Self::ModeCapabilityDenied(_) => ErrorKind::Capability,
            Self::RemoteFailure(_) => ErrorKind::Remote,
            Self::Busy | Self::NoActiveCourse | Self::NoPendingDeletion => ErrorKind::Session,
        }
    }
}

pub type Result<T, E = AnnotationError> = std::result::Result<T, E>;
