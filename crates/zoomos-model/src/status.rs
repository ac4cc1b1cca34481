use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Processing status of an uploaded file.
///
/// `Pending` is the initial state and `Processing` the only intermediate one;
/// every other status ends the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    CompletedWithErrors,
    Error,
    Cancelled,
}

impl FileStatus {
    pub const ALL: [FileStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::CompletedWithErrors,
        Self::Error,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether a run may move the record from `self` to `next`.
    pub fn can_transition_to(self, next: FileStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Pending | Self::Processing, Self::Cancelled) => true,
            // Failures before the run starts (e.g. unreadable upload) are recorded too.
            (Self::Pending, Self::Error) => true,
            (Self::Processing, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownStatus(s.to_string()))
    }
}
