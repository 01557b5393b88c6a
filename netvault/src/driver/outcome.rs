//! Outcome of one action on one device.

use std::fmt;

/// Terminal status of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Succeeded,

    /// Failed, with a diagnostic for the report.
    Failed(String),
}

/// Result of one attempted (device, action) pair.
///
/// Exactly one is recorded per requested action, whether it ran, failed,
/// or never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Device name.
    pub device: String,

    /// Action name.
    pub action: String,

    /// What happened.
    pub status: Status,
}

impl Outcome {
    /// A successful outcome.
    pub fn success(device: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            action: action.into(),
            status: Status::Succeeded,
        }
    }

    /// A failed outcome carrying `reason` as its diagnostic.
    pub fn failure(
        device: impl Into<String>,
        action: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            device: device.into(),
            action: action.into(),
            status: Status::Failed(reason.to_string()),
        }
    }

    /// Check if the action succeeded.
    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }

    /// The failure diagnostic, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match &self.status {
            Status::Succeeded => None,
            Status::Failed(reason) => Some(reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.device, self.action)
    }
}
