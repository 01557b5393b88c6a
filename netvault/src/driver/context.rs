//! Run-wide context shared by every driver in a run.

use std::time::Duration;

use secrecy::SecretString;

use crate::artifacts::ArtifactStore;

/// Deadlines for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect plus login.
    pub connect: Duration,

    /// Default wait for each expect step.
    pub step: Duration,

    /// How long to keep reading for a completion marker after the last step.
    pub transfer: Duration,

    /// Hard deadline for one device task, all actions included.
    pub task: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            step: Duration::from_secs(30),
            transfer: Duration::from_secs(120),
            task: Duration::from_secs(600),
        }
    }
}

/// The file-receiving service devices push to.
#[derive(Debug)]
pub struct TransferTarget {
    /// Address devices send files to.
    pub ip: String,

    /// SCP login on the receiving host.
    pub username: String,

    /// SCP password on the receiving host.
    pub password: SecretString,
}

impl TransferTarget {
    /// A target that needs no login (TFTP).
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            username: String::new(),
            password: SecretString::from(String::new()),
        }
    }

    /// Set the SCP login.
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = SecretString::from(password.into());
        self
    }
}

/// Everything a driver needs besides its device and platform.
#[derive(Debug)]
pub struct RunContext {
    /// Where devices push files.
    pub transfer: TransferTarget,

    /// Staging tree the files land in.
    pub artifacts: ArtifactStore,

    /// Deadlines.
    pub timeouts: Timeouts,

    /// Log step traffic at info level.
    pub verbose: bool,
}
