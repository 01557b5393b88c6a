//! Connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::device::Device;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking.
    Disabled,
}

/// Settings shared by every connection in a run.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    /// Timeout for TCP connect plus login.
    pub timeout: Duration,

    /// Terminal width requested for the PTY.
    pub terminal_width: u32,

    /// Terminal height requested for the PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file. `None` uses the user's default file.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

/// Everything needed to open one transport to one device.
#[derive(Debug)]
pub struct TransportConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Target port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// Run-wide settings.
    pub settings: ConnectSettings,
}

impl TransportConfig {
    /// Build the connection parameters for a device.
    pub fn for_device(device: &Device, settings: &ConnectSettings) -> Self {
        Self {
            host: device.address.clone(),
            port: device.port,
            username: device.credentials.username.clone(),
            password: SecretString::from(device.credentials.password.expose_secret().to_string()),
            settings: settings.clone(),
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
