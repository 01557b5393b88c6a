//! Device inventory types.

use std::fmt;

use secrecy::SecretString;

/// How the engine reaches a device's CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessMethod {
    /// Interactive shell over SSH.
    Ssh,

    /// Line-oriented telnet session.
    Telnet,

    /// Anything else found in the inventory. Kept so the task can fail
    /// with a precise diagnostic instead of dropping the device.
    Other(String),
}

impl AccessMethod {
    /// Parse an inventory value (case-insensitive).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssh" => Self::Ssh,
            "telnet" => Self::Telnet,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    /// Conventional port for this access method.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Telnet => 23,
            _ => 22,
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => f.write_str("ssh"),
            Self::Telnet => f.write_str("telnet"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Login material for a device.
#[derive(Debug)]
pub struct Credentials {
    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Privilege-elevation ("enable") secret, if the device has one.
    pub enable: Option<SecretString>,
}

/// A named operation requested against a device, e.g. `running-config`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action(String);

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A network node to back up.
///
/// Immutable after the inventory is loaded; each scheduler task owns one.
#[derive(Debug)]
pub struct Device {
    /// Unique device name. Also the artifact directory name.
    pub name: String,

    /// Manufacturer tag used to pick a driver (e.g. `cisco`, `h3c`).
    pub manufacturer: String,

    /// Access method.
    pub access: AccessMethod,

    /// Hostname or IP address.
    pub address: String,

    /// TCP port for the access method.
    pub port: u16,

    /// Login credentials.
    pub credentials: Credentials,

    /// Disabled devices never produce a task.
    pub enabled: bool,

    /// Requested actions, run in this order.
    pub actions: Vec<Action>,
}

impl Device {
    /// Create an enabled SSH device with no actions.
    pub fn new(
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            manufacturer: manufacturer.into(),
            access: AccessMethod::Ssh,
            address: address.into(),
            port: AccessMethod::Ssh.default_port(),
            credentials: Credentials {
                username: username.into(),
                password: SecretString::from(password.into()),
                enable: None,
            },
            enabled: true,
            actions: Vec::new(),
        }
    }

    /// Set the access method and its default port.
    pub fn with_access(mut self, access: AccessMethod) -> Self {
        self.port = access.default_port();
        self.access = access;
        self
    }

    /// Override the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the enable secret.
    pub fn with_enable(mut self, secret: impl Into<String>) -> Self {
        self.credentials.enable = Some(SecretString::from(secret.into()));
        self
    }

    /// Append a requested action.
    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
