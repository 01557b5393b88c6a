//! Run configuration, loaded from YAML.
//!
//! ```yaml
//! workers: 20
//! timeouts: { connect: 30, step: 30, transfer: 120, task: 600 }
//! transfer:
//!   ip: 10.0.0.5
//!   username: backup        # SCP push only
//!   password: scp-secret
//! repository:
//!   path: /srv/configs
//! passwords:
//!   plaintext: false        # passwords below are ciphertext
//! logging:
//!   path: /var/log/netvault.log
//! ssh:
//!   host_keys: accept-new   # strict | accept-new | disabled
//! devices:
//!   - name: core-sw1
//!     manufacturer: cisco
//!     access: { method: ssh, address: 10.0.1.1, username: admin, password: "...", enable: "..." }
//!     actions: [running-config, startup-config]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use secrecy::SecretString;
use serde::Deserialize;

use crate::artifacts::ArtifactStore;
use crate::device::{AccessMethod, Action, Credentials, Device};
use crate::driver::{RunContext, Timeouts, TransferTarget};
use crate::error::{ConfigError, Result};
use crate::scheduler::{DEFAULT_WORKERS, SchedulerConfig};
use crate::secret::SecretCipher;
use crate::transport::{ConnectSettings, HostKeyVerification};

/// Name of the default staging directory inside the repository.
pub const STAGING_DIR: &str = ".netvault";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default)]
    timeouts: RawTimeouts,
    transfer: RawTransfer,
    repository: RawRepository,
    #[serde(default)]
    passwords: RawPasswords,
    #[serde(default)]
    logging: RawLogging,
    #[serde(default)]
    ssh: RawSsh,
    #[serde(default)]
    devices: Vec<RawDevice>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Timeouts in seconds.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTimeouts {
    connect: u64,
    step: u64,
    transfer: u64,
    task: u64,
}

impl Default for RawTimeouts {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            connect: defaults.connect.as_secs(),
            step: defaults.step.as_secs(),
            transfer: defaults.transfer.as_secs(),
            task: defaults.task.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTransfer {
    ip: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    staging: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPasswords {
    plaintext: bool,
}

impl Default for RawPasswords {
    fn default() -> Self {
        Self { plaintext: true }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLogging {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSsh {
    host_keys: HostKeyVerification,
    known_hosts: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDevice {
    #[serde(default)]
    name: String,
    #[serde(default)]
    manufacturer: String,
    #[serde(default = "enabled")]
    enabled: bool,
    access: RawAccess,
    #[serde(default)]
    actions: Vec<String>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAccess {
    #[serde(default = "ssh")]
    method: String,
    #[serde(default)]
    address: String,
    port: Option<u16>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    enable: Option<String>,
}

fn ssh() -> String {
    "ssh".to_string()
}

/// A validated run configuration.
#[derive(Debug)]
pub struct Config {
    /// Worker pool size.
    pub workers: usize,

    /// Run deadlines.
    pub timeouts: Timeouts,

    /// Where devices push their files.
    pub transfer: TransferTarget,

    /// Repository directory the artifact tree is published into.
    pub repository: PathBuf,

    /// Staging root devices write into during the run.
    pub staging: PathBuf,

    /// Log file, if any.
    pub log_file: Option<PathBuf>,

    /// SSH host key policy.
    pub host_keys: HostKeyVerification,

    /// known_hosts override.
    pub known_hosts: Option<PathBuf>,

    /// Devices, in file order.
    pub devices: Vec<Device>,
}

impl Config {
    /// Read and validate `path`. `master` decrypts stored passwords when
    /// the file says they are not plaintext.
    pub fn load(path: impl AsRef<Path>, master: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, path, master)?;
        debug!(
            "loaded {} devices from {}",
            config.devices.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate YAML text. `origin` names the source in errors.
    pub fn parse(text: &str, origin: &Path, master: Option<&str>) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::validate(raw, master)
    }

    fn validate(raw: RawConfig, master: Option<&str>) -> Result<Self> {
        if raw.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }
        if raw.devices.is_empty() {
            return Err(invalid("no devices configured"));
        }
        if raw.transfer.ip.trim().is_empty() {
            return Err(invalid("transfer.ip is required"));
        }
        if !raw.repository.path.is_dir() {
            return Err(invalid(format!(
                "repository path {} does not exist",
                raw.repository.path.display()
            )));
        }

        let cipher = if raw.passwords.plaintext {
            None
        } else {
            let master = master.ok_or_else(|| {
                invalid("passwords are encrypted: a master password is required")
            })?;
            Some(SecretCipher::new(master)?)
        };
        let reveal = |value: String| -> Result<String> {
            match &cipher {
                Some(cipher) if !value.is_empty() => cipher.decrypt(&value),
                _ => Ok(value),
            }
        };

        let mut names = HashSet::new();
        let mut devices = Vec::with_capacity(raw.devices.len());
        for entry in raw.devices {
            if entry.name.trim().is_empty() {
                return Err(invalid("device without a name"));
            }
            if !names.insert(entry.name.clone()) {
                return Err(invalid(format!("duplicate device name '{}'", entry.name)));
            }
            let require = |value: &str, field: &str| {
                if value.trim().is_empty() {
                    Err(invalid(format!("device '{}': {field} is required", entry.name)))
                } else {
                    Ok(())
                }
            };
            require(&entry.manufacturer, "manufacturer")?;
            require(&entry.access.address, "access.address")?;
            require(&entry.access.username, "access.username")?;
            require(&entry.access.password, "access.password")?;

            let access = AccessMethod::parse(&entry.access.method);
            let port = entry.access.port.unwrap_or_else(|| access.default_port());
            let enable = entry
                .access
                .enable
                .filter(|secret| !secret.is_empty())
                .map(|secret| reveal(secret).map(SecretString::from))
                .transpose()?;

            devices.push(Device {
                name: entry.name,
                manufacturer: entry.manufacturer,
                access,
                address: entry.access.address,
                port,
                credentials: Credentials {
                    username: entry.access.username,
                    password: SecretString::from(reveal(entry.access.password)?),
                    enable,
                },
                enabled: entry.enabled,
                actions: entry.actions.into_iter().map(Action::new).collect(),
            });
        }

        let transfer = TransferTarget::new(raw.transfer.ip)
            .with_login(raw.transfer.username, reveal(raw.transfer.password)?);
        let staging = raw
            .transfer
            .staging
            .unwrap_or_else(|| raw.repository.path.join(STAGING_DIR));

        Ok(Self {
            workers: raw.workers,
            timeouts: Timeouts {
                connect: Duration::from_secs(raw.timeouts.connect),
                step: Duration::from_secs(raw.timeouts.step),
                transfer: Duration::from_secs(raw.timeouts.transfer),
                task: Duration::from_secs(raw.timeouts.task),
            },
            transfer,
            repository: raw.repository.path,
            staging,
            log_file: raw.logging.path,
            host_keys: raw.ssh.host_keys,
            known_hosts: raw.ssh.known_hosts,
            devices,
        })
    }

    /// Connection settings for the run's connector.
    pub fn connect_settings(&self) -> ConnectSettings {
        ConnectSettings {
            timeout: self.timeouts.connect,
            host_key_verification: self.host_keys.clone(),
            known_hosts_path: self.known_hosts.clone(),
            ..ConnectSettings::default()
        }
    }

    /// Worker pool settings.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::with_workers(self.workers).with_task_timeout(self.timeouts.task)
    }

    /// The staging tree for this run.
    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.staging)
    }

    /// Split off the run context, leaving the device list behind.
    pub fn into_run(self, verbose: bool) -> (Arc<RunContext>, Vec<Device>) {
        let ctx = RunContext {
            artifacts: ArtifactStore::new(self.staging),
            transfer: self.transfer,
            timeouts: self.timeouts,
            verbose,
        };
        (Arc::new(ctx), self.devices)
    }
}

fn invalid(message: impl Into<String>) -> crate::error::Error {
    ConfigError::Invalid(message.into()).into()
}
