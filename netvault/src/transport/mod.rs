//! Transport layer: raw, unframed, full-duplex sessions to devices.
//!
//! A [`Transport`] knows nothing about prompts or commands. It moves text
//! in and bytes out; all turn-taking is done by the expect session in
//! [`crate::channel`]. A [`Connector`] opens the transport that matches a
//! device's access method.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;
mod telnet;

use std::time::Duration;

use async_trait::async_trait;

pub use config::{ConnectSettings, HostKeyVerification, TransportConfig};
pub use ssh::SshTransport;
pub use telnet::TelnetTransport;

use crate::device::{AccessMethod, Device};
use crate::error::{DriverError, Result};

/// An open interactive session to one device.
#[async_trait]
pub trait Transport: Send {
    /// Write text to the device. `\n` marks a line end; transports
    /// translate it to whatever the wire expects.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Wait up to `timeout` for output.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Returns
    /// [`TransportError::Disconnected`](crate::error::TransportError::Disconnected)
    /// once the peer has closed the session.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// Close the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens transports for devices.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and authenticate. Fails with a connection error if the
    /// device is unreachable and an authentication error if the
    /// credentials are rejected.
    async fn open(&self, device: &Device) -> Result<Box<dyn Transport>>;
}

/// Connector that opens real SSH and telnet sessions.
#[derive(Debug, Clone, Default)]
pub struct NetworkConnector {
    settings: ConnectSettings,
}

impl NetworkConnector {
    pub fn new(settings: ConnectSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for NetworkConnector {
    async fn open(&self, device: &Device) -> Result<Box<dyn Transport>> {
        let config = TransportConfig::for_device(device, &self.settings);
        match &device.access {
            AccessMethod::Ssh => Ok(Box::new(SshTransport::connect(config).await?)),
            AccessMethod::Telnet => Ok(Box::new(TelnetTransport::connect(config).await?)),
            AccessMethod::Other(method) => Err(DriverError::UnsupportedAccessMethod {
                platform: device.manufacturer.clone(),
                method: method.clone(),
            }
            .into()),
        }
    }
}
