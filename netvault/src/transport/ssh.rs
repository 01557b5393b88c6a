//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::{HostKeyVerification, TransportConfig};
use crate::error::{Result, TransportError};

/// Interactive shell over SSH: one session, one PTY channel.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The PTY channel running the device's shell.
    channel: Channel<Msg>,

    /// Target, for log lines.
    host: String,
}

impl SshTransport {
    /// Connect to the SSH server, authenticate and start a shell.
    pub async fn connect(config: TransportConfig) -> Result<Self> {
        let timeout = config.settings.timeout;
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.settings.host_key_verification.clone(),
            known_hosts_path: config.settings.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("ssh: connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| {
            // If check_server_key stored a detailed error, use that instead
            // of the generic russh::Error::UnknownKey
            let stored = host_key_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                },
                (None, other) => TransportError::Ssh(other),
            }
        })?;

        tokio::time::timeout(timeout, Self::authenticate(&mut session, &config))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        let channel = tokio::time::timeout(timeout, Self::open_shell(&session, &config))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        debug!("ssh: shell open on {}", config.host);

        Ok(Self {
            session,
            channel,
            host: config.host,
        })
    }

    /// Open a session channel with a PTY and a shell.
    async fn open_shell(
        session: &Handle<SshHandler>,
        config: &TransportConfig,
    ) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.settings.terminal_width,
                config.settings.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Authenticate with the server using the device password.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &TransportConfig,
    ) -> Result<()> {
        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.channel
            .data(text.as_bytes())
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let msg = match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Ok(msg) => msg,
                Err(_) => return Ok(None),
            };

            match msg {
                Some(ChannelMsg::Data { data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    debug!("ssh: {} closed the channel", self.host);
                    return Err(TransportError::Disconnected.into());
                }
                Some(other) => trace!("ssh: ignoring {:?} from {}", other, self.host),
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        if let Err(e) = self.channel.close().await {
            trace!("ssh: channel close on {}: {}", self.host, e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        *self
            .host_key_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(error);
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    // Unknown host, learn the key
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
