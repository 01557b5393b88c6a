//! Telnet transport for devices that only offer a legacy terminal.
//!
//! Option negotiation is kept to the minimum a CLI needs: the server may
//! echo and suppress go-ahead, every other option is refused. Login is part
//! of [`TelnetTransport::connect`] so a returned transport is always
//! authenticated.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use log::{debug, trace};
use regex::bytes::Regex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use super::Transport;
use super::config::TransportConfig;
use crate::error::{Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

static USERNAME_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(user ?name|login)\s*:\s*$").unwrap());

static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password\s*:\s*$").unwrap());

static LOGIN_REJECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(login (failed|incorrect)|authentication failed|access denied|invalid (user|password))",
    )
    .unwrap()
});

static CLI_PROMPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[>#\]$]\s*$").unwrap());

/// Telnet session speaking NVT over a plain TCP stream.
pub struct TelnetTransport {
    stream: TcpStream,
    decoder: TelnetDecoder,
    host: String,
    login_timeout: Duration,
    /// Output that followed the password, handed out by the first receive.
    pending: Option<Vec<u8>>,
}

impl TelnetTransport {
    /// Connect, negotiate and log in.
    pub async fn connect(config: TransportConfig) -> Result<Self> {
        let timeout = config.settings.timeout;

        debug!("telnet: connecting to {}", config.socket_addr());

        let connect = TcpStream::connect((config.host.as_str(), config.port));
        let stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|source| TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;

        let mut transport = Self {
            stream,
            decoder: TelnetDecoder::default(),
            host: config.host.clone(),
            login_timeout: timeout,
            pending: None,
        };

        let deadline = Instant::now() + timeout;
        transport.login(&config, deadline).await?;

        debug!("telnet: logged in to {}", config.host);
        Ok(transport)
    }

    /// Answer the username and password prompts, then wait for the CLI.
    async fn login(&mut self, config: &TransportConfig, deadline: Instant) -> Result<()> {
        self.read_until(&USERNAME_PROMPT, deadline).await?;
        self.send(&format!("{}\n", config.username)).await?;

        self.read_until(&PASSWORD_PROMPT, deadline).await?;
        self.send(&format!("{}\n", config.password.expose_secret())).await?;

        let mut seen = Vec::new();
        loop {
            if LOGIN_REJECTED.is_match(&seen) || USERNAME_PROMPT.is_match(&seen) {
                return Err(TransportError::AuthenticationFailed {
                    user: config.username.clone(),
                }
                .into());
            }
            if CLI_PROMPT.is_match(&seen) {
                self.pending = Some(seen);
                return Ok(());
            }
            seen.extend_from_slice(&self.read_chunk(deadline).await?);
        }
    }

    async fn read_until(&mut self, pattern: &Regex, deadline: Instant) -> Result<Vec<u8>> {
        let mut seen = Vec::new();
        while !pattern.is_match(&seen) {
            seen.extend_from_slice(&self.read_chunk(deadline).await?);
        }
        Ok(seen)
    }

    /// Read one decoded chunk during login, failing at the deadline.
    async fn read_chunk(&mut self, deadline: Instant) -> Result<Vec<u8>> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receive(remaining).await? {
                Some(data) => return Ok(data),
                None if Instant::now() >= deadline => {
                    return Err(TransportError::Timeout(self.login_timeout).into());
                }
                None => continue,
            }
        }
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        let wire = encode_line(text.as_bytes());
        self.stream
            .write_all(&wire)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 4096];
        loop {
            let read = match tokio::time::timeout_at(deadline, self.stream.read(&mut buf)).await {
                Ok(read) => read.map_err(TransportError::Io)?,
                Err(_) => return Ok(None),
            };
            if read == 0 {
                debug!("telnet: {} closed the connection", self.host);
                return Err(TransportError::Disconnected.into());
            }

            let decoded = self.decoder.decode(&buf[..read]);
            if !decoded.replies.is_empty() {
                trace!("telnet: {} negotiation bytes to {}", decoded.replies.len(), self.host);
                self.stream
                    .write_all(&decoded.replies)
                    .await
                    .map_err(TransportError::Io)?;
            }
            // A chunk of pure negotiation carries no output; keep waiting.
            if !decoded.data.is_empty() {
                return Ok(Some(decoded.data));
            }
        }
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}

/// Escape IAC bytes and translate bare `\n` to CRLF.
fn encode_line(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 8);
    let mut prev = 0u8;
    for &byte in text {
        match byte {
            b'\n' if prev != b'\r' => out.extend_from_slice(b"\r\n"),
            IAC => out.extend_from_slice(&[IAC, IAC]),
            other => out.push(other),
        }
        prev = byte;
    }
    out
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Output of one decode pass.
#[derive(Debug, Default)]
struct Decoded {
    data: Vec<u8>,
    replies: BytesMut,
}

/// Incremental NVT decoder. Commands may be split across reads, so the
/// parser state survives between calls.
#[derive(Debug, Default)]
struct TelnetDecoder {
    state: DecodeState,
}

impl TelnetDecoder {
    fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut out = Decoded::default();
        for &byte in input {
            self.state = match (self.state, byte) {
                (DecodeState::Data, IAC) => DecodeState::Iac,
                (DecodeState::Data, 0) => DecodeState::Data,
                (DecodeState::Data, b) => {
                    out.data.push(b);
                    DecodeState::Data
                }
                (DecodeState::Iac, IAC) => {
                    out.data.push(IAC);
                    DecodeState::Data
                }
                (DecodeState::Iac, cmd @ (DO | DONT | WILL | WONT)) => DecodeState::Negotiate(cmd),
                (DecodeState::Iac, SB) => DecodeState::Subnegotiation,
                (DecodeState::Iac, _) => DecodeState::Data,
                (DecodeState::Negotiate(cmd), option) => {
                    if let Some(reply) = negotiate(cmd, option) {
                        out.replies.put_slice(&[IAC, reply, option]);
                    }
                    DecodeState::Data
                }
                (DecodeState::Subnegotiation, IAC) => DecodeState::SubnegotiationIac,
                (DecodeState::Subnegotiation, _) => DecodeState::Subnegotiation,
                (DecodeState::SubnegotiationIac, SE) => DecodeState::Data,
                (DecodeState::SubnegotiationIac, _) => DecodeState::Subnegotiation,
            };
        }
        out
    }
}

/// Reply to a negotiation request, or `None` when no reply is due.
fn negotiate(cmd: u8, option: u8) -> Option<u8> {
    match (cmd, option) {
        (WILL, OPT_ECHO | OPT_SGA) => Some(DO),
        (WILL, _) => Some(DONT),
        (DO, OPT_SGA) => Some(WILL),
        (DO, _) => Some(WONT),
        // Acknowledgements of our refusals need no answer.
        _ => None,
    }
}
