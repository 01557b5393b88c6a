//! Scripted transport for tests.
//!
//! Each device gets a script: a greeting emitted on open, then one reply per
//! `send`. A `None` reply keeps the device silent. An echoing device first
//! plays back every line it is sent, like a PTY shell. When no data is
//! pending, `receive` sleeps out its full timeout, so tests run with a
//! paused clock.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Connector, Transport};
use crate::device::Device;
use crate::error::{Result, TransportError};

/// What a scripted device does.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    greeting: Option<String>,
    replies: VecDeque<Option<String>>,
    latency: Duration,
    echo: bool,
    refuse: bool,
    reject_login: bool,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Emit `text` as soon as the session opens.
    pub(crate) fn greeting(mut self, text: &str) -> Self {
        self.greeting = Some(text.to_string());
        self
    }

    /// Answer the next `send` with `text`.
    pub(crate) fn reply(mut self, text: &str) -> Self {
        self.replies.push_back(Some(text.to_string()));
        self
    }

    /// Answer the next `send` with nothing.
    pub(crate) fn silence(mut self) -> Self {
        self.replies.push_back(None);
        self
    }

    /// Delay every chunk by `latency`.
    pub(crate) fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Play back every line sent, with CRLF, before the reply.
    pub(crate) fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Fail `open` as if the host were unreachable.
    pub(crate) fn unreachable(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Fail `open` as if the password were wrong.
    pub(crate) fn bad_password(mut self) -> Self {
        self.reject_login = true;
        self
    }
}

/// Counts open transports and remembers the high-water mark.
#[derive(Debug, Default)]
pub(crate) struct Gauge {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

impl Gauge {
    fn acquire(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

/// A transport that plays back a [`Script`].
pub(crate) struct MockTransport {
    /// Chunks not yet received, each with the delay before it arrives.
    pending: VecDeque<(Duration, Vec<u8>)>,
    replies: VecDeque<Option<String>>,
    latency: Duration,
    echo: bool,
    sent: Arc<Mutex<Vec<String>>>,
    gauge: Arc<Gauge>,
}

impl MockTransport {
    pub(crate) fn new(script: Script) -> Self {
        Self::with_gauge(script, Arc::new(Gauge::default()), Arc::default())
    }

    fn with_gauge(script: Script, gauge: Arc<Gauge>, sent: Arc<Mutex<Vec<String>>>) -> Self {
        gauge.acquire();
        Self {
            pending: script
                .greeting
                .map(|text| (script.latency, text.into_bytes()))
                .into_iter()
                .collect(),
            replies: script.replies,
            latency: script.latency,
            echo: script.echo,
            sent,
            gauge,
        }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.gauge.release();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.echo {
            let echoed = text.replace('\n', "\r\n");
            self.pending.push_back((Duration::ZERO, echoed.into_bytes()));
        }
        if let Some(Some(reply)) = self.replies.pop_front() {
            self.pending.push_back((self.latency, reply.into_bytes()));
        }
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.pending.front_mut() {
            Some((delay, _)) if *delay <= timeout => {
                let delay = *delay;
                tokio::time::sleep(delay).await;
                Ok(self.pending.pop_front().map(|(_, data)| data))
            }
            Some((delay, _)) => {
                // Still in flight; it arrives during a later receive.
                *delay -= timeout;
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Connector handing out [`MockTransport`]s by device name.
#[derive(Default)]
pub(crate) struct MockConnector {
    scripts: Mutex<HashMap<String, Script>>,
    fallback: Option<Script>,
    sent: Mutex<HashMap<String, Arc<Mutex<Vec<String>>>>>,
    pub(crate) gauge: Arc<Gauge>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Script for one device.
    pub(crate) fn device(self, name: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(name.to_string(), script);
        self
    }

    /// Script for any device without its own.
    pub(crate) fn fallback(mut self, script: Script) -> Self {
        self.fallback = Some(script);
        self
    }

    /// Everything sent to `device`, in order.
    pub(crate) fn sent(&self, device: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .get(device)
            .map(|log| log.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, device: &Device) -> Result<Box<dyn Transport>> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&device.name)
            .cloned()
            .or_else(|| self.fallback.clone())
            .unwrap_or_default();

        if script.refuse {
            return Err(TransportError::ConnectionFailed {
                host: device.address.clone(),
                port: device.port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }
            .into());
        }
        if script.reject_login {
            return Err(TransportError::AuthenticationFailed {
                user: device.credentials.username.clone(),
            }
            .into());
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        self.sent
            .lock()
            .unwrap()
            .insert(device.name.clone(), log.clone());
        Ok(Box::new(MockTransport::with_gauge(script, self.gauge.clone(), log)))
    }
}
