//! Expect session: drives a [`Transport`] one step at a time.

use std::time::Duration;

use log::{Level, debug, log, trace};
use regex::bytes::Regex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::buffer::{Mark, OutputBuffer};
use super::step::{Completion, ExpectStep};
use crate::error::{ChannelError, Error, Result, TransportError};
use crate::transport::Transport;

/// An interactive session with one device.
///
/// Every wait is bounded by a deadline and can be interrupted by the
/// session's cancellation token.
pub struct Session {
    /// Device name, for log lines.
    device: String,

    /// The open transport.
    transport: Box<dyn Transport>,

    /// Output received so far.
    buffer: OutputBuffer,

    /// Stops the session at the next step boundary or wait.
    cancel: CancellationToken,

    /// Level for per-step log lines.
    level: Level,
}

impl Session {
    /// Wrap an open transport. With `verbose`, step traffic is logged at
    /// info level instead of debug.
    pub fn new(
        device: impl Into<String>,
        transport: Box<dyn Transport>,
        cancel: CancellationToken,
        verbose: bool,
    ) -> Self {
        Self {
            device: device.into(),
            transport,
            buffer: OutputBuffer::new(),
            cancel,
            level: if verbose { Level::Info } else { Level::Debug },
        }
    }

    /// Run one step: send its input, then wait until its completion
    /// predicate holds for the output that arrived after the send.
    ///
    /// Fails with [`ChannelError::ProtocolTimeout`] if the predicate is
    /// not met by the step's deadline.
    pub async fn run(&mut self, step: &ExpectStep) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ChannelError::Cancelled.into());
        }

        let mark = self.buffer.mark();

        if let Some(input) = &step.input {
            log!(self.level, "{}: > {}", self.device, step.display_input());
            self.transport.send(&format!("{input}\n")).await?;
        }

        if step.completion == Completion::Always {
            return Ok(());
        }

        let deadline = Instant::now() + step.timeout;
        while !self.satisfied(&step.completion, mark) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(
                    "{}: step '{}' timed out after {:?}",
                    self.device, step, step.timeout
                );
                return Err(ChannelError::ProtocolTimeout {
                    step: step.to_string(),
                    timeout: step.timeout,
                }
                .into());
            }
            self.read(remaining).await?;
        }

        log!(
            self.level,
            "{}: < {}",
            self.device,
            self.buffer.text_since(mark).trim_end()
        );
        Ok(())
    }

    /// Run steps in order, stopping at the first failure.
    pub async fn run_all(&mut self, steps: &[ExpectStep]) -> Result<()> {
        for step in steps {
            self.run(step).await?;
        }
        Ok(())
    }

    /// Keep reading until one of `markers` appears after `mark`, the
    /// output after `mark` ends at `prompt` (if given), `within` elapses,
    /// or the device closes the session.
    ///
    /// Running out of time is not an error here: the caller classifies
    /// whatever output arrived.
    pub async fn settle(
        &mut self,
        mark: Mark,
        markers: &[&str],
        prompt: Option<&Regex>,
        within: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + within;
        loop {
            if markers.iter().any(|m| self.buffer.contains_since(mark, m)) {
                return Ok(());
            }
            if prompt.is_some_and(|p| p.is_match(self.buffer.since(mark))) {
                trace!("{}: prompt is back", self.device);
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("{}: no completion marker within {:?}", self.device, within);
                return Ok(());
            }
            match self.read(remaining).await {
                Ok(()) => {}
                Err(Error::Transport(TransportError::Disconnected)) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for one chunk (or the deadline) and append it to the buffer.
    async fn read(&mut self, within: Duration) -> Result<()> {
        let chunk = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ChannelError::Cancelled.into()),
            chunk = self.transport.receive(within) => chunk?,
        };
        if let Some(data) = chunk {
            trace!("{}: received {} bytes", self.device, data.len());
            self.buffer.extend(&data);
        }
        Ok(())
    }

    fn satisfied(&self, completion: &Completion, mark: Mark) -> bool {
        match completion {
            Completion::Always => true,
            Completion::AnyOutput => self.buffer.has_output_since(mark),
            Completion::Contains(needle) => self.buffer.contains_since(mark, needle),
        }
    }

    /// The output buffer.
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Get a mutable reference to the buffer.
    pub fn buffer_mut(&mut self) -> &mut OutputBuffer {
        &mut self.buffer
    }

    /// Close the underlying transport.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Script};

    fn session(script: Script) -> Session {
        Session::new(
            "sw1",
            Box::new(MockTransport::new(script)),
            CancellationToken::new(),
            false,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_waits_for_output() {
        let mut session = session(Script::new().greeting("sw1>").reply("Password: "));
        let start = session.buffer().mark();
        session.run(&ExpectStep::wait()).await.unwrap();
        session.run(&ExpectStep::send("enable")).await.unwrap();
        assert!(session.buffer().contains_since(start, "sw1>"));
        assert!(session.buffer().contains_since(start, "Password:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_times_out_at_deadline() {
        let mut session = session(Script::new().silence());
        let started = Instant::now();
        let step = ExpectStep::send("copy running-config tftp://10.0.0.5/sw1/running-config")
            .with_timeout(Duration::from_secs(7));

        let err = session.run(&step).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Channel(ChannelError::ProtocolTimeout { timeout, .. })
                if timeout == Duration::from_secs(7)
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_waits_past_unrelated_output() {
        let script = Script::new()
            .reply("Backup next startup-configuration file to 10.0.0.5, please wait...")
            .latency(Duration::from_secs(1));
        let mut session = session(script);
        let start = session.buffer().mark();
        let step = ExpectStep::send(
            "backup startup-configuration to 10.0.0.5 core-startup-config.cfg",
        )
        .until(Completion::Contains("finished!".into()))
        .with_timeout(Duration::from_secs(5));

        let err = session.run(&step).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::ProtocolTimeout { .. })));
        assert!(session.buffer().contains_since(start, "please wait"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_does_not_wait() {
        let mut session = session(Script::new().silence());
        let started = Instant::now();
        session
            .run(&ExpectStep::send("").until(Completion::Always))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_session_stops_at_step_boundary() {
        let cancel = CancellationToken::new();
        let mut session = Session::new(
            "sw1",
            Box::new(MockTransport::new(Script::new().reply("ok"))),
            cancel.clone(),
            false,
        );
        cancel.cancel();
        let err = session.run(&ExpectStep::send("enable")).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_stops_at_marker() {
        let script = Script::new()
            .reply("Accessing tftp://10.0.0.5/sw1/running-config...")
            .latency(Duration::from_secs(2));
        let mut session = session(script);
        let mark = session.buffer().mark();
        session.run(&ExpectStep::send("copy")).await.unwrap();

        let started = Instant::now();
        session
            .settle(mark, &["bytes copied", "Error"], None, Duration::from_secs(10))
            .await
            .unwrap();
        // Nothing more arrives; settle gives up quietly at its deadline.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_stops_at_prompt() {
        let script = Script::new()
            .echo()
            .reply("Mode: TFTP\r\n!!!!\r\nconsole#")
            .latency(Duration::from_secs(3));
        let mut session = session(script);
        let mark = session.buffer().mark();
        session
            .run(&ExpectStep::send("copy running-config tftp://10.0.0.5/sw1/running-config"))
            .await
            .unwrap();

        let prompt = Regex::new(r"(?:^|\n)[^\s>#]+[>#] ?$").unwrap();
        let started = Instant::now();
        session
            .settle(mark, &["Error"], Some(&prompt), Duration::from_secs(20))
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert!(session.buffer().contains_since(mark, "!!!!"));
    }
}
