//! Generic driver: runs any platform's scripts over an expect session.

use std::sync::Arc;

use log::{debug, info, warn};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::context::RunContext;
use super::outcome::Outcome;
use crate::channel::{ExpectStep, Session};
use crate::device::{Action, Device};
use crate::error::{DriverError, Result};
use crate::platform::{Elevation, PlatformDefinition, TemplateVars};
use crate::transport::Connector;

/// Generic driver that works with any platform definition.
///
/// One driver serves one device for the length of one task:
/// - [`open`](Self::open) connects, waits for the greeting and elevates
/// - [`execute`](Self::execute) runs one action and classifies its output
/// - [`close`](Self::close) ends the session
pub struct GenericDriver {
    /// The device being driven.
    device: Arc<Device>,

    /// Platform definition.
    platform: Arc<PlatformDefinition>,

    /// Run-wide context.
    ctx: Arc<RunContext>,

    /// Open session (None when disconnected).
    session: Option<Session>,
}

impl GenericDriver {
    /// Create a new generic driver.
    pub fn new(
        device: Arc<Device>,
        platform: Arc<PlatformDefinition>,
        ctx: Arc<RunContext>,
    ) -> Self {
        Self {
            device,
            platform,
            ctx,
            session: None,
        }
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Check if a session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Connect, wait for the greeting and enter privileged mode.
    ///
    /// `cancel` stops the session at its next step boundary or wait.
    pub async fn open(
        &mut self,
        connector: &dyn Connector,
        cancel: CancellationToken,
    ) -> Result<()> {
        if self.session.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }
        if !self.platform.supports(&self.device.access) {
            return Err(DriverError::UnsupportedAccessMethod {
                platform: self.platform.name.clone(),
                method: self.device.access.to_string(),
            }
            .into());
        }

        debug!(
            "{}: connecting to {}:{} over {}",
            self.device.name, self.device.address, self.device.port, self.device.access
        );
        let transport = connector.open(&self.device).await?;
        let mut session = Session::new(&self.device.name, transport, cancel, self.ctx.verbose);

        let step = self.ctx.timeouts.step;
        session.run(&ExpectStep::wait().with_timeout(step)).await?;

        match self.platform.elevation {
            Elevation::None => {}
            Elevation::CommandOnly if self.device.credentials.enable.is_some() => {
                session
                    .run(&ExpectStep::send(&self.platform.elevate_command).with_timeout(step))
                    .await?;
            }
            Elevation::CommandOnly => {
                debug!("{}: no enable secret, staying unprivileged", self.device.name);
            }
            Elevation::Secret => match &self.device.credentials.enable {
                Some(secret) => {
                    session
                        .run(&ExpectStep::send(&self.platform.elevate_command).with_timeout(step))
                        .await?;
                    session
                        .run(&ExpectStep::send_hidden(secret.expose_secret()).with_timeout(step))
                        .await?;
                }
                None => debug!("{}: no enable secret, staying unprivileged", self.device.name),
            },
        }

        self.session = Some(session);
        Ok(())
    }

    /// Run one action: send its transfer command and drain steps, wait for
    /// a completion marker, classify the output, relocate the artifact.
    pub async fn run_action(&mut self, action: &Action) -> Result<()> {
        let session = self.session.as_mut().ok_or(DriverError::NotConnected)?;
        let script = self
            .platform
            .action(action.name())
            .ok_or_else(|| DriverError::UnsupportedAction {
                platform: self.platform.name.clone(),
                action: action.name().to_string(),
            })?;

        let artifact_root = self.ctx.artifacts.staging().display().to_string();
        let vars = TemplateVars {
            device: &self.device.name,
            action: action.name(),
            transfer_ip: &self.ctx.transfer.ip,
            transfer_user: &self.ctx.transfer.username,
            transfer_password: self.ctx.transfer.password.expose_secret(),
            artifact_root: &artifact_root,
        };

        session.buffer_mut().clear();
        let mark = session.buffer().mark();

        session
            .run_all(&script.steps(&vars, self.ctx.timeouts.step))
            .await?;

        let markers = script.settle_markers();
        if !markers.is_empty() {
            let prompt = script.settles_at_prompt().then_some(&self.platform.prompt);
            session
                .settle(mark, &markers, prompt, self.ctx.timeouts.transfer)
                .await?;
        }

        script.classify(session.buffer(), mark)?;

        if let Some(relocation) = &script.relocation {
            self.ctx
                .artifacts
                .relocate(
                    &self.device.name,
                    &vars.render(&relocation.received),
                    &vars.render(&relocation.target),
                )
                .await?;
        }
        Ok(())
    }

    /// Run one action and turn the result into an [`Outcome`].
    pub async fn execute(&mut self, action: &Action) -> Outcome {
        match self.run_action(action).await {
            Ok(()) => {
                info!("{}: {} succeeded", self.device.name, action);
                Outcome::success(&self.device.name, action.name())
            }
            Err(e) => {
                warn!("{}: {} failed: {}", self.device.name, action, e);
                Outcome::failure(&self.device.name, action.name(), e)
            }
        }
    }

    /// Close the session, if open.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session.close().await?;
            debug!("{}: session closed", self.device.name);
        }
        Ok(())
    }
}
