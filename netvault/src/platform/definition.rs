//! Platform definition for vendor-specific configurations.

use std::sync::LazyLock;
use std::time::Duration;

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::template::TemplateVars;
use crate::channel::{Completion, ExpectStep, Mark, OutputBuffer};
use crate::device::AccessMethod;
use crate::error::DriverError;

/// A bare prompt such as `sw1#` or `<h3c1>` alone on the last line.
static DEFAULT_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\n)[^\s>#]+[>#] ?$").unwrap());

/// How a platform enters privileged mode after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Elevation {
    /// The login shell is already privileged.
    #[default]
    None,

    /// Send the elevation command, then the device's enable secret.
    /// Skipped when the device has no secret configured.
    Secret,

    /// Send the elevation command, but never the secret. Skipped when the
    /// device has no secret configured.
    CommandOnly,
}

/// A step of an action script, before template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTemplate {
    /// Input template.
    pub input: String,

    /// Keep the rendered input out of logs.
    pub hidden: bool,

    /// Completion predicate.
    pub completion: Completion,

    /// Deadline override. `None` uses the run's step timeout.
    pub timeout: Option<Duration>,
}

impl StepTemplate {
    /// Send `input`, wait for any output.
    pub fn send(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            hidden: false,
            completion: Completion::AnyOutput,
            timeout: None,
        }
    }

    /// Press enter to accept a default or continue a pager.
    pub fn enter() -> Self {
        Self::send("")
    }

    /// Send input that must not be logged.
    pub fn hidden(input: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::send(input)
        }
    }

    /// Set the completion predicate.
    pub fn until(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Override the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render into an executable step.
    pub fn render(&self, vars: &TemplateVars<'_>, default_timeout: Duration) -> ExpectStep {
        let input = vars.render(&self.input);
        let step = if self.hidden {
            ExpectStep::send_hidden(input)
        } else {
            ExpectStep::send(input)
        };
        step.until(self.completion.clone())
            .with_timeout(self.timeout.unwrap_or(default_timeout))
    }
}

impl From<&str> for StepTemplate {
    fn from(input: &str) -> Self {
        Self::send(input)
    }
}

impl From<String> for StepTemplate {
    fn from(input: String) -> Self {
        Self::send(input)
    }
}

/// Move a received file into the device's directory after transfer.
///
/// For devices that cannot be given a destination directory: they push a
/// flat file into the receiver root, the engine moves it to
/// `<root>/<device>/<target>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// File name the device writes, relative to the receiver root.
    pub received: String,

    /// File name inside the device directory.
    pub target: String,
}

/// The script for one action on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionScript {
    /// The transfer command.
    pub command: StepTemplate,

    /// Drain steps run after the command, in order.
    pub follow_ups: Vec<StepTemplate>,

    /// Output substring that confirms the transfer.
    pub success_marker: Option<String>,

    /// Output substring that reports an error. Takes precedence over the
    /// success marker when both appear.
    pub failure_marker: Option<String>,

    /// Post-transfer relocation, if the platform needs one.
    pub relocation: Option<Relocation>,
}

impl ActionScript {
    /// Script starting with `command`. A plain string waits for any output.
    pub fn new(command: impl Into<StepTemplate>) -> Self {
        Self {
            command: command.into(),
            follow_ups: Vec::new(),
            success_marker: None,
            failure_marker: None,
            relocation: None,
        }
    }

    /// Add a drain step.
    pub fn then(mut self, step: StepTemplate) -> Self {
        self.follow_ups.push(step);
        self
    }

    pub fn with_success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_marker = Some(marker.into());
        self
    }

    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.failure_marker = Some(marker.into());
        self
    }

    pub fn with_relocation(
        mut self,
        received: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.relocation = Some(Relocation {
            received: received.into(),
            target: target.into(),
        });
        self
    }

    /// Render the command and drain steps.
    pub fn steps(&self, vars: &TemplateVars<'_>, default_timeout: Duration) -> Vec<ExpectStep> {
        std::iter::once(&self.command)
            .chain(&self.follow_ups)
            .map(|step| step.render(vars, default_timeout))
            .collect()
    }

    /// Markers worth waiting for once the script has run. Empty for a
    /// script without markers: nothing more is expected from the device.
    pub fn settle_markers(&self) -> Vec<&str> {
        self.success_marker
            .as_deref()
            .into_iter()
            .chain(self.failure_marker.as_deref())
            .collect()
    }

    /// A failure-only script has no line that confirms the transfer, so
    /// settling also ends when the CLI prompt comes back.
    pub fn settles_at_prompt(&self) -> bool {
        self.success_marker.is_none() && self.failure_marker.is_some()
    }

    /// Classify the action's output.
    ///
    /// The failure marker wins over the success marker; a defined success
    /// marker must be present; an action without markers always succeeds.
    /// Matching is plain substring search, so a device that echoes a marker
    /// (e.g. inside a file path) is misclassified.
    pub fn classify(&self, output: &OutputBuffer, mark: Mark) -> Result<(), DriverError> {
        if let Some(failure) = &self.failure_marker {
            if output.contains_since(mark, failure) {
                return Err(DriverError::TransferFailed {
                    reason: format!("device reported '{failure}'"),
                });
            }
        }
        if let Some(success) = &self.success_marker {
            if !output.contains_since(mark, success) {
                return Err(DriverError::TransferFailed {
                    reason: format!("'{success}' not seen"),
                });
            }
        }
        Ok(())
    }
}

/// Platform definition containing all vendor-specific configuration.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Canonical manufacturer tag (e.g. "cisco", "h3c").
    pub name: String,

    /// Other tags that resolve to this platform.
    pub aliases: Vec<String>,

    /// Access methods the platform's scripts work over.
    pub access_methods: Vec<AccessMethod>,

    /// Privilege elevation after login.
    pub elevation: Elevation,

    /// Command that enters privileged mode.
    pub elevate_command: String,

    /// Matches output that ends at the CLI prompt.
    pub prompt: Regex,

    /// Supported actions, by name.
    pub actions: IndexMap<String, ActionScript>,
}

impl PlatformDefinition {
    /// Create a new SSH platform with no actions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            access_methods: vec![AccessMethod::Ssh],
            elevation: Elevation::None,
            elevate_command: "enable".to_string(),
            prompt: DEFAULT_PROMPT.clone(),
            actions: IndexMap::new(),
        }
    }

    /// Add another tag for this platform.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Replace the supported access methods.
    pub fn with_access(mut self, methods: impl IntoIterator<Item = AccessMethod>) -> Self {
        self.access_methods = methods.into_iter().collect();
        self
    }

    /// Set the elevation mode.
    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    /// Replace the prompt pattern.
    pub fn with_prompt(mut self, prompt: Regex) -> Self {
        self.prompt = prompt;
        self
    }

    /// Add an action script.
    pub fn with_action(mut self, name: impl Into<String>, script: ActionScript) -> Self {
        self.actions.insert(name.into(), script);
        self
    }

    /// Whether scripts can run over `method`.
    pub fn supports(&self, method: &AccessMethod) -> bool {
        self.access_methods.contains(method)
    }

    /// Get an action script by name.
    pub fn action(&self, name: &str) -> Option<&ActionScript> {
        self.actions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> OutputBuffer {
        let mut buffer = OutputBuffer::new();
        buffer.extend(text.as_bytes());
        buffer
    }

    fn script() -> ActionScript {
        ActionScript::new("copy")
            .with_success_marker("bytes copied")
            .with_failure_marker("Error")
    }

    #[test]
    fn test_classify_success() {
        let out = buffer("!!\r\n1000 bytes copied in 0.2 secs");
        assert!(script().classify(&out, Mark::default()).is_ok());
    }

    #[test]
    fn test_classify_failure_marker() {
        let out = buffer("%Error opening tftp://10.0.0.5/sw2/running-config (Timed out)");
        assert!(matches!(
            script().classify(&out, Mark::default()),
            Err(DriverError::TransferFailed { .. })
        ));
    }

    #[test]
    fn test_failure_marker_wins_over_success_marker() {
        let out = buffer("1000 bytes copied\r\nError: verify failed");
        assert!(script().classify(&out, Mark::default()).is_err());
    }

    #[test]
    fn test_missing_success_marker_fails() {
        let out = buffer("Accessing tftp://10.0.0.5/sw1/running-config...");
        assert!(script().classify(&out, Mark::default()).is_err());
    }

    #[test]
    fn test_failure_only_script() {
        let script = ActionScript::new("copy").with_failure_marker("Error");
        assert!(script.classify(&buffer("done"), Mark::default()).is_ok());
        assert!(script.classify(&buffer("Error"), Mark::default()).is_err());
    }

    #[test]
    fn test_no_markers_always_succeeds() {
        let script = ActionScript::new("execute dhcp lease-clear all");
        assert!(script.classify(&buffer("Error"), Mark::default()).is_ok());
        assert!(script.settle_markers().is_empty());
    }

    #[test]
    fn test_settle_markers() {
        assert_eq!(script().settle_markers(), ["bytes copied", "Error"]);
        assert!(!script().settles_at_prompt());

        let failure_only = ActionScript::new("copy").with_failure_marker("Error");
        assert_eq!(failure_only.settle_markers(), ["Error"]);
        assert!(failure_only.settles_at_prompt());
    }

    #[test]
    fn test_default_prompt() {
        let prompt = PlatformDefinition::new("dell").prompt;
        assert!(prompt.is_match(b"%Error: TFTP transfer failed\r\nconsole#"));
        assert!(prompt.is_match(b"<h3c1>"));
        assert!(prompt.is_match(b"\r\nsw1# "));
        assert!(!prompt.is_match(b"copy running-config tftp://10.0.0.5/sw1/running-config\r\n"));
        assert!(
            !prompt.is_match(b"console#copy running-config tftp://10.0.0.5/sw1/running-config")
        );
    }

    #[test]
    fn test_steps_render_in_order() {
        let vars = TemplateVars {
            device: "sw1",
            action: "running-config",
            transfer_ip: "10.0.0.5",
            transfer_user: "",
            transfer_password: "pw",
            artifact_root: "/srv",
        };
        let script = ActionScript::new("copy {action} tftp://{transfer_ip}/{device}/{action}")
            .then(StepTemplate::enter())
            .then(StepTemplate::hidden("{transfer_password}").with_timeout(Duration::from_secs(5)));

        let steps = script.steps(&vars, Duration::from_secs(30));

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0].input.as_deref(),
            Some("copy running-config tftp://10.0.0.5/sw1/running-config")
        );
        assert_eq!(steps[0].timeout, Duration::from_secs(30));
        assert_eq!(steps[1].input.as_deref(), Some(""));
        assert!(steps[2].hidden);
        assert_eq!(steps[2].input.as_deref(), Some("pw"));
        assert_eq!(steps[2].timeout, Duration::from_secs(5));
    }
}
