//! Expect steps: one send / wait-for-output unit of a session script.
//!
//! Device commands that start a transfer usually ask follow-up questions:
//! - `copy running-config tftp:` asks for the remote host, then the file name
//! - `backup startup-configuration` prints progress dots, then `finished!`
//! - `copy ... scp://` asks for the SCP password
//!
//! A script answers these with a sequence of steps, each waiting for output
//! (or a specific substring) before the next one is sent.

use std::fmt;
use std::time::Duration;

/// Default wait for a step's output.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// When a step counts as complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Any output at all after the input was sent.
    AnyOutput,

    /// Output after the input contains this substring.
    Contains(String),

    /// Complete as soon as the input is sent (fire-and-forget).
    Always,
}

/// One unit of an expect script.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use netvault::channel::{Completion, ExpectStep};
///
/// let steps = vec![
///     ExpectStep::send("copy running-config tftp://10.0.0.5/sw1/running-config"),
///     ExpectStep::send("").with_timeout(Duration::from_secs(5)),
///     ExpectStep::send("").until(Completion::Contains("bytes copied".into())),
/// ];
/// assert_eq!(steps.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectStep {
    /// Text to send, without the line terminator. `None` only waits.
    pub input: Option<String>,

    /// Whether the input must be kept out of logs (passwords).
    pub hidden: bool,

    /// How long to wait for the completion predicate.
    pub timeout: Duration,

    /// Completion predicate.
    pub completion: Completion,
}

impl ExpectStep {
    /// Send a line, then wait for any output.
    pub fn send(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            hidden: false,
            timeout: DEFAULT_STEP_TIMEOUT,
            completion: Completion::AnyOutput,
        }
    }

    /// Send a line that must not appear in logs, then wait for any output.
    pub fn send_hidden(input: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::send(input)
        }
    }

    /// Send nothing, just wait for output (e.g. the login banner).
    pub fn wait() -> Self {
        Self {
            input: None,
            hidden: false,
            timeout: DEFAULT_STEP_TIMEOUT,
            completion: Completion::AnyOutput,
        }
    }

    /// Set the completion predicate.
    pub fn until(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Set the step deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The input as it may appear in logs.
    pub fn display_input(&self) -> &str {
        match (&self.input, self.hidden) {
            (None, _) => "",
            (Some(_), true) => "********",
            (Some(input), false) => input,
        }
    }
}

impl fmt::Display for ExpectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            None => f.write_str("<wait>"),
            Some(input) if input.is_empty() => f.write_str("<enter>"),
            Some(_) => f.write_str(self.display_input()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_defaults() {
        let step = ExpectStep::send("enable");
        assert_eq!(step.input.as_deref(), Some("enable"));
        assert!(!step.hidden);
        assert_eq!(step.timeout, DEFAULT_STEP_TIMEOUT);
        assert_eq!(step.completion, Completion::AnyOutput);
    }

    #[test]
    fn test_hidden_input_is_masked() {
        let step = ExpectStep::send_hidden("s3cret");
        assert_eq!(step.display_input(), "********");
        assert_eq!(step.to_string(), "********");
        assert_eq!(step.input.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ExpectStep::wait().to_string(), "<wait>");
        assert_eq!(ExpectStep::send("").to_string(), "<enter>");
        assert_eq!(ExpectStep::send("exit").to_string(), "exit");
    }

    #[test]
    fn test_builder_chain() {
        let step = ExpectStep::send("")
            .until(Completion::Contains("finished!".into()))
            .with_timeout(Duration::from_secs(90));
        assert_eq!(step.completion, Completion::Contains("finished!".into()));
        assert_eq!(step.timeout, Duration::from_secs(90));
    }
}
