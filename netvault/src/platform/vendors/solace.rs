//! Solace PubSub+ platform definition.
//!
//! Solace routers push their configuration over SCP and ask for the SCP
//! password interactively. The destination path points straight into the
//! device's staging directory.

use crate::channel::Completion;
use crate::platform::{ActionScript, Elevation, PlatformDefinition, StepTemplate};

/// Create the Solace platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("solace")
        .with_elevation(Elevation::CommandOnly)
        .with_action(
            "current-config",
            ActionScript::new(
                "copy current-config scp://{transfer_user}@{transfer_ip}{artifact_root}/{device}/current-config",
            )
            .then(StepTemplate::hidden("{transfer_password}"))
            .then(StepTemplate::send("exit\nexit").until(Completion::Always))
            .with_failure_marker("ERROR"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scp_password_is_hidden() {
        let platform = platform();
        let script = platform.action("current-config").unwrap();
        assert!(script.follow_ups[0].hidden);
        assert_eq!(script.follow_ups[1].completion, Completion::Always);
    }
}
