//! Fortinet FortiOS platform definition.
//!
//! The admin shell is privileged from login. Besides the configuration
//! backup, FortiGates support clearing the DHCP lease table, which is sent
//! without waiting for an answer.

use crate::channel::Completion;
use crate::platform::{ActionScript, PlatformDefinition, StepTemplate};

/// Create the FortiOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("fortinet")
        .with_alias("fortigate")
        .with_alias("fortios")
        .with_action(
            "current-config",
            ActionScript::new("exec backup config tftp {device}/current-config {transfer_ip}")
                .then(StepTemplate::enter())
                .with_success_marker("Send config file to tftp server OK")
                .with_failure_marker("Error"),
        )
        .with_action(
            "clear-dhcp-leases",
            ActionScript::new(
                StepTemplate::send("execute dhcp lease-clear all").until(Completion::Always),
            ),
        )
}
