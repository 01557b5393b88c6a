//! Cisco IOS platform definition.
//!
//! `copy <config> tftp://...` is interactive on IOS: it confirms the remote
//! host and the destination file name before sending.
//!
//! ```text
//! sw1#copy running-config tftp://10.0.0.5/sw1/running-config
//! Address or name of remote host [10.0.0.5]?
//! Destination filename [sw1/running-config]?
//! !!
//! 1000 bytes copied in 0.712 secs (1404 bytes/sec)
//! ```

use crate::platform::{ActionScript, Elevation, PlatformDefinition, StepTemplate};

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("cisco")
        .with_alias("cisco_ios")
        .with_alias("ios")
        .with_elevation(Elevation::Secret)
        .with_action("running-config", copy_to_tftp("running-config"))
        .with_action("startup-config", copy_to_tftp("startup-config"))
}

fn copy_to_tftp(config: &str) -> ActionScript {
    ActionScript::new(format!(
        "copy {config} tftp://{{transfer_ip}}/{{device}}/{config}"
    ))
    // remote host, destination filename
    .then(StepTemplate::enter())
    .then(StepTemplate::enter())
    .with_success_marker("bytes copied")
    .with_failure_marker("Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions() {
        let platform = platform();
        assert_eq!(platform.elevation, Elevation::Secret);
        let names: Vec<_> = platform.actions.keys().map(String::as_str).collect();
        assert_eq!(names, ["running-config", "startup-config"]);
    }

    #[test]
    fn test_startup_config_command() {
        let platform = platform();
        let script = platform.action("startup-config").unwrap();
        assert_eq!(
            script.command.input,
            "copy startup-config tftp://{transfer_ip}/{device}/startup-config"
        );
        assert_eq!(script.follow_ups.len(), 2);
    }
}
