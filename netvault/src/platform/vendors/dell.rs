//! Dell PowerConnect platform definition.
//!
//! PowerConnect firmware does not print a reliable completion line, so only
//! an error report fails the action.

use crate::platform::{ActionScript, Elevation, PlatformDefinition};

/// Create the Dell PowerConnect platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("dell")
        .with_alias("dell_powerconnect")
        .with_alias("powerconnect")
        .with_elevation(Elevation::Secret)
        .with_action("running-config", copy_to_tftp("running-config"))
        .with_action("startup-config", copy_to_tftp("startup-config"))
}

fn copy_to_tftp(config: &str) -> ActionScript {
    ActionScript::new(format!(
        "copy {config} tftp://{{transfer_ip}}/{{device}}/{config}"
    ))
    .with_failure_marker("Error")
}
