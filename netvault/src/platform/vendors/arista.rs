//! Arista EOS platform definition.
//!
//! EOS copies to TFTP without prompting and reports the result on one line:
//!
//! ```text
//! switch#copy running-config tftp://10.0.0.5/switch/running-config
//! Copy completed successfully.
//! ```

use crate::platform::{ActionScript, Elevation, PlatformDefinition};

/// Create the Arista EOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("arista")
        .with_alias("arista_eos")
        .with_alias("eos")
        .with_elevation(Elevation::Secret)
        .with_action("running-config", copy_to_tftp("running-config"))
        .with_action("startup-config", copy_to_tftp("startup-config"))
}

fn copy_to_tftp(config: &str) -> ActionScript {
    ActionScript::new(format!(
        "copy {config} tftp://{{transfer_ip}}/{{device}}/{config}"
    ))
    .with_success_marker("Copy completed successfully")
    .with_failure_marker("Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform() {
        let platform = platform();
        assert!(platform.aliases.contains(&"arista_eos".to_string()));
        let script = platform.action("running-config").unwrap();
        assert!(script.follow_ups.is_empty());
        assert_eq!(
            script.success_marker.as_deref(),
            Some("Copy completed successfully")
        );
    }
}
