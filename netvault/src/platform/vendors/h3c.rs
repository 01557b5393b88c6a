//! H3C Comware platform definition.
//!
//! Comware is reached over telnet. Its `backup startup-configuration`
//! command takes a file name but no directory, so the file lands in the
//! receiver root and is moved into the device directory afterwards.
//!
//! ```text
//! <h3c>backup startup-configuration to 10.0.0.5 h3c-startup-config.cfg
//! Backup next startup-configuration file to 10.0.0.5. Please wait...finished!
//! ```

use crate::device::AccessMethod;
use crate::platform::{ActionScript, PlatformDefinition};

/// Create the H3C Comware platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("h3c")
        .with_alias("comware")
        .with_alias("hp_comware")
        .with_access([AccessMethod::Telnet])
        .with_action(
            "startup-config",
            ActionScript::new(
                "backup startup-configuration to {transfer_ip} {device}-startup-config.cfg",
            )
            .with_success_marker("finished!")
            .with_failure_marker("Error")
            .with_relocation("{device}-startup-config.cfg", "startup-config"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telnet_only() {
        let platform = platform();
        assert!(platform.supports(&AccessMethod::Telnet));
        assert!(!platform.supports(&AccessMethod::Ssh));
    }

    #[test]
    fn test_relocation() {
        let platform = platform();
        let relocation = platform.action("startup-config").unwrap().relocation.as_ref().unwrap();
        assert_eq!(relocation.received, "{device}-startup-config.cfg");
        assert_eq!(relocation.target, "startup-config");
    }
}
