//! Command templates.
//!
//! Vendor scripts are written with `{placeholder}` variables that are
//! filled in per device and per run:
//!
//! | placeholder           | value                                     |
//! |-----------------------|-------------------------------------------|
//! | `{device}`            | device name (its artifact directory)      |
//! | `{action}`            | action name                               |
//! | `{transfer_ip}`       | address of the file-receiving service     |
//! | `{transfer_user}`     | SCP username on the receiving host        |
//! | `{transfer_password}` | SCP password (only in hidden steps)       |
//! | `{artifact_root}`     | staging directory on the receiving host   |

/// Values substituted into command templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub device: &'a str,
    pub action: &'a str,
    pub transfer_ip: &'a str,
    pub transfer_user: &'a str,
    pub transfer_password: &'a str,
    pub artifact_root: &'a str,
}

impl TemplateVars<'_> {
    /// Fill every known placeholder in `template`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{device}", self.device)
            .replace("{action}", self.action)
            .replace("{transfer_ip}", self.transfer_ip)
            .replace("{transfer_user}", self.transfer_user)
            .replace("{transfer_password}", self.transfer_password)
            .replace("{artifact_root}", self.artifact_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars<'static> {
        TemplateVars {
            device: "core-sw1",
            action: "running-config",
            transfer_ip: "10.0.0.5",
            transfer_user: "backup",
            transfer_password: "pw",
            artifact_root: "/srv/configs/.netvault",
        }
    }

    #[test]
    fn test_render_tftp_url() {
        assert_eq!(
            vars().render("copy {action} tftp://{transfer_ip}/{device}/{action}"),
            "copy running-config tftp://10.0.0.5/core-sw1/running-config"
        );
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        assert_eq!(vars().render("show {nothing}"), "show {nothing}");
    }
}
