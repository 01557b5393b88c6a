//! Platform definitions for multi-vendor support.
//!
//! A platform describes how one device family is driven: which access
//! methods its scripts work over, how it enters privileged mode, and one
//! [`ActionScript`] per supported action (transfer command, drain steps,
//! completion markers). All families share one engine,
//! [`GenericDriver`](crate::driver::GenericDriver).

mod definition;
mod registry;
mod template;
pub mod vendors;

pub use definition::{ActionScript, Elevation, PlatformDefinition, Relocation, StepTemplate};
pub use registry::PlatformRegistry;
pub use template::TemplateVars;
