//! Device drivers.
//!
//! A single engine, [`GenericDriver`], drives every device family from its
//! [`PlatformDefinition`](crate::platform::PlatformDefinition). Each action
//! produces exactly one [`Outcome`].

mod context;
mod generic;
mod outcome;

pub use context::{RunContext, Timeouts, TransferTarget};
pub use generic::GenericDriver;
pub use outcome::{Outcome, Status};
