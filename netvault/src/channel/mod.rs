//! Channel layer: the expect-style session protocol.
//!
//! This module turns a raw [`Transport`](crate::transport::Transport) into a
//! turn-taking session: send a line, wait (with a deadline) for output that
//! satisfies a completion predicate, accumulate everything for later
//! classification.

mod buffer;
mod session;
mod step;

pub use buffer::{Mark, OutputBuffer};
pub use session::Session;
pub use step::{Completion, DEFAULT_STEP_TIMEOUT, ExpectStep};
