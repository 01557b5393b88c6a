//! # Netvault
//!
//! Concurrent configuration archiver for multi-vendor network fleets.
//!
//! Netvault logs into each device over SSH or telnet, drives its CLI with
//! vendor-specific expect scripts that make the device push its
//! configuration to a file-receiving service (TFTP or SCP), and records one
//! [`Outcome`] per requested action.
//!
//! ## Features
//!
//! - Bounded worker pool with backpressure, per-task deadlines, panic
//!   isolation and graceful stop/abort
//! - Async SSH via russh and a minimal telnet NVT client
//! - Deadline-bounded expect steps with cancellation
//! - Built-in Cisco, Arista, Dell, Fortinet, H3C and Solace platforms,
//!   extensible through [`PlatformRegistry::register`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netvault::{Collector, Config, NetworkConnector, PlatformRegistry, Scheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netvault::Error> {
//!     let config = Config::load("netvault.yaml", None)?;
//!     let connector = Arc::new(NetworkConnector::new(config.connect_settings()));
//!     let scheduler_config = config.scheduler_config();
//!     let (ctx, devices) = config.into_run(false);
//!     let collector = Arc::new(Collector::new());
//!
//!     let mut scheduler = Scheduler::start(
//!         scheduler_config,
//!         ctx,
//!         Arc::new(PlatformRegistry::builtin()),
//!         connector,
//!         collector.clone(),
//!     );
//!     scheduler.run_all(devices).await;
//!
//!     for outcome in collector.failures() {
//!         println!("{outcome}: {}", outcome.diagnostic().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod channel;
pub mod collector;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod platform;
pub mod report;
pub mod scheduler;
pub mod secret;
pub mod transport;

// Re-export main types for convenience
pub use artifacts::ArtifactStore;
pub use collector::Collector;
pub use config::Config;
pub use device::{AccessMethod, Action, Device};
pub use driver::{GenericDriver, Outcome, RunContext, Status, Timeouts, TransferTarget};
pub use error::Error;
pub use platform::{PlatformDefinition, PlatformRegistry};
pub use report::Report;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
pub use secret::SecretCipher;
pub use transport::{Connector, NetworkConnector, Transport};
