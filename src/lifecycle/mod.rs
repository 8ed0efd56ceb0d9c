//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build breakers, caches, clients → Start sweepers → Bind
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Server drains, sweepers exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then components, then listener
//! - One broadcast channel reaches every background task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
pub use startup::{Components, ResilienceStatus, StartupError};
