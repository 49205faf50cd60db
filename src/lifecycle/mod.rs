//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs + startup.rs):
//!     Validate config → Resolve identity → Connect registry
//!     → Publish local services → Subscribe references → Start network server
//!
//! Shutdown (controller.rs + shutdown.rs):
//!     Drain registration cache (optionally unregister) → Stop network server
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls NodeController::stop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: registry before publish, publish before listener
//! - Fail fast: any startup error is fatal and leaves the node `Failed`
//! - Steps run sequentially on the caller's task; no retries at this layer

pub mod controller;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use controller::{BootError, NodeController};
pub use shutdown::{Shutdown, StopReport};
pub use state::LifecycleState;
