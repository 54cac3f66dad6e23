//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → main triggers Shutdown
//!
//! Shutdown (shutdown.rs):
//!     trigger → admin server stops → config watcher stops
//!             → delayed retry timers cancelled → queue drains in-flight jobs
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting jobs, cancel timers, drain workers
//! - Late subscribers still observe a shutdown that already happened

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
