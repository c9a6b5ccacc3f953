//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build assessment client + admission layers → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Latch flag → Stop accepting → Drain requests (bounded) → Stop limiter → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{triggered, Shutdown};
pub use startup::{build_server, StartupError};
