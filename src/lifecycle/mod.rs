//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every ShutdownSignal resolves
//!             → health check loops exit
//!             → HTTP servers stop accepting and drain
//! ```
//!
//! # Design Decisions
//! - One coordinator per owner; checkers own theirs so they can stop alone
//! - Signals are level-triggered: subscribing late still observes a trigger

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
