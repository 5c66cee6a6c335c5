//! Discrete-event scheduling
//!
//! Everything that happens in the theater is an event posted in time order:
//! disruption and retreat from combat, march arrivals, recovery.

pub mod event;
pub mod log;
pub mod queue;

pub use event::{Event, EventKind, Subject};
pub use log::EventLog;
pub use queue::EventQueue;
