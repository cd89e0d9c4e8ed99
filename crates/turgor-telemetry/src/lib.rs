//! # turgor-telemetry
//!
//! Event bus for simulation telemetry. The runner emits structured events
//! (step timing, volume controller state, aborted steps, energy) that are
//! consumed by pluggable sinks.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, SharedEvents, TracingSink, VecSink};
