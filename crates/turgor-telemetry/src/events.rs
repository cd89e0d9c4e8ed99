//! Simulation event types.
//!
//! Structured events emitted by the runner around each step. Events are
//! lightweight value types that carry just enough data to be useful for
//! monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the engine.
///
/// Events are tagged with a step index and carry domain-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Step number (0-indexed).
    pub step: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Step started.
    StepBegin {
        /// Simulation time at the start of the step (seconds).
        sim_time: f64,
    },

    /// Step completed.
    StepEnd {
        /// Wall-clock time for the whole step (seconds).
        wall_time: f64,
    },

    /// Volume controller state for a volume-preserving body.
    Volume {
        /// Volume measured at the start of the step.
        current: f32,
        /// Rest volume times inflation.
        target: f32,
        /// Pressure applied during the step.
        pressure: f32,
    },

    /// A dispatch failed and the step was discarded.
    StepAborted {
        /// Entry point or stage that failed.
        kernel: String,
        /// Decoded failure.
        reason: String,
    },

    /// Energy snapshot at current state.
    Energy {
        /// Kinetic energy (0.5 * m * v^2).
        kinetic: f64,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    /// Creates a new event for the given step.
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }

    /// Returns true for [`EventKind::StepAborted`].
    pub fn is_abort(&self) -> bool {
        matches!(self.kind, EventKind::StepAborted { .. })
    }
}
