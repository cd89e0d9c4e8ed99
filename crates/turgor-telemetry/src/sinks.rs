//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them (collect in memory,
//! log through `tracing`, ...).

use std::sync::{Arc, Mutex};

use tracing::Level;

use crate::events::{EventKind, SimulationEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called when the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Events collected by a [`VecSink`], readable after the sink has been
/// handed to a bus.
pub type SharedEvents = Arc<Mutex<Vec<SimulationEvent>>>;

/// Collects events in memory for testing and inspection.
#[derive(Debug, Default)]
pub struct VecSink {
    events: SharedEvents,
    finalized: Arc<Mutex<bool>>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the collected events.
    pub fn events(&self) -> SharedEvents {
        Arc::clone(&self.events)
    }

    /// Handle to the finalized flag.
    pub fn finalized(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.finalized)
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn finalize(&mut self) {
        if let Ok(mut done) = self.finalized.lock() {
            *done = true;
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Logs events through `tracing`.
///
/// Aborted steps are always logged at `WARN`; everything else at the
/// sink's level.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    /// Creates a new tracing sink at the given log level.
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let EventKind::StepAborted { kernel, reason } = &event.kind {
            tracing::warn!(step = event.step, kernel = %kernel, reason = %reason, "step aborted");
            return;
        }
        let (step, kind) = (event.step, &event.kind);
        if self.level == Level::ERROR {
            tracing::error!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::WARN {
            tracing::warn!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::INFO {
            tracing::info!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::DEBUG {
            tracing::debug!(step, event = ?kind, "simulation_event");
        } else {
            tracing::trace!(step, event = ?kind, "simulation_event");
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
