//! Event bus with pluggable sinks.
//!
//! Events are queued on a `std::sync::mpsc` channel by [`EventBus::emit`]
//! and delivered to sinks on [`EventBus::flush`], so the producer never
//! waits on a sink. The runner flushes once per step.

use std::sync::mpsc;

use crate::events::{EventKind, SimulationEvent};
use crate::sinks::EventSink;

/// Queues simulation events and fans them out to sinks.
pub struct EventBus {
    sender: mpsc::Sender<SimulationEvent>,
    receiver: mpsc::Receiver<SimulationEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// A disabled bus drops events on `emit`.
    enabled: bool,
    emitted: u64,
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
            emitted: 0,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues an event. No-op while disabled.
    pub fn emit(&mut self, event: SimulationEvent) {
        if !self.enabled {
            return;
        }
        // The receiver lives as long as `self`, so send cannot fail.
        if self.sender.send(event).is_ok() {
            self.emitted += 1;
        }
    }

    /// Shorthand for `emit(SimulationEvent::new(step, kind))`.
    pub fn emit_kind(&mut self, step: u64, kind: EventKind) {
        self.emit(SimulationEvent::new(step, kind));
    }

    /// Delivers all queued events to every sink. Returns the number of
    /// events delivered.
    pub fn flush(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.receiver.try_recv() {
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
            delivered += 1;
        }
        delivered
    }

    /// Flushes, then lets every sink finalize.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    /// Total events accepted since creation.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Names of the registered sinks.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sink_names())
            .field("enabled", &self.enabled)
            .field("emitted", &self.emitted)
            .finish()
    }
}
