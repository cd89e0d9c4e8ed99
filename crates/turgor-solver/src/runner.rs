//! Runner: drives a body for a fixed number of steps and collects metrics.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use turgor_telemetry::{EventBus, EventKind, EventSink};
use turgor_types::{TurgorError, TurgorResult};

use crate::body::SimulationBody;
use crate::config::SimulationConfig;

/// Metrics collected from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Steps requested.
    pub steps: u32,
    /// Steps that ran to completion.
    pub completed: u32,
    /// Steps discarded after a failed dispatch.
    pub aborted: u32,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Average wall-clock time per completed step (seconds).
    pub avg_step_time: f64,
    pub min_step_time: f64,
    pub max_step_time: f64,
    pub final_kinetic_energy: f64,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    pub rest_volume: Option<f32>,
    /// Volume measured after the last step.
    pub final_volume: Option<f32>,
}

impl RunMetrics {
    /// `(final − rest) / rest`, when both are known and rest is non-zero.
    pub fn volume_drift(&self) -> Option<f32> {
        match (self.rest_volume, self.final_volume) {
            (Some(rest), Some(last)) if rest != 0.0 => Some((last - rest) / rest),
            _ => None,
        }
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "steps: {} completed, {} aborted of {}\n\
             mesh: {} vertices, {} springs, {} faces\n\
             time: {:.3}s total, {:.4}ms/step (min {:.4}, max {:.4})\n\
             kinetic energy: {:.6e}",
            self.completed,
            self.aborted,
            self.steps,
            self.vertex_count,
            self.edge_count,
            self.face_count,
            self.total_wall_time,
            self.avg_step_time * 1000.0,
            self.min_step_time * 1000.0,
            self.max_step_time * 1000.0,
            self.final_kinetic_energy,
        );
        if let (Some(rest), Some(last)) = (self.rest_volume, self.final_volume) {
            out.push_str(&format!("\nvolume: rest {rest:.6}, final {last:.6}"));
            if let Some(drift) = self.volume_drift() {
                out.push_str(&format!(" ({:+.3}%)", drift * 100.0));
            }
        }
        out
    }
}

/// Steps a body `steps` times at a fixed `dt`.
///
/// A step that fails with a dispatch error is logged, reported on the bus
/// and counted; the run continues. Fatal backend errors end the run.
#[derive(Debug)]
pub struct Runner {
    pub steps: u32,
    pub dt: f32,
    bus: EventBus,
}

impl Runner {
    pub fn new(steps: u32, dt: f32) -> Self {
        Self {
            steps,
            dt,
            bus: EventBus::new(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.steps, config.dt)
    }

    /// Registers a telemetry sink.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.bus.add_sink(sink);
        self
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn run(&mut self, body: &mut SimulationBody<'_>) -> TurgorResult<RunMetrics> {
        let mut step_times: Vec<f64> = Vec::with_capacity(self.steps as usize);
        let mut aborted = 0u32;
        let first = body.steps_taken();
        let total_start = Instant::now();

        for i in 0..self.steps as u64 {
            let step = first + i;
            self.bus.emit_kind(
                step,
                EventKind::StepBegin {
                    sim_time: step as f64 * self.dt as f64,
                },
            );
            let start = Instant::now();
            match body.step(self.dt) {
                Ok(report) => {
                    let wall_time = start.elapsed().as_secs_f64();
                    step_times.push(wall_time);
                    if let (Some(current), Some(pressure), Some(target)) =
                        (report.volume, report.pressure, body.target_volume())
                    {
                        self.bus.emit_kind(
                            step,
                            EventKind::Volume {
                                current,
                                target,
                                pressure,
                            },
                        );
                    }
                    self.bus.emit_kind(step, EventKind::StepEnd { wall_time });
                }
                Err(e) if e.is_fatal() => {
                    self.bus.finish();
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(step, error = %e, "step aborted");
                    let kernel = match &e {
                        TurgorError::Dispatch { kernel, .. } => kernel.clone(),
                        _ => "host".to_string(),
                    };
                    self.bus.emit_kind(
                        step,
                        EventKind::StepAborted {
                            kernel,
                            reason: e.to_string(),
                        },
                    );
                    aborted += 1;
                }
            }
            self.bus.flush();
        }

        let total_wall_time = total_start.elapsed().as_secs_f64();
        let final_kinetic_energy = body.kinetic_energy()? as f64;
        let final_volume = body.measure_volume().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "final volume measurement failed");
            None
        });
        self.bus.emit_kind(
            body.steps_taken(),
            EventKind::Energy {
                kinetic: final_kinetic_energy,
            },
        );
        self.bus.finish();

        let avg_step_time = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().sum::<f64>() / step_times.len() as f64
        };
        let min_step_time = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().copied().fold(f64::MAX, f64::min)
        };
        let max_step_time = step_times.iter().copied().fold(0.0, f64::max);

        let metrics = RunMetrics {
            steps: self.steps,
            completed: step_times.len() as u32,
            aborted,
            total_wall_time,
            avg_step_time,
            min_step_time,
            max_step_time,
            final_kinetic_energy,
            vertex_count: body.vertex_count(),
            edge_count: body.edges().len(),
            face_count: body.faces().len(),
            rest_volume: body.rest_volume(),
            final_volume,
        };
        tracing::info!(
            completed = metrics.completed,
            aborted = metrics.aborted,
            wall_time = metrics.total_wall_time,
            "run finished"
        );
        Ok(metrics)
    }
}
