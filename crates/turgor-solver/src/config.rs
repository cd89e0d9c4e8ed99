//! Body and run configuration.
//!
//! Parameters that control how a mesh becomes a simulation body: graph
//! capacities, spring stiffness, mass and the volume controller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use turgor_mesh::EdgeMode;
use turgor_types::constants::{
    DEFAULT_DT, DEFAULT_MAX_CORNERED, DEFAULT_MAX_DEGREE, DEFAULT_PRESSURE_GAIN,
    SURFACE_INVERSE_MASS, SURFACE_STIFFNESS, VOLUME_INVERSE_MASS, VOLUME_STIFFNESS,
};
use turgor_types::{TurgorError, TurgorResult};

/// Whether a body maintains a volume target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Springs only.
    #[default]
    Surface,
    /// Springs plus volume-preserving pressure.
    Volume,
}

/// Configuration for one simulation body.
///
/// When deserialized, fields left out fall back to the preset for `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialBodyConfig")]
pub struct BodyConfig {
    pub kind: BodyKind,

    /// Neighbor slots per vertex.
    pub max_degree: usize,

    /// Corner slots per vertex.
    pub max_cornered: usize,

    /// Spring stiffness applied to every edge.
    pub stiffness: f32,

    /// Per-vertex inverse mass.
    pub inverse_mass: f32,

    /// Gain converting volume deficit into pressure (volume bodies only).
    pub pressure_gain: f32,

    /// Rate at which `inflate`/`deflate` change the volume target
    /// multiplier, per second.
    pub inflation_rate: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self::surface()
    }
}

impl BodyConfig {
    /// Spring-only body.
    pub fn surface() -> Self {
        Self {
            kind: BodyKind::Surface,
            max_degree: DEFAULT_MAX_DEGREE,
            max_cornered: DEFAULT_MAX_CORNERED,
            stiffness: SURFACE_STIFFNESS,
            inverse_mass: SURFACE_INVERSE_MASS,
            pressure_gain: 0.0,
            inflation_rate: 0.0,
        }
    }

    /// Volume-preserving body.
    pub fn volume() -> Self {
        Self {
            kind: BodyKind::Volume,
            stiffness: VOLUME_STIFFNESS,
            inverse_mass: VOLUME_INVERSE_MASS,
            pressure_gain: DEFAULT_PRESSURE_GAIN,
            inflation_rate: 0.5,
            ..Self::surface()
        }
    }

    /// Preset for `kind`.
    pub fn for_kind(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Surface => Self::surface(),
            BodyKind::Volume => Self::volume(),
        }
    }

    pub fn validate(&self) -> TurgorResult<()> {
        if self.max_degree == 0 || self.max_cornered == 0 {
            return Err(TurgorError::InvalidConfig(
                "max_degree and max_cornered must be positive".into(),
            ));
        }
        if i32::try_from(self.max_degree).is_err() || i32::try_from(self.max_cornered).is_err() {
            return Err(TurgorError::InvalidConfig(
                "graph capacities must fit in a device int".into(),
            ));
        }
        for (name, value) in [
            ("stiffness", self.stiffness),
            ("inverse_mass", self.inverse_mass),
            ("pressure_gain", self.pressure_gain),
            ("inflation_rate", self.inflation_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TurgorError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialBodyConfig {
    kind: Option<BodyKind>,
    max_degree: Option<usize>,
    max_cornered: Option<usize>,
    stiffness: Option<f32>,
    inverse_mass: Option<f32>,
    pressure_gain: Option<f32>,
    inflation_rate: Option<f32>,
}

impl From<PartialBodyConfig> for BodyConfig {
    fn from(partial: PartialBodyConfig) -> Self {
        let preset = BodyConfig::for_kind(partial.kind.unwrap_or_default());
        Self {
            kind: preset.kind,
            max_degree: partial.max_degree.unwrap_or(preset.max_degree),
            max_cornered: partial.max_cornered.unwrap_or(preset.max_cornered),
            stiffness: partial.stiffness.unwrap_or(preset.stiffness),
            inverse_mass: partial.inverse_mass.unwrap_or(preset.inverse_mass),
            pressure_gain: partial.pressure_gain.unwrap_or(preset.pressure_gain),
            inflation_rate: partial.inflation_rate.unwrap_or(preset.inflation_rate),
        }
    }
}

/// How the mesh's edges are derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub mode: EdgeMode,
}

/// A complete run: mesh, step count, timestep and body parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Path to the mesh file, relative to the config file.
    pub mesh: PathBuf,

    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_dt")]
    pub dt: f32,

    #[serde(default)]
    pub body: BodyConfig,

    #[serde(default)]
    pub topology: TopologyConfig,
}

fn default_steps() -> u32 {
    1000
}

fn default_dt() -> f32 {
    DEFAULT_DT
}

impl SimulationConfig {
    /// Defaults for `mesh` with the preset for `kind`.
    pub fn new(mesh: impl Into<PathBuf>, kind: BodyKind) -> Self {
        Self {
            mesh: mesh.into(),
            steps: default_steps(),
            dt: default_dt(),
            body: BodyConfig::for_kind(kind),
            topology: TopologyConfig::default(),
        }
    }

    /// Parses TOML text.
    pub fn from_toml(text: &str) -> TurgorResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TurgorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file. A relative `mesh` path is resolved against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> TurgorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;
        if config.mesh.is_relative() {
            if let Some(dir) = path.parent() {
                config.mesh = dir.join(&config.mesh);
            }
        }
        tracing::info!(path = %path.display(), mesh = %config.mesh.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> TurgorResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(TurgorError::InvalidConfig(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if let EdgeMode::Proximity { min_dist, max_dist } = self.topology.mode {
            if !(min_dist >= 0.0 && min_dist <= max_dist) {
                return Err(TurgorError::InvalidConfig(format!(
                    "proximity band [{min_dist}, {max_dist}] is empty"
                )));
            }
        }
        self.body.validate()
    }
}
