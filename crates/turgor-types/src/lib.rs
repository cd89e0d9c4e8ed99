//! # turgor-types
//!
//! Shared types, identifiers, error types, diagnostics and simulation
//! defaults for the Turgor soft-body simulator.
//!
//! This crate has no domain logic. It defines the vocabulary
//! that all other Turgor crates share.

pub mod constants;
pub mod diagnostic;
pub mod error;
pub mod ids;

pub use diagnostic::Diagnostic;
pub use error::{TurgorError, TurgorResult};
pub use ids::{FaceId, VertexId};
