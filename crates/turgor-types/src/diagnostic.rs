//! Non-fatal topology diagnostics.
//!
//! Topology derivation and constraint packing are best-effort: whenever an
//! element cannot be placed it is skipped, a `tracing` warning is emitted,
//! and one of these values is recorded so callers can inspect what was
//! dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{FaceId, VertexId};

/// A skipped or suspicious topology element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// An edge was dropped because one endpoint already had `max_degree`
    /// neighbors.
    DegreeOverflow {
        /// The endpoint that was full.
        vertex: VertexId,
        /// The dropped edge.
        edge: [VertexId; 2],
        max_degree: usize,
    },

    /// A face's corner entries were dropped because one of its vertices
    /// already had `max_cornered` entries.
    CornerOverflow {
        vertex: VertexId,
        face: FaceId,
        max_cornered: usize,
    },

    /// No face shares the edge opposite `corner` of `face`.
    MissingOppositeFace { face: FaceId, corner: VertexId },

    /// More than one face shares the edge opposite `corner` of `face`.
    AmbiguousOppositeFace {
        face: FaceId,
        corner: VertexId,
        candidates: usize,
    },

    /// An edge borders a number of faces other than two.
    NonManifoldEdge { edge: [VertexId; 2], face_count: usize },

    /// An edge is a self-loop or references a vertex that does not exist.
    InvalidEdge { edge: [u32; 2], vertex_count: usize },
}

impl Diagnostic {
    /// Returns true for capacity overflows raised while packing buffers.
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            Diagnostic::DegreeOverflow { .. } | Diagnostic::CornerOverflow { .. }
        )
    }

    /// Returns true for missing or ambiguous opposite-face lookups.
    pub fn is_opposite_face_skip(&self) -> bool {
        matches!(
            self,
            Diagnostic::MissingOppositeFace { .. } | Diagnostic::AmbiguousOppositeFace { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DegreeOverflow {
                vertex,
                edge,
                max_degree,
            } => write!(
                f,
                "edge {}-{} dropped: {} already has {} neighbors",
                edge[0], edge[1], vertex, max_degree
            ),
            Diagnostic::CornerOverflow {
                vertex,
                face,
                max_cornered,
            } => write!(
                f,
                "corners of {} dropped: {} already has {} corner entries",
                face, vertex, max_cornered
            ),
            Diagnostic::MissingOppositeFace { face, corner } => {
                write!(f, "no face opposite {} across {}", corner, face)
            }
            Diagnostic::AmbiguousOppositeFace {
                face,
                corner,
                candidates,
            } => write!(
                f,
                "{} faces opposite {} across {}, skipped",
                candidates, corner, face
            ),
            Diagnostic::NonManifoldEdge { edge, face_count } => write!(
                f,
                "edge {}-{} borders {} faces (expected 2)",
                edge[0], edge[1], face_count
            ),
            Diagnostic::InvalidEdge { edge, vertex_count } => write!(
                f,
                "edge [{}, {}] is a self-loop or out of range (vertex count: {})",
                edge[0], edge[1], vertex_count
            ),
        }
    }
}
