//! Loaded mesh data.
//!
//! An [`ObjMesh`] is the zero-based result of parsing a text mesh: point
//! positions, optional normals, explicit line edges and triangle faces.
//! It is immutable input to topology derivation; simulation state lives
//! in device buffers, not here.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use turgor_types::{TurgorError, TurgorResult};

use crate::volume;

/// A triangle/line mesh with zero-based indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    /// Vertex positions.
    pub points: Vec<Vec3>,
    /// Per-vertex normals. Either empty or one per point.
    pub normals: Vec<Vec3>,
    /// Explicit edges from `l` lines.
    pub edges: Vec<[u32; 2]>,
    /// Triangles from `f` lines, in file winding order.
    pub faces: Vec<[u32; 3]>,
}

impl ObjMesh {
    /// Builds a mesh from points and faces, with no explicit edges.
    pub fn from_faces(points: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            points,
            normals: Vec::new(),
            edges: Vec::new(),
            faces,
        }
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns the number of explicit edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the position of vertex `i`.
    #[inline]
    pub fn position(&self, i: u32) -> Vec3 {
        self.points[i as usize]
    }

    /// Signed enclosed volume, positive for outward winding.
    pub fn signed_volume(&self) -> f32 {
        volume::signed_volume(&self.points, &self.faces)
    }

    /// Reverses the winding of every face.
    pub fn flip_winding(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - Normals are absent or one per vertex
    /// - Edge and face indices are within bounds
    /// - No self-loop edges and no faces with repeated vertices
    pub fn validate(&self) -> TurgorResult<()> {
        let n = self.points.len();

        if !self.normals.is_empty() && self.normals.len() != n {
            return Err(TurgorError::InvalidMesh(format!(
                "Normal count ({}) != vertex count ({})",
                self.normals.len(),
                n
            )));
        }

        for (i, &[a, b]) in self.edges.iter().enumerate() {
            if a as usize >= n || b as usize >= n {
                return Err(TurgorError::InvalidMesh(format!(
                    "Edge {} [{}, {}] is out of range (vertex count: {})",
                    i, a, b, n
                )));
            }
            if a == b {
                return Err(TurgorError::InvalidMesh(format!(
                    "Edge {} is a self-loop on vertex {}",
                    i, a
                )));
            }
        }

        for (t, &[a, b, c]) in self.faces.iter().enumerate() {
            if [a, b, c].iter().any(|&idx| idx as usize >= n) {
                return Err(TurgorError::InvalidMesh(format!(
                    "Face {} [{}, {}, {}] is out of range (vertex count: {})",
                    t, a, b, c, n
                )));
            }
            if a == b || b == c || a == c {
                return Err(TurgorError::InvalidMesh(format!(
                    "Face {} has repeated vertex indices: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
        }

        Ok(())
    }
}
