//! Fixed-capacity constraint graph.
//!
//! Packs an edge list and a face list into the vertex-major buffers the
//! device kernels read:
//!
//! ```text
//! neighbors  [v * max_degree + k]    neighbor index, -1 when unused
//! springs    [v * max_degree + k]    (rest_length, stiffness)
//! corners    [v * max_cornered + k]  other two face vertices in winding order
//! ```
//!
//! Capacity is fixed per vertex. An edge or face that does not fit is
//! dropped as a whole, recorded as a [`Diagnostic`] and logged; the build
//! never aborts on overflow.

use glam::Vec3;
use turgor_types::{Diagnostic, FaceId, TurgorError, TurgorResult, VertexId};

use crate::config::BodyConfig;

/// Marks an unused neighbor or corner slot.
pub const EMPTY_SLOT: i32 = -1;

/// Packed adjacency and corner buffers plus rest parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGraph {
    pub vertex_count: usize,
    pub max_degree: usize,
    pub max_cornered: usize,
    /// Neighbor indices, stride `max_degree`.
    pub neighbors: Vec<i32>,
    /// `(rest_length, stiffness)` per neighbor slot, stride `max_degree`.
    pub springs: Vec<[f32; 2]>,
    /// Number of used neighbor slots per vertex.
    pub degrees: Vec<i32>,
    /// Corner entries, stride `max_cornered`.
    pub corners: Vec<[i32; 2]>,
    /// Number of used corner slots per vertex.
    pub cornered: Vec<i32>,
    /// Edges that made it into the adjacency buffer.
    pub edges: Vec<[u32; 2]>,
    /// Faces whose corner entries were packed.
    pub cornered_faces: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConstraintGraph {
    /// Neighbor slots of vertex `v` that are in use.
    pub fn neighbors_of(&self, v: usize) -> &[i32] {
        let start = v * self.max_degree;
        &self.neighbors[start..start + self.degrees[v] as usize]
    }

    /// Rest parameters matching [`neighbors_of`](Self::neighbors_of).
    pub fn springs_of(&self, v: usize) -> &[[f32; 2]] {
        let start = v * self.max_degree;
        &self.springs[start..start + self.degrees[v] as usize]
    }

    /// Corner entries of vertex `v` that are in use.
    pub fn corners_of(&self, v: usize) -> &[[i32; 2]] {
        let start = v * self.max_cornered;
        &self.corners[start..start + self.cornered[v] as usize]
    }

    /// Number of dropped edges and faces.
    pub fn overflow_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_overflow()).count()
    }
}

/// Builds a [`ConstraintGraph`] with fixed per-vertex capacities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintGraphBuilder {
    pub max_degree: usize,
    pub max_cornered: usize,
    pub stiffness: f32,
}

impl ConstraintGraphBuilder {
    pub fn new(max_degree: usize, max_cornered: usize, stiffness: f32) -> Self {
        Self {
            max_degree,
            max_cornered,
            stiffness,
        }
    }

    pub fn from_config(config: &BodyConfig) -> Self {
        Self::new(config.max_degree, config.max_cornered, config.stiffness)
    }

    /// Packs `edges` and `faces` over `points`.
    ///
    /// Rest lengths are the distances between the endpoints in `points`.
    /// Self-loop and out-of-range edges are skipped with a diagnostic; an
    /// out-of-range face is an error.
    pub fn build(
        &self,
        points: &[Vec3],
        edges: &[[u32; 2]],
        faces: &[[u32; 3]],
    ) -> TurgorResult<ConstraintGraph> {
        let n = points.len();
        let mut graph = ConstraintGraph {
            vertex_count: n,
            max_degree: self.max_degree,
            max_cornered: self.max_cornered,
            neighbors: vec![EMPTY_SLOT; n * self.max_degree],
            springs: vec![[0.0, 0.0]; n * self.max_degree],
            degrees: vec![0; n],
            corners: vec![[EMPTY_SLOT, EMPTY_SLOT]; n * self.max_cornered],
            cornered: vec![0; n],
            edges: Vec::with_capacity(edges.len()),
            cornered_faces: 0,
            diagnostics: Vec::new(),
        };

        for &[a, b] in edges {
            self.add_edge(&mut graph, points, a, b);
        }

        for (f, &face) in faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= n) {
                return Err(TurgorError::InvalidMesh(format!(
                    "face {f} references vertex {bad}, mesh has {n}"
                )));
            }
            let [a, b, c] = face;
            if a == b || b == c || c == a {
                return Err(TurgorError::InvalidMesh(format!(
                    "face {f} repeats a vertex: {face:?}"
                )));
            }
            self.add_face(&mut graph, f, face);
        }

        if !graph.diagnostics.is_empty() {
            tracing::warn!(
                dropped = graph.diagnostics.len(),
                edges = graph.edges.len(),
                "constraint graph built with dropped entries"
            );
        }
        Ok(graph)
    }

    fn add_edge(&self, graph: &mut ConstraintGraph, points: &[Vec3], a: u32, b: u32) {
        let n = points.len();
        if a == b || a as usize >= n || b as usize >= n {
            tracing::warn!(a, b, vertex_count = n, "rejected edge");
            graph.diagnostics.push(Diagnostic::InvalidEdge {
                edge: [a, b],
                vertex_count: n,
            });
            return;
        }

        let (ai, bi) = (a as usize, b as usize);
        let full = [a, b]
            .into_iter()
            .find(|&v| graph.degrees[v as usize] as usize >= self.max_degree);
        if let Some(v) = full {
            tracing::warn!(a, b, vertex = v, max_degree = self.max_degree, "edge dropped: degree overflow");
            graph.diagnostics.push(Diagnostic::DegreeOverflow {
                vertex: VertexId(v),
                edge: [VertexId(a), VertexId(b)],
                max_degree: self.max_degree,
            });
            return;
        }

        let rest = points[ai].distance(points[bi]);
        for (from, to) in [(ai, b), (bi, a)] {
            let slot = from * self.max_degree + graph.degrees[from] as usize;
            graph.neighbors[slot] = to as i32;
            graph.springs[slot] = [rest, self.stiffness];
            graph.degrees[from] += 1;
        }
        graph.edges.push([a, b]);
    }

    fn add_face(&self, graph: &mut ConstraintGraph, f: usize, [a, b, c]: [u32; 3]) {
        let full = [a, b, c]
            .into_iter()
            .find(|&v| graph.cornered[v as usize] as usize >= self.max_cornered);
        if let Some(v) = full {
            tracing::warn!(face = f, vertex = v, max_cornered = self.max_cornered, "face corners dropped: corner overflow");
            graph.diagnostics.push(Diagnostic::CornerOverflow {
                vertex: VertexId(v),
                face: FaceId(f as u32),
                max_cornered: self.max_cornered,
            });
            return;
        }

        for (v, pair) in [(a, [b, c]), (b, [c, a]), (c, [a, b])] {
            let v = v as usize;
            let slot = v * self.max_cornered + graph.cornered[v] as usize;
            graph.corners[slot] = [pair[0] as i32, pair[1] as i32];
            graph.cornered[v] += 1;
        }
        graph.cornered_faces += 1;
    }
}
