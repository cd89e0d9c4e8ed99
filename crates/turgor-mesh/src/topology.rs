//! Constraint topology derivation.
//!
//! Turns the unordered face list of an [`ObjMesh`] into spring edges:
//!
//! - **Boundary edges** — the three sides of every face.
//! - **Bending edges** — for every face corner, an edge to the far vertex
//!   of the unique face on the other side of the opposite edge:
//!
//! ```text
//!         c
//!        / \
//!       /   \
//!      a ─── b      corner c, opposite edge (a, b)
//!       \   /
//!        \ /
//!         d         bending edge c ── d
//! ```
//!
//! - **Proximity edges** — legacy mode, every pair of points whose
//!   distance lies in `[min_dist, max_dist]`.
//!
//! Each stage's list is kept separately so counts before deduplication
//! can be checked; [`Topology::spring_edges`] merges them.

use std::collections::{BTreeMap, HashSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use turgor_types::{Diagnostic, FaceId, VertexId};

use crate::mesh::ObjMesh;

/// How spring edges are derived from a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Only the explicit `l` edges of the file.
    Explicit,
    /// Explicit edges, face sides and opposite-corner bending edges.
    #[default]
    Bending,
    /// Explicit edges plus every pair of points within a distance band.
    Proximity { min_dist: f32, max_dist: f32 },
}

/// Canonical `(min, max)` key for an undirected edge.
pub type EdgeKey = (u32, u32);

/// Derived edge sets and diagnostics for one mesh.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub vertex_count: usize,
    /// Explicit edges copied from the mesh.
    pub explicit_edges: Vec<[u32; 2]>,
    /// Three sides per face, before deduplication.
    pub boundary_edges: Vec<[u32; 2]>,
    /// Opposite-corner edges, before deduplication.
    pub bending_edges: Vec<[u32; 2]>,
    /// Distance-band edges (proximity mode only).
    pub proximity_edges: Vec<[u32; 2]>,
    /// For each undirected edge, the faces that contain it.
    pub edge_faces: BTreeMap<EdgeKey, Vec<u32>>,
    /// Skipped corners and non-manifold edges.
    pub diagnostics: Vec<Diagnostic>,
}

impl Topology {
    /// Derive edges from a mesh in the given mode.
    pub fn derive(mesh: &ObjMesh, mode: EdgeMode) -> Self {
        let edge_faces = edge_face_map(&mesh.faces);
        let mut diagnostics = manifold_diagnostics(&edge_faces);

        let mut topology = Self {
            vertex_count: mesh.vertex_count(),
            explicit_edges: mesh.edges.clone(),
            ..Default::default()
        };

        match mode {
            EdgeMode::Explicit => {}
            EdgeMode::Bending => {
                topology.boundary_edges = boundary_edges(&mesh.faces);
                topology.bending_edges =
                    opposite_corner_edges(&mesh.faces, &edge_faces, &mut diagnostics);
            }
            EdgeMode::Proximity { min_dist, max_dist } => {
                topology.proximity_edges = proximity_edges(&mesh.points, min_dist, max_dist);
            }
        }

        topology.edge_faces = edge_faces;
        topology.diagnostics = diagnostics;

        tracing::info!(
            mode = ?mode,
            explicit = topology.explicit_edges.len(),
            boundary = topology.boundary_edges.len(),
            bending = topology.bending_edges.len(),
            proximity = topology.proximity_edges.len(),
            skipped_corners = topology.skipped_corner_count(),
            "topology derived"
        );
        topology
    }

    /// Total derived edges across all stages, before deduplication.
    pub fn raw_edge_count(&self) -> usize {
        self.explicit_edges.len()
            + self.boundary_edges.len()
            + self.bending_edges.len()
            + self.proximity_edges.len()
    }

    /// Union of all derived edges as `[min, max]` pairs, in order of first
    /// appearance, with duplicates and self-loops removed.
    pub fn spring_edges(&self) -> Vec<[u32; 2]> {
        let mut seen: HashSet<EdgeKey> = HashSet::with_capacity(self.raw_edge_count());
        self.explicit_edges
            .iter()
            .chain(&self.boundary_edges)
            .chain(&self.bending_edges)
            .chain(&self.proximity_edges)
            .filter(|&&[a, b]| a != b)
            .map(|&[a, b]| edge_key(a, b))
            .filter(|key| seen.insert(*key))
            .map(|(a, b)| [a, b])
            .collect()
    }

    /// Number of face corners whose opposite face was missing or ambiguous.
    pub fn skipped_corner_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.is_opposite_face_skip())
            .count()
    }

    /// Returns the number of edges that border exactly one face.
    pub fn open_edge_count(&self) -> usize {
        self.edge_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Returns true if every face edge borders exactly two faces.
    pub fn is_closed(&self) -> bool {
        !self.edge_faces.is_empty() && self.edge_faces.values().all(|f| f.len() == 2)
    }
}

/// Canonicalize an undirected edge.
#[inline]
pub fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The three sides of every face, in face order.
pub fn boundary_edges(faces: &[[u32; 3]]) -> Vec<[u32; 2]> {
    faces
        .iter()
        .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
        .collect()
}

/// Map each undirected face edge to the faces containing it.
pub fn edge_face_map(faces: &[[u32; 3]]) -> BTreeMap<EdgeKey, Vec<u32>> {
    let mut map: BTreeMap<EdgeKey, Vec<u32>> = BTreeMap::new();
    for (t, &[a, b, c]) in faces.iter().enumerate() {
        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            map.entry(edge_key(v0, v1)).or_default().push(t as u32);
        }
    }
    map
}

/// Opposite-corner (bending) edges.
///
/// For each corner of each face, the candidate neighbors are the faces
/// that contain the opposite edge but not the corner vertex. Exactly one
/// candidate yields an edge from the corner to that face's unshared
/// vertex; zero or several candidates skip the corner and record a
/// diagnostic.
pub fn opposite_corner_edges(
    faces: &[[u32; 3]],
    edge_faces: &BTreeMap<EdgeKey, Vec<u32>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<[u32; 2]> {
    let mut edges = Vec::with_capacity(faces.len() * 3);

    for (t, &[a, b, c]) in faces.iter().enumerate() {
        for (corner, e0, e1) in [(a, b, c), (b, c, a), (c, a, b)] {
            let candidates: Vec<u32> = edge_faces
                .get(&edge_key(e0, e1))
                .map(|tris| {
                    tris.iter()
                        .copied()
                        .filter(|&f| !faces[f as usize].contains(&corner))
                        .collect()
                })
                .unwrap_or_default();

            match candidates.as_slice() {
                [neighbor] => {
                    let far = wing_vertex(faces[*neighbor as usize], e0, e1);
                    edges.push([corner, far]);
                }
                [] => {
                    tracing::warn!(face = t, corner, "no opposite face, corner skipped");
                    diagnostics.push(Diagnostic::MissingOppositeFace {
                        face: FaceId(t as u32),
                        corner: VertexId(corner),
                    });
                }
                many => {
                    tracing::warn!(
                        face = t,
                        corner,
                        candidates = many.len(),
                        "ambiguous opposite face, corner skipped"
                    );
                    diagnostics.push(Diagnostic::AmbiguousOppositeFace {
                        face: FaceId(t as u32),
                        corner: VertexId(corner),
                        candidates: many.len(),
                    });
                }
            }
        }
    }

    edges
}

/// Edges that do not border exactly two faces.
///
/// Informational only: open sheets legitimately have one-face edges.
pub fn manifold_diagnostics(edge_faces: &BTreeMap<EdgeKey, Vec<u32>>) -> Vec<Diagnostic> {
    let diagnostics: Vec<Diagnostic> = edge_faces
        .iter()
        .filter(|(_, tris)| tris.len() != 2)
        .map(|(&(a, b), tris)| Diagnostic::NonManifoldEdge {
            edge: [VertexId(a), VertexId(b)],
            face_count: tris.len(),
        })
        .collect();

    if !diagnostics.is_empty() {
        tracing::warn!(
            edges = diagnostics.len(),
            "mesh is not watertight: some edges do not border exactly two faces"
        );
    }
    diagnostics
}

/// Every pair `(i, j)`, `i < j`, whose distance lies in `[min_dist, max_dist]`.
///
/// Exhaustive O(n²) scan.
pub fn proximity_edges(points: &[Vec3], min_dist: f32, max_dist: f32) -> Vec<[u32; 2]> {
    let min_sq = min_dist * min_dist;
    let max_sq = max_dist * max_dist;
    let mut edges = Vec::new();

    for (i, p1) in points.iter().enumerate() {
        for (j, p2) in points.iter().enumerate().skip(i + 1) {
            let d_sq = p1.distance_squared(*p2);
            if d_sq >= min_sq && d_sq <= max_sq {
                edges.push([i as u32, j as u32]);
            }
        }
    }

    tracing::debug!(added = edges.len(), "proximity edges");
    edges
}

/// The vertex of `face` that is neither `v0` nor `v1`.
fn wing_vertex(face: [u32; 3], v0: u32, v1: u32) -> u32 {
    let [a, b, c] = face;
    if a != v0 && a != v1 {
        a
    } else if b != v0 && b != v1 {
        b
    } else {
        c
    }
}
