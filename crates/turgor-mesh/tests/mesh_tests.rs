//! Integration tests for turgor-mesh.

use std::sync::{Arc, Mutex};

use glam::Vec3;
use tracing_subscriber::fmt::MakeWriter;
use turgor_mesh::generators::{cube, icosphere, quad_grid};
use turgor_mesh::topology::{boundary_edges, proximity_edges};
use turgor_mesh::{parse_obj, EdgeMode, ObjMesh, Topology};
use turgor_types::{Diagnostic, FaceId, VertexId};

const TWO_TRIANGLES: &str = "\
# two triangles sharing edge 2-3
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
f 1 2 3
f 2 4 3
";

fn two_triangles() -> ObjMesh {
    parse_obj(TWO_TRIANGLES).mesh
}

fn single_triangle() -> ObjMesh {
    ObjMesh::from_faces(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        vec![[0, 1, 2]],
    )
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Parser Tests ─────────────────────────────────────────────

#[test]
fn parse_counts_and_zero_based_indices() {
    let text = "\
# header
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
s off
l 1 4
f 1 2 3
f 1 3 4
";
    let loaded = parse_obj(text);
    let mesh = &loaded.mesh;
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.normals.len(), 4);
    assert_eq!(mesh.edges, vec![[0, 3]]);
    assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    assert_eq!(mesh.position(1), Vec3::X);
    assert!(mesh.validate().is_ok());
}

#[test]
fn unknown_line_kind_is_reported_and_skipped() {
    let text = "v 0 0 0\nvt 0.5 0.5\nv 1 0 0\nusemtl skin\nv 0 1 0\nf 1 2 3\n";
    let loaded = parse_obj(text);
    assert_eq!(loaded.mesh.vertex_count(), 3);
    assert_eq!(loaded.mesh.face_count(), 1);
    assert_eq!(loaded.warnings.len(), 2);
    assert_eq!(loaded.warnings[0].line, 2);
    assert!(loaded.warnings[0].message.contains("'vt'"));
    assert_eq!(loaded.warnings[1].line, 4);
}

#[test]
fn malformed_lines_are_skipped() {
    let text = "\
v 0 0 0
v 1 0
v 1 0 0
v 0 1 zero
v 0 1 0
f 1 2 99
f 1 1 2
l 2 2
f 0 1 2
f 1 2 3
";
    let loaded = parse_obj(text);
    assert_eq!(loaded.mesh.vertex_count(), 3);
    assert_eq!(loaded.mesh.faces, vec![[0, 1, 2]]);
    assert!(loaded.mesh.edges.is_empty());
    let lines: Vec<usize> = loaded.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, vec![2, 4, 6, 7, 8, 9]);
}

#[test]
fn elements_may_precede_their_vertices() {
    let text = "\
f 1 2 3
l 3 4
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
f 2 4 5
";
    let loaded = parse_obj(text);
    assert_eq!(loaded.mesh.faces, vec![[0, 1, 2]]);
    assert_eq!(loaded.mesh.edges, vec![[2, 3]]);
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].line, 7);
    assert!(loaded.warnings[0].message.contains("index 5 out of range"));
}

#[test]
fn polygons_are_fan_triangulated() {
    let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1 4/4/1\n";
    let loaded = parse_obj(text);
    assert_eq!(loaded.mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
}

#[test]
fn polyline_expands_to_consecutive_edges() {
    let text = "v 0 0 0\nv 1 0 0\nv 2 0 0\nl 1 2 3\n";
    let loaded = parse_obj(text);
    assert_eq!(loaded.mesh.edges, vec![[0, 1], [1, 2]]);
}

#[test]
fn missing_normals_are_computed() {
    let mesh = two_triangles();
    assert_eq!(mesh.normals.len(), 4);
    for n in &mesh.normals {
        assert!((n.z - 1.0).abs() < 1e-6, "normal {n:?}");
    }
}

// ─── Topology Tests ───────────────────────────────────────────

#[test]
fn two_triangles_bending_edges() {
    let mesh = two_triangles();
    let topo = Topology::derive(&mesh, EdgeMode::Bending);

    assert_eq!(topo.boundary_edges.len(), 6);
    assert_eq!(topo.bending_edges, vec![[0, 3], [3, 0]]);
    assert_eq!(topo.skipped_corner_count(), 4);

    // 5 unique face edges plus the single far-vertex diagonal.
    let springs = topo.spring_edges();
    assert_eq!(springs.len(), 6);
    assert!(springs.contains(&[0, 3]));
}

#[test]
fn isolated_triangle_skips_every_corner() {
    let mesh = single_triangle();
    let topo = Topology::derive(&mesh, EdgeMode::Bending);

    assert!(topo.bending_edges.is_empty());
    assert_eq!(topo.skipped_corner_count(), 3);
    for corner in 0..3 {
        assert!(topo.diagnostics.contains(&Diagnostic::MissingOppositeFace {
            face: FaceId(0),
            corner: VertexId(corner),
        }));
    }
}

#[test]
fn skipped_corners_are_logged_at_warn() {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(log.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        Topology::derive(&single_triangle(), EdgeMode::Bending);
    });
    assert_eq!(log.text().matches("no opposite face, corner skipped").count(), 3);
}

#[test]
fn ambiguous_opposite_face_is_skipped() {
    // Three triangles hinge on edge 1-2.
    let mesh = ObjMesh::from_faces(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE, Vec3::Z],
        vec![[0, 1, 2], [1, 3, 2], [1, 4, 2]],
    );
    let topo = Topology::derive(&mesh, EdgeMode::Bending);

    let ambiguous: Vec<&Diagnostic> = topo
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::AmbiguousOppositeFace { .. }))
        .collect();
    assert_eq!(ambiguous.len(), 3);
    assert!(topo.bending_edges.is_empty());
    assert!(topo.diagnostics.contains(&Diagnostic::NonManifoldEdge {
        edge: [VertexId(1), VertexId(2)],
        face_count: 3,
    }));
}

#[test]
fn derived_counts_follow_face_count() {
    let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
v 2 2 2
l 1 5
l 4 5
f 1 2 3
f 2 4 3
";
    let mesh = parse_obj(text).mesh;
    let topo = Topology::derive(&mesh, EdgeMode::Bending);
    let e = mesh.edge_count();
    let f = mesh.face_count();

    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(topo.explicit_edges.len() + topo.boundary_edges.len(), e + 3 * f);
    assert_eq!(
        topo.bending_edges.len(),
        3 * f - topo.skipped_corner_count()
    );
}

#[test]
fn cube_is_closed_and_fully_bent() {
    let mesh = cube(1.0);
    let topo = Topology::derive(&mesh, EdgeMode::Bending);

    assert!(topo.is_closed());
    assert_eq!(topo.open_edge_count(), 0);
    assert_eq!(topo.edge_faces.len(), 18);
    assert_eq!(topo.boundary_edges.len(), 36);
    assert_eq!(topo.bending_edges.len(), 36);
    assert!(topo.diagnostics.is_empty());
}

#[test]
fn open_sheet_reports_boundary_edges() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let topo = Topology::derive(&mesh, EdgeMode::Bending);
    assert!(!topo.is_closed());
    assert_eq!(topo.open_edge_count(), 4);
    let non_manifold = topo
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::NonManifoldEdge { face_count: 1, .. }))
        .count();
    assert_eq!(non_manifold, 4);
}

#[test]
fn spring_edges_are_unique_and_canonical() {
    let mesh = icosphere(1.0, 1);
    let topo = Topology::derive(&mesh, EdgeMode::Bending);
    let springs = topo.spring_edges();

    let mut sorted = springs.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), springs.len());
    assert!(springs.iter().all(|&[a, b]| a < b));
}

#[test]
fn explicit_mode_keeps_only_line_edges() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nl 1 2\nf 1 2 3\n";
    let mesh = parse_obj(text).mesh;
    let topo = Topology::derive(&mesh, EdgeMode::Explicit);
    assert!(topo.boundary_edges.is_empty());
    assert!(topo.bending_edges.is_empty());
    assert_eq!(topo.spring_edges(), vec![[0, 1]]);
}

#[test]
fn proximity_mode_uses_distance_band() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let topo = Topology::derive(
        &mesh,
        EdgeMode::Proximity {
            min_dist: 0.9,
            max_dist: 1.1,
        },
    );
    assert_eq!(topo.proximity_edges.len(), 4);
    assert!(topo.boundary_edges.is_empty());

    // Widening the band picks up both diagonals.
    assert_eq!(proximity_edges(&mesh.points, 0.0, 1.5).len(), 6);
}

#[test]
fn boundary_edges_follow_winding() {
    assert_eq!(
        boundary_edges(&[[4, 7, 9]]),
        vec![[4, 7], [7, 9], [9, 4]]
    );
}

// ─── Volume Tests ─────────────────────────────────────────────

#[test]
fn unit_cube_volume() {
    let mesh = cube(1.0);
    assert!((mesh.signed_volume() - 1.0).abs() < 1e-5);
    assert!((cube(2.0).signed_volume() - 8.0).abs() < 1e-4);
}

#[test]
fn volume_is_independent_of_origin() {
    let mut mesh = cube(1.0);
    for p in &mut mesh.points {
        *p += Vec3::new(3.0, -2.0, 5.0);
    }
    assert!((mesh.signed_volume() - 1.0).abs() < 1e-4);
}

#[test]
fn inverted_winding_gives_negative_volume() {
    let mut mesh = cube(1.0);
    mesh.flip_winding();
    assert!((mesh.signed_volume() + 1.0).abs() < 1e-5);
}

#[test]
fn icosphere_volume_approaches_sphere() {
    let mesh = icosphere(1.0, 3);
    let exact = 4.0 / 3.0 * std::f32::consts::PI;
    let v = mesh.signed_volume();
    assert!(v > 0.0);
    assert!(v < exact);
    assert!((exact - v) / exact < 0.02, "volume {v} vs {exact}");
}

// ─── Generator Tests ──────────────────────────────────────────

#[test]
fn icosphere_is_closed() {
    let mesh = icosphere(2.5, 2);
    assert_eq!(mesh.face_count(), 20 * 16);
    assert!(mesh.validate().is_ok());
    assert!(Topology::derive(&mesh, EdgeMode::Bending).is_closed());
    for p in &mesh.points {
        assert!((p.length() - 2.5).abs() < 1e-4);
    }
}

#[test]
fn generated_normals_point_outward() {
    let mesh = icosphere(1.0, 1);
    for (p, n) in mesh.points.iter().zip(&mesh.normals) {
        assert!(p.dot(*n) > 0.9);
    }
}

#[test]
fn quad_grid_counts() {
    let mesh = quad_grid(20, 20, 2.0, 2.0);
    assert_eq!(mesh.vertex_count(), 441);
    assert_eq!(mesh.face_count(), 800);
    assert!(mesh.validate().is_ok());
}
