//! Vertex normal computation from triangle data.
//!
//! Computes area-weighted vertex normals by accumulating
//! face normals from each adjacent triangle.

use glam::Vec3;

/// Compute vertex normals from triangle geometry (area-weighted).
///
/// Each triangle's unnormalized face normal (magnitude = 2 × area) is
/// accumulated at its three corners and the sums are normalized.
/// Vertices that belong to no face get a zero normal.
pub fn compute_vertex_normals(points: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; points.len()];

    for &[a, b, c] in faces {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let n = (points[b] - points[a]).cross(points[c] - points[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }

    for n in &mut normals {
        if n.length_squared() > 1e-20 {
            *n = n.normalize();
        }
    }

    normals
}
