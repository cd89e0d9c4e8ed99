//! Signed volume by the divergence theorem.
//!
//! Each face `(a, b, c)` contributes the signed volume of the tetrahedron
//! it spans with the origin, `a · (b × c) / 6`. For a closed mesh the sum
//! is the enclosed volume, positive when faces wind counter-clockwise seen
//! from outside. The device kernel computes the same per-face term; this
//! host version is the reference it is checked against.

use glam::Vec3;

/// Signed tetrahedral volume of one face against the origin.
#[inline]
pub fn face_volume(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    a.dot(b.cross(c)) / 6.0
}

/// Sum of signed face volumes.
pub fn signed_volume(points: &[Vec3], faces: &[[u32; 3]]) -> f32 {
    let sum: f64 = faces
        .iter()
        .map(|&[a, b, c]| {
            face_volume(points[a as usize], points[b as usize], points[c as usize]) as f64
        })
        .sum();
    sum as f32
}
