//! # turgor-mesh
//!
//! Text mesh loading and constraint topology derivation.
//!
//! ## Key Types
//!
//! - [`ObjMesh`] — Zero-based points, normals, explicit edges and faces.
//! - [`obj::parse_obj`] / [`obj::load_obj`] — Best-effort line parser.
//! - [`Topology`] — Boundary, bending and proximity edge derivation.
//! - Procedural generators for closed test meshes (cube, icosphere).

pub mod generators;
pub mod mesh;
pub mod normals;
pub mod obj;
pub mod topology;
pub mod volume;

pub use mesh::ObjMesh;
pub use obj::{load_obj, parse_obj, LoadedMesh, ParseWarning};
pub use topology::{EdgeMode, Topology};
