//! Line-oriented text mesh loader.
//!
//! Recognized line kinds (whitespace-tokenized):
//!
//! ```text
//! # comment
//! v  x y z        vertex position
//! vn x y z        vertex normal
//! l  a b [c ...]  explicit edge(s), 1-based
//! f  a b c [d ..] triangle (polygons are fan-triangulated), 1-based
//! s  ...          smoothing group, ignored
//! ```
//!
//! Face tokens may use the `v/vt/vn` slash form; only the vertex index is
//! read. Negative indices count back from the last vertex declared so far.
//! Positive indices may refer to vertices declared later in the file; they
//! are range-checked once the whole text has been read.
//! Every other line kind, and every malformed line, is reported as a
//! [`ParseWarning`] and skipped: loading never fails on content.

use std::fmt;
use std::path::Path;

use glam::Vec3;
use turgor_types::TurgorResult;

use crate::mesh::ObjMesh;
use crate::normals::compute_vertex_normals;

/// A skipped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result of loading a text mesh.
#[derive(Debug, Clone, Default)]
pub struct LoadedMesh {
    pub mesh: ObjMesh,
    pub warnings: Vec<ParseWarning>,
}

/// Reads and parses a mesh file.
///
/// Only I/O failures are errors; content problems become warnings.
pub fn load_obj<P: AsRef<Path>>(path: P) -> TurgorResult<LoadedMesh> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let loaded = parse_obj(&text);
    tracing::info!(
        path = %path.display(),
        points = loaded.mesh.vertex_count(),
        edges = loaded.mesh.edge_count(),
        faces = loaded.mesh.face_count(),
        warnings = loaded.warnings.len(),
        "mesh loaded"
    );
    Ok(loaded)
}

/// Parses mesh text.
pub fn parse_obj(text: &str) -> LoadedMesh {
    let mut parser = Parser::default();
    for (i, line) in text.lines().enumerate() {
        parser.line(i + 1, line);
    }
    parser.finish()
}

/// An `l` or `f` line whose indices are checked against the final
/// vertex count.
struct Pending {
    line: usize,
    element: Element,
    indices: Vec<u32>,
}

enum Element {
    Polyline,
    Polygon,
}

#[derive(Default)]
struct Parser {
    mesh: ObjMesh,
    pending: Vec<Pending>,
    warnings: Vec<ParseWarning>,
}

impl Parser {
    fn line(&mut self, number: usize, line: &str) {
        let mut tokens = line.split_whitespace();
        let Some(kind) = tokens.next() else {
            return;
        };
        if kind.starts_with('#') {
            return;
        }
        let args: Vec<&str> = tokens.collect();

        let result = match kind {
            "v" => parse_vec3(&args).map(|p| self.mesh.points.push(p)),
            "vn" => parse_vec3(&args).map(|n| self.mesh.normals.push(n)),
            "l" => self.polyline(number, &args),
            "f" => self.polygon(number, &args),
            "s" => Ok(()),
            other => Err(format!("unknown line type '{other}'")),
        };

        if let Err(message) = result {
            self.skip(number, message);
        }
    }

    fn skip(&mut self, number: usize, message: String) {
        tracing::warn!(line = number, "{message}, line skipped");
        self.warnings.push(ParseWarning {
            line: number,
            message,
        });
    }

    fn polyline(&mut self, number: usize, args: &[&str]) -> Result<(), String> {
        if args.len() < 2 {
            return Err(format!("edge needs 2 indices, got {}", args.len()));
        }
        let indices = self.resolve_all(args)?;
        if let Some(w) = indices.windows(2).find(|w| w[0] == w[1]) {
            return Err(format!("self-loop edge on vertex {}", w[0] + 1));
        }
        self.pending.push(Pending {
            line: number,
            element: Element::Polyline,
            indices,
        });
        Ok(())
    }

    fn polygon(&mut self, number: usize, args: &[&str]) -> Result<(), String> {
        if args.len() < 3 {
            return Err(format!("face needs 3 indices, got {}", args.len()));
        }
        let indices = self.resolve_all(args)?;
        for (i, a) in indices.iter().enumerate() {
            if indices[i + 1..].contains(a) {
                return Err(format!("face repeats vertex {}", a + 1));
            }
        }
        self.pending.push(Pending {
            line: number,
            element: Element::Polygon,
            indices,
        });
        Ok(())
    }

    fn resolve_all(&self, args: &[&str]) -> Result<Vec<u32>, String> {
        args.iter()
            .map(|token| resolve_index(token, self.mesh.points.len()))
            .collect()
    }

    fn finish(mut self) -> LoadedMesh {
        let n = self.mesh.points.len();
        for pending in std::mem::take(&mut self.pending) {
            if let Some(&bad) = pending.indices.iter().find(|&&i| i as usize >= n) {
                self.skip(
                    pending.line,
                    format!("index {} out of range ({n} vertices declared)", bad + 1),
                );
                continue;
            }
            let indices = pending.indices;
            match pending.element {
                Element::Polyline => self
                    .mesh
                    .edges
                    .extend(indices.windows(2).map(|w| [w[0], w[1]])),
                // Fan triangulation around the first corner.
                Element::Polygon => self
                    .mesh
                    .faces
                    .extend(indices[1..].windows(2).map(|w| [indices[0], w[0], w[1]])),
            }
        }
        self.warnings.sort_by_key(|w| w.line);

        if self.mesh.normals.len() != n {
            if !self.mesh.normals.is_empty() {
                tracing::debug!(
                    normals = self.mesh.normals.len(),
                    points = n,
                    "normal count does not match point count, recomputing from faces"
                );
            }
            self.mesh.normals = compute_vertex_normals(&self.mesh.points, &self.mesh.faces);
        }
        LoadedMesh {
            mesh: self.mesh,
            warnings: self.warnings,
        }
    }
}

fn parse_vec3(args: &[&str]) -> Result<Vec3, String> {
    if args.len() < 3 {
        return Err(format!("expected 3 coordinates, got {}", args.len()));
    }
    let mut xyz = [0.0f32; 3];
    for (slot, token) in xyz.iter_mut().zip(args) {
        *slot = token
            .parse()
            .map_err(|_| format!("invalid coordinate '{token}'"))?;
    }
    Ok(Vec3::from_array(xyz))
}

/// Converts a 1-based (or negative, relative) index token to zero-based.
/// Only relative indices are checked against `vertex_count` here.
fn resolve_index(token: &str, vertex_count: usize) -> Result<u32, String> {
    let head = token.split('/').next().unwrap_or(token);
    let raw: i64 = head
        .parse()
        .map_err(|_| format!("invalid index '{token}'"))?;
    let resolved = match raw {
        0 => return Err("index 0 is invalid, indices are 1-based".to_string()),
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };
    if resolved < 0 {
        return Err(format!(
            "index {raw} out of range ({vertex_count} vertices declared)"
        ));
    }
    u32::try_from(resolved).map_err(|_| format!("index {raw} exceeds the index range"))
}
