//! OBJ file loader for 3D models
//!
//! Reads positions, normals and texture coordinates; polygons are fan
//! triangulated. Faces without normals get smooth normals averaged from the
//! adjacent faces, and tangents are always generated for normal mapping.

use crate::render::{Mesh, Vertex};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Errors produced while reading an OBJ model
#[derive(Error, Debug)]
pub enum ObjError {
    /// Underlying read failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A numeric field could not be parsed
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What failed to parse
        message: String,
    },
    /// Structurally invalid content
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Wavefront OBJ reader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and return a mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let path = path.as_ref();
        log::debug!("Loading OBJ model from {:?}", path);

        let file = File::open(path)?;
        let mesh = Self::parse(BufReader::new(file))?;

        log::info!(
            "Loaded {:?}: {} vertices, {} triangles",
            path,
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        // Position index of every emitted vertex, for smooth-normal generation
        let mut source_position = Vec::new();
        let mut missing_normals = false;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();

            let Some(keyword) = parts.next() else {
                continue;
            };
            let fields: Vec<&str> = parts.collect();

            match keyword {
                "v" => positions.push(parse_floats::<3>(&fields, line_no, "vertex")?),
                "vn" => normals.push(parse_floats::<3>(&fields, line_no, "normal")?),
                "vt" => tex_coords.push(parse_floats::<2>(&fields, line_no, "tex coord")?),
                "f" => {
                    if fields.len() < 3 {
                        return Err(ObjError::InvalidFormat(format!(
                            "Face on line {line_no} has fewer than three vertices"
                        )));
                    }

                    let mut face = Vec::with_capacity(fields.len());
                    for corner in &fields {
                        let mut refs = corner.split('/');
                        let pos_idx = resolve_index(refs.next(), positions.len(), line_no)?
                            .ok_or_else(|| ObjError::InvalidFormat(format!(
                                "Face on line {line_no} is missing a position index"
                            )))?;
                        let tex_idx = resolve_index(refs.next(), tex_coords.len(), line_no)?;
                        let normal_idx = resolve_index(refs.next(), normals.len(), line_no)?;

                        let tex_coord = tex_idx.map_or([0.0, 0.0], |i| tex_coords[i]);
                        let normal = normal_idx.map_or_else(
                            || {
                                missing_normals = true;
                                [0.0, 0.0, 0.0]
                            },
                            |i| normals[i],
                        );

                        vertices.push(Vertex::new(positions[pos_idx], normal, tex_coord));
                        source_position.push(pos_idx);
                        face.push((vertices.len() - 1) as u32);
                    }

                    // Fan triangulation
                    for i in 1..(face.len() - 1) {
                        indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                _ => {
                    // Groups, materials and smoothing directives are ignored
                }
            }
        }

        if vertices.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ data".to_string()));
        }

        let mut mesh = Mesh::new(vertices, indices);
        if missing_normals {
            smooth_normals(&mut mesh, &source_position, positions.len());
        }
        mesh.compute_tangents();
        Ok(mesh)
    }
}

fn parse_floats<const N: usize>(fields: &[&str], line: usize, what: &str) -> Result<[f32; N], ObjError> {
    if fields.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("{what} needs {N} components"),
        });
    }

    let mut out = [0.0; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {what} component '{field}'"),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index into a 0-based one.
fn resolve_index(field: Option<&str>, count: usize, line: usize) -> Result<Option<usize>, ObjError> {
    let Some(field) = field.filter(|f| !f.is_empty()) else {
        return Ok(None);
    };

    let raw: i64 = field.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid index '{field}'"),
    })?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(count as i64 + r),
    };

    match resolved {
        Some(i) if i >= 0 && (i as usize) < count => Ok(Some(i as usize)),
        _ => Err(ObjError::InvalidFormat(format!(
            "Index {raw} on line {line} is out of bounds ({count} available)"
        ))),
    }
}

/// Area-weighted vertex normals shared across every vertex emitted from the
/// same OBJ position; only vertices that lacked a normal are overwritten.
fn smooth_normals(mesh: &mut Mesh, source_position: &[usize], position_count: usize) {
    let mut accum = vec![[0.0_f32; 3]; position_count];

    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = mesh.vertices[a].position;
        let pb = mesh.vertices[b].position;
        let pc = mesh.vertices[c].position;
        let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &v in &[a, b, c] {
            let slot = &mut accum[source_position[v]];
            slot[0] += n[0];
            slot[1] += n[1];
            slot[2] += n[2];
        }
    }

    for (vertex, &pos) in mesh.vertices.iter_mut().zip(source_position) {
        if vertex.normal != [0.0, 0.0, 0.0] {
            continue;
        }
        let n = accum[pos];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        vertex.normal = if len > 1e-12 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0, 0.0, 1.0]
        };
    }
}
