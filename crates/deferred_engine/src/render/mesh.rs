//! Mesh representation for 3D models
//!
//! Pure geometry containers. GPU upload happens through
//! [`GraphicsDevice::create_mesh`](crate::render::GraphicsDevice::create_mesh),
//! which binds the four vertex attributes at the locations the shaders
//! expect (see [`VertexAttribute`]).

use bytemuck::{Pod, Zeroable};

/// 3D vertex data structure for rendering
///
/// `#[repr(C)]` keeps the layout stable for direct buffer uploads: eleven
/// tightly packed `f32`s, 44 bytes per vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],

    /// Tangent vector for normal mapping
    pub tangent: [f32; 3],
}

impl Vertex {
    /// Create a new vertex with a zero tangent
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            tangent: [0.0, 0.0, 0.0],
        }
    }

    /// Create a new vertex with tangent
    pub fn new_with_tangent(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2], tangent: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            tangent,
        }
    }
}

/// Shader-visible vertex attributes, in binding-location order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttribute {
    /// `vertex`, location 0
    Position,
    /// `vertexNormal`, location 1
    Normal,
    /// `vertexTexture`, location 2
    TexCoord,
    /// `vertexTangent`, location 3
    Tangent,
}

impl VertexAttribute {
    /// All attributes in location order
    pub const ALL: [Self; 4] = [Self::Position, Self::Normal, Self::TexCoord, Self::Tangent];

    /// Binding location
    pub const fn location(self) -> u32 {
        self as u32
    }

    /// Attribute name as declared in the vertex shaders
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "vertex",
            Self::Normal => "vertexNormal",
            Self::TexCoord => "vertexTexture",
            Self::Tangent => "vertexTangent",
        }
    }

    /// Number of `f32` components
    pub const fn components(self) -> i32 {
        match self {
            Self::TexCoord => 2,
            _ => 3,
        }
    }

    /// Byte offset inside [`Vertex`]
    pub const fn offset(self) -> i32 {
        match self {
            Self::Position => 0,
            Self::Normal => 12,
            Self::TexCoord => 24,
            Self::Tangent => 32,
        }
    }
}

/// 3D mesh containing vertices and triangle indices
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Index data for triangles
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recompute per-vertex tangents from positions and texture coordinates.
    ///
    /// Triangle tangents are accumulated per vertex, then Gram-Schmidt
    /// orthogonalised against the normal. Vertices whose UVs are degenerate
    /// receive an arbitrary unit vector perpendicular to their normal.
    pub fn compute_tangents(&mut self) {
        let mut accum = vec![[0.0_f32; 3]; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (va, vb, vc) = (self.vertices[a], self.vertices[b], self.vertices[c]);

            let e1 = sub(vb.position, va.position);
            let e2 = sub(vc.position, va.position);
            let du1 = vb.tex_coord[0] - va.tex_coord[0];
            let dv1 = vb.tex_coord[1] - va.tex_coord[1];
            let du2 = vc.tex_coord[0] - va.tex_coord[0];
            let dv2 = vc.tex_coord[1] - va.tex_coord[1];

            let det = du1 * dv2 - du2 * dv1;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let t = [
                (e1[0] * dv2 - e2[0] * dv1) * r,
                (e1[1] * dv2 - e2[1] * dv1) * r,
                (e1[2] * dv2 - e2[2] * dv1) * r,
            ];
            for &i in &[a, b, c] {
                accum[i] = add(accum[i], t);
            }
        }

        for (vertex, t) in self.vertices.iter_mut().zip(accum) {
            let n = vertex.normal;
            let projected = sub(t, scale(n, dot(n, t)));
            vertex.tangent = normalize(projected).unwrap_or_else(|| perpendicular(n));
        }
    }
}

fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(a: [f32; 3]) -> Option<[f32; 3]> {
    let len = dot(a, a).sqrt();
    (len > 1e-6).then(|| scale(a, 1.0 / len))
}

fn perpendicular(n: [f32; 3]) -> [f32; 3] {
    // Cross with whichever axis is least aligned with n
    let axis = if n[0].abs() < 0.9 { [1.0, 0.0, 0.0] } else { [0.0, 1.0, 0.0] };
    let c = [
        n[1] * axis[2] - n[2] * axis[1],
        n[2] * axis[0] - n[0] * axis[2],
        n[0] * axis[1] - n[1] * axis[0],
    ];
    normalize(c).unwrap_or([1.0, 0.0, 0.0])
}
