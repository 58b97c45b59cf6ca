//! Procedural shapes for the demonstration scene
//!
//! Every builder returns a CPU-side [`Mesh`] with normals, texture coordinates
//! and tangents filled in. Shapes are Z-up, matching the scene's camera.

use std::f32::consts::PI;

use deferred_engine::render::{HeightField, Mesh, Vertex};

/// Axis-aligned cube spanning -1..+1 on every axis
pub fn cube() -> Mesh {
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                n[0] + su * u[0] + sv * v[0],
                n[1] + su * u[1] + sv * v[1],
                n[2] + su * u[2] + sv * v[2],
            ];
            vertices.push(Vertex::new(position, n, [(su + 1.0) * 0.5, (sv + 1.0) * 0.5]));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    finish(vertices, indices)
}

/// Unit sphere with `slices` segments around Z and `slices / 2` rings
pub fn sphere(slices: u32) -> Mesh {
    let slices = slices.max(3);
    let stacks = (slices / 2).max(2);
    let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);

    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let theta = v * PI;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let phi = u * 2.0 * PI;
            let n = [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()];
            vertices.push(Vertex::new(n, n, [u, v]));
        }
    }

    let row = slices + 1;
    let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, b, b + 1, a, b + 1, a + 1]);
        }
    }

    finish(vertices, indices)
}

/// Flat grid in the XY plane spanning -`range`..+`range`, facing +Z.
///
/// Texture coordinates repeat once per cell.
pub fn plane(range: f32, cells: u32) -> Mesh {
    grid(range, cells.max(1), |_, _| 0.0, |_, _| [0.0, 0.0, 1.0])
}

/// Single -1..+1 square in the XY plane facing +Z
pub fn quad() -> Mesh {
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-1.0, -1.0, 0.0], n, [0.0, 0.0]),
        Vertex::new([1.0, -1.0, 0.0], n, [1.0, 0.0]),
        Vertex::new([1.0, 1.0, 0.0], n, [1.0, 1.0]),
        Vertex::new([-1.0, 1.0, 0.0], n, [0.0, 1.0]),
    ];
    finish(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Four inward-facing walls around the origin, open at floor and ceiling
pub fn room(half_width: f32, half_depth: f32, height: f32) -> Mesh {
    // (corner a, corner b, inward normal)
    let walls = [
        ([-half_width, half_depth], [half_width, half_depth], [0.0, -1.0, 0.0]),
        ([half_width, -half_depth], [-half_width, -half_depth], [0.0, 1.0, 0.0]),
        ([half_width, half_depth], [half_width, -half_depth], [-1.0, 0.0, 0.0]),
        ([-half_width, -half_depth], [-half_width, half_depth], [1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(16);
    let mut indices = Vec::with_capacity(24);
    for (a, b, n) in walls {
        let base = vertices.len() as u32;
        let length = (b[0] - a[0]).hypot(b[1] - a[1]);
        vertices.push(Vertex::new([b[0], b[1], 0.0], n, [0.0, 0.0]));
        vertices.push(Vertex::new([a[0], a[1], 0.0], n, [length, 0.0]));
        vertices.push(Vertex::new([a[0], a[1], height], n, [length, height]));
        vertices.push(Vertex::new([b[0], b[1], height], n, [0.0, height]));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    finish(vertices, indices)
}

/// Island terrain: flat around the origin, rolling hills further out, and
/// dropping below sea level past `radius`.
#[derive(Debug, Clone)]
pub struct ProceduralGround {
    /// Island radius
    pub radius: f32,
    /// Grid cells per side of the generated mesh
    pub resolution: u32,
    /// Noise octaves summed per height sample
    pub octaves: u32,
    /// Hills per unit distance in the first octave
    pub frequency: f32,
    /// Amplitude ratio between successive octaves
    pub roughness: f32,
    /// Height reached offshore
    pub low: f32,
    /// Tallest hill height
    pub high: f32,
}

impl Default for ProceduralGround {
    fn default() -> Self {
        Self {
            radius: 100.0,
            resolution: 400,
            octaves: 4,
            frequency: 0.03,
            roughness: 0.3,
            low: -3.0,
            high: 5.0,
        }
    }
}

impl ProceduralGround {
    /// Terrain mesh spanning twice the island radius
    pub fn mesh(&self) -> Mesh {
        let step = self.radius / self.resolution as f32;
        grid(
            self.radius * 2.0,
            self.resolution.max(1),
            |x, y| self.height_at(x, y),
            |x, y| {
                // Central differences
                let dx = self.height_at(x + step, y) - self.height_at(x - step, y);
                let dy = self.height_at(x, y + step) - self.height_at(x, y - step);
                let n = [-dx, -dy, 2.0 * step];
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                [n[0] / len, n[1] / len, n[2] / len]
            },
        )
    }

    fn hills(&self, x: f32, y: f32) -> f32 {
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut sum = 0.0;
        let mut norm = 0.0;
        for _ in 0..self.octaves.max(1) {
            sum += amplitude * value_noise(x * frequency, y * frequency);
            norm += amplitude;
            amplitude *= self.roughness;
            frequency *= 2.0;
        }
        sum / norm
    }
}

impl HeightField for ProceduralGround {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        let r = (x * x + y * y).sqrt() / self.radius;
        let shore = smoothstep(0.7, 1.0, r);
        let clearing = smoothstep(0.1, 0.3, r);
        let land = self.high * self.hills(x, y) * clearing;
        land * (1.0 - shore) + self.low * shore
    }
}

fn grid<H, N>(range: f32, cells: u32, height: H, normal: N) -> Mesh
where
    H: Fn(f32, f32) -> f32,
    N: Fn(f32, f32) -> [f32; 3],
{
    let row = cells + 1;
    let mut vertices = Vec::with_capacity((row * row) as usize);
    for i in 0..=cells {
        for j in 0..=cells {
            let x = -range + 2.0 * range * j as f32 / cells as f32;
            let y = -range + 2.0 * range * i as f32 / cells as f32;
            vertices.push(Vertex::new([x, y, height(x, y)], normal(x, y), [j as f32, i as f32]));
        }
    }

    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for i in 0..cells {
        for j in 0..cells {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, a + 1, b + 1, a, b + 1, b]);
        }
    }

    finish(vertices, indices)
}

fn finish(vertices: Vec<Vertex>, indices: Vec<u32>) -> Mesh {
    let mut mesh = Mesh::new(vertices, indices);
    mesh.compute_tangents();
    mesh
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Smoothly interpolated lattice noise in 0..1
fn value_noise(x: f32, y: f32) -> f32 {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let sx = fx * fx * (3.0 - 2.0 * fx);
    let sy = fy * fy * (3.0 - 2.0 * fy);
    let top = lattice(ix, iy) + sx * (lattice(ix + 1, iy) - lattice(ix, iy));
    let bottom = lattice(ix, iy + 1) + sx * (lattice(ix + 1, iy + 1) - lattice(ix, iy + 1));
    top + sy * (bottom - top)
}

fn lattice(x: i32, y: i32) -> f32 {
    let mut h = (x as u32).wrapping_mul(0x8da6_b343) ^ (y as u32).wrapping_mul(0xd816_3841);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    (h & 0x00ff_ffff) as f32 / 0x00ff_ffff as f32
}
