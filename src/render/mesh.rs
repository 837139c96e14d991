use crate::scene::Shape;
use std::f32::consts::TAU;
use wgpu::util::DeviceExt;

/// Indexed triangle list with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[cfg(test)]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[cfg(test)]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push(&mut self, position: [f32; 3], normal: [f32; 3]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        index
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Interleaved position + normal vertices for upload.
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(self.normals.iter())
            .map(|(position, normal)| MeshVertex {
                position: *position,
                normal: *normal,
            })
            .collect()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub fn tessellate(shape: &Shape) -> MeshData {
    match *shape {
        Shape::Cylinder {
            radius,
            height,
            radial_segments,
            height_segments,
            open_ended,
        } => cylinder(radius, height, radial_segments, height_segments, open_ended),
        Shape::Torus {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        } => torus(radius, tube, radial_segments, tubular_segments),
        Shape::Circle { radius, segments } => circle(radius, segments),
        Shape::Ring {
            inner_radius,
            outer_radius,
            segments,
        } => ring(inner_radius, outer_radius, segments),
        Shape::Octahedron { radius } => octahedron(radius),
    }
}

fn cylinder(radius: f32, height: f32, radial: u32, rows: u32, open_ended: bool) -> MeshData {
    let radial = radial.max(3);
    let rows = rows.max(1);
    let half = height * 0.5;
    let mut mesh = MeshData::default();

    let mut grid = Vec::with_capacity((rows + 1) as usize);
    for y in 0..=rows {
        let v = y as f32 / rows as f32;
        let mut row = Vec::with_capacity((radial + 1) as usize);
        for x in 0..=radial {
            let theta = x as f32 / radial as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            row.push(mesh.push(
                [radius * sin, half - v * height, radius * cos],
                [sin, 0.0, cos],
            ));
        }
        grid.push(row);
    }
    for x in 0..radial as usize {
        for y in 0..rows as usize {
            let a = grid[y][x];
            let b = grid[y + 1][x];
            let c = grid[y + 1][x + 1];
            let d = grid[y][x + 1];
            mesh.triangle(a, b, d);
            mesh.triangle(b, c, d);
        }
    }

    if !open_ended {
        cylinder_cap(&mut mesh, radius, half, radial, true);
        cylinder_cap(&mut mesh, radius, half, radial, false);
    }
    mesh
}

fn cylinder_cap(mesh: &mut MeshData, radius: f32, half: f32, radial: u32, top: bool) {
    let sign = if top { 1.0 } else { -1.0 };
    let normal = [0.0, sign, 0.0];

    let center_start = mesh.positions.len() as u32;
    for _ in 0..radial {
        mesh.push([0.0, half * sign, 0.0], normal);
    }
    let rim_start = mesh.positions.len() as u32;
    for x in 0..=radial {
        let theta = x as f32 / radial as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        mesh.push([radius * sin, half * sign, radius * cos], normal);
    }
    for x in 0..radial {
        let center = center_start + x;
        let rim = rim_start + x;
        if top {
            mesh.triangle(rim, rim + 1, center);
        } else {
            mesh.triangle(rim + 1, rim, center);
        }
    }
}

fn torus(radius: f32, tube: f32, radial: u32, tubular: u32) -> MeshData {
    let radial = radial.max(3);
    let tubular = tubular.max(3);
    let mut mesh = MeshData::default();

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        let (sin_v, cos_v) = v.sin_cos();
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let (sin_u, cos_u) = u.sin_cos();
            let ring = radius + tube * cos_v;
            let position = [ring * cos_u, ring * sin_u, tube * sin_v];
            mesh.push(position, [cos_v * cos_u, cos_v * sin_u, sin_v]);
        }
    }

    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.triangle(a, b, d);
            mesh.triangle(b, c, d);
        }
    }
    mesh
}

fn circle(radius: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let normal = [0.0, 0.0, 1.0];
    let mut mesh = MeshData::default();
    mesh.push([0.0, 0.0, 0.0], normal);
    for s in 0..=segments {
        let theta = s as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        mesh.push([radius * cos, radius * sin, 0.0], normal);
    }
    for i in 1..=segments {
        mesh.triangle(i, i + 1, 0);
    }
    mesh
}

fn ring(inner: f32, outer: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let normal = [0.0, 0.0, 1.0];
    let mut mesh = MeshData::default();
    for radius in [inner, outer] {
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.push([radius * cos, radius * sin, 0.0], normal);
        }
    }
    for i in 0..segments {
        let a = i;
        let b = i + segments + 1;
        let c = i + segments + 2;
        let d = i + 1;
        mesh.triangle(a, b, d);
        mesh.triangle(b, c, d);
    }
    mesh
}

/// Flat shaded: every face gets its own three vertices.
fn octahedron(radius: f32) -> MeshData {
    const CORNERS: [[f32; 3]; 6] = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ];
    const FACES: [[usize; 3]; 8] = [
        [0, 2, 4],
        [0, 4, 3],
        [0, 3, 5],
        [0, 5, 2],
        [1, 2, 5],
        [1, 5, 3],
        [1, 3, 4],
        [1, 4, 2],
    ];

    let mut mesh = MeshData::default();
    for face in FACES {
        let [a, b, c] = face.map(|corner| glam::Vec3::from(CORNERS[corner]) * radius);
        let normal = (b - a).cross(c - a).normalize_or_zero().to_array();
        let ia = mesh.push(a.to_array(), normal);
        let ib = mesh.push(b.to_array(), normal);
        let ic = mesh.push(c.to_array(), normal);
        mesh.triangle(ia, ib, ic);
    }
    mesh
}

/// GPU-resident copy of a [`MeshData`]. Buffers are released on drop.
pub struct MeshResource {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshResource {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("vault.{label}.vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("vault.{label}.indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tessellate;
    use crate::scene::{Shape, VaultScene};

    fn assert_well_formed(shape: &Shape) {
        let mesh = tessellate(shape);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh
            .indices
            .iter()
            .all(|index| (*index as usize) < mesh.vertex_count()));
        for normal in &mesh.normals {
            let length = glam::Vec3::from(*normal).length();
            assert!((length - 1.0).abs() < 1e-4, "normal length {}", length);
        }
    }

    #[test]
    fn every_vault_shape_is_well_formed() {
        let scene = VaultScene::new();
        for element in scene.mesh_elements() {
            for part in &element.parts {
                assert_well_formed(&part.shape);
            }
        }
    }

    #[test]
    fn torus_counts() {
        let mesh = tessellate(&Shape::Torus {
            radius: 2.2,
            tube: 0.05,
            radial_segments: 32,
            tubular_segments: 256,
        });
        assert_eq!(mesh.vertex_count(), 33 * 257);
        assert_eq!(mesh.triangle_count(), 2 * 32 * 256);
        for position in &mesh.positions {
            let [x, y, z] = *position;
            let ring = (x * x + y * y).sqrt() - 2.2;
            assert!(((ring * ring + z * z).sqrt() - 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn capped_and_open_cylinder_counts() {
        let capped = tessellate(&Shape::Cylinder {
            radius: 1.8,
            height: 0.6,
            radial_segments: 64,
            height_segments: 16,
            open_ended: false,
        });
        assert_eq!(capped.vertex_count(), 65 * 17 + 2 * (64 + 65));
        assert_eq!(capped.triangle_count(), 2 * 64 * 16 + 2 * 64);
        assert!(capped
            .positions
            .iter()
            .all(|p| p[1] >= -0.3 - 1e-6 && p[1] <= 0.3 + 1e-6));

        let open = tessellate(&Shape::Cylinder {
            radius: 1.2,
            height: 0.6,
            radial_segments: 6,
            height_segments: 1,
            open_ended: true,
        });
        assert_eq!(open.vertex_count(), 7 * 2);
        assert_eq!(open.triangle_count(), 12);
    }

    #[test]
    fn halo_ring_spans_its_radii() {
        let mesh = tessellate(&Shape::Ring {
            inner_radius: 2.4,
            outer_radius: 2.7,
            segments: 128,
        });
        assert_eq!(mesh.vertex_count(), 2 * 129);
        assert_eq!(mesh.triangle_count(), 256);
        for position in &mesh.positions {
            let r = (position[0] * position[0] + position[1] * position[1]).sqrt();
            assert!(r > 2.4 - 1e-4 && r < 2.7 + 1e-4);
            assert_eq!(position[2], 0.0);
        }
    }

    #[test]
    fn octahedron_faces_point_outward() {
        let mesh = tessellate(&Shape::Octahedron { radius: 0.38 });
        assert_eq!(mesh.vertex_count(), 24);
        for triangle in mesh.indices.chunks(3) {
            let centroid = triangle
                .iter()
                .map(|i| glam::Vec3::from(mesh.positions[*i as usize]))
                .sum::<glam::Vec3>();
            let normal = glam::Vec3::from(mesh.normals[triangle[0] as usize]);
            assert!(centroid.dot(normal) > 0.0);
        }
    }

    #[test]
    fn circle_fans_from_center() {
        let mesh = tessellate(&Shape::Circle {
            radius: 1.05,
            segments: 64,
        });
        assert_eq!(mesh.vertex_count(), 66);
        assert_eq!(mesh.triangle_count(), 64);
        assert!(mesh.indices.chunks(3).all(|tri| tri[2] == 0));
    }
}
