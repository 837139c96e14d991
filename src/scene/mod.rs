pub mod animation;
pub mod color;
pub mod particles;

use crate::render::{OrbitController, OrbitOptions};
use color::{linear_from_hex, Rgb};
use glam::{EulerRot, Mat4, Quat, Vec3};
use particles::{ParticleBuffers, ParticleLayout};

/// Position, XYZ Euler rotation (radians) and scale of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0],
        scale: [1.0, 1.0, 1.0],
    };

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn uniform_scale(scale: f32) -> Self {
        Self {
            scale: [scale, scale, scale],
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotation;
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            Vec3::from(self.position),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The animated elements of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    CoreBody,
    InnerRing,
    OuterRing,
    Halo,
    ParticleField,
}

impl ElementId {
    #[cfg(test)]
    pub const ALL: [ElementId; 5] = [
        ElementId::CoreBody,
        ElementId::InnerRing,
        ElementId::OuterRing,
        ElementId::Halo,
        ElementId::ParticleField,
    ];
}

/// Procedural shape of a mesh part. Tessellated by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Along +Y, centered on the origin.
    Cylinder {
        radius: f32,
        height: f32,
        radial_segments: u32,
        height_segments: u32,
        open_ended: bool,
    },
    /// In the XY plane around the Z axis.
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    /// Disc in the XY plane facing +Z.
    Circle { radius: f32, segments: u32 },
    /// Flat annulus in the XY plane facing +Z.
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: u32,
    },
    Octahedron { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Metallic/roughness lit surface.
    Standard {
        color: Rgb,
        metalness: f32,
        roughness: f32,
        emissive: Rgb,
        emissive_intensity: f32,
        double_sided: bool,
    },
    /// Unlit, optionally translucent surface.
    Basic {
        color: Rgb,
        opacity: f32,
        double_sided: bool,
    },
}

impl Material {
    fn standard(color: &str, metalness: f32, roughness: f32) -> Self {
        Material::Standard {
            color: linear_from_hex(color),
            metalness,
            roughness,
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            double_sided: false,
        }
    }

    fn with_emissive(self, hex: &str, intensity: f32) -> Self {
        match self {
            Material::Standard {
                color,
                metalness,
                roughness,
                double_sided,
                ..
            } => Material::Standard {
                color,
                metalness,
                roughness,
                emissive: linear_from_hex(hex),
                emissive_intensity: intensity,
                double_sided,
            },
            basic => basic,
        }
    }

    fn double_sided(self) -> Self {
        match self {
            Material::Standard {
                color,
                metalness,
                roughness,
                emissive,
                emissive_intensity,
                ..
            } => Material::Standard {
                color,
                metalness,
                roughness,
                emissive,
                emissive_intensity,
                double_sided: true,
            },
            Material::Basic { color, opacity, .. } => Material::Basic {
                color,
                opacity,
                double_sided: true,
            },
        }
    }

    pub fn is_double_sided(&self) -> bool {
        match self {
            Material::Standard { double_sided, .. } | Material::Basic { double_sided, .. } => {
                *double_sided
            }
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Material::Basic { opacity, .. } if *opacity < 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPart {
    pub shape: Shape,
    pub material: Material,
    pub local: Transform,
}

/// A node driven by one update rule and drawn from its mesh parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub transform: Transform,
    pub parts: Vec<MeshPart>,
}

impl Element {
    fn new(parts: Vec<MeshPart>) -> Self {
        Self {
            transform: Transform::IDENTITY,
            parts,
        }
    }

    pub fn part_matrix(&self, part: &MeshPart) -> Mat4 {
        self.transform.matrix() * part.local.matrix()
    }
}

/// Point sprite appearance of the particle field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    /// World-space size, attenuated with depth.
    pub size: f32,
    pub opacity: f32,
}

pub struct ParticleField {
    pub transform: Transform,
    pub buffers: ParticleBuffers,
    pub style: PointStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Cone half angle in radians.
    pub angle: f32,
    pub penumbra: f32,
    pub intensity: f32,
    pub color: Rgb,
    pub decay: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

/// Hemispheric image-based term standing in for a night sky probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub sky: Rgb,
    pub ground: Rgb,
    pub intensity: f32,
}

impl Environment {
    pub fn night() -> Self {
        Self {
            sky: linear_from_hex("#2a3550"),
            ground: linear_from_hex("#07080f"),
            intensity: 1.0,
        }
    }
}

/// The single vault scene. Owns every element, the lights and the camera.
pub struct VaultScene {
    pub core: Element,
    pub inner_ring: Element,
    pub outer_ring: Element,
    pub halo: Element,
    pub particles: ParticleField,
    pub ambient: AmbientLight,
    pub spots: [SpotLight; 2],
    pub environment: Environment,
    pub camera: OrbitController,
}

impl VaultScene {
    pub fn new() -> Self {
        Self {
            core: build_core(),
            inner_ring: build_inner_ring(),
            outer_ring: build_outer_ring(),
            halo: build_halo(),
            particles: ParticleField {
                transform: Transform::IDENTITY,
                buffers: ParticleBuffers::generate(ParticleLayout::default()),
                style: PointStyle {
                    size: 0.045,
                    opacity: 0.85,
                },
            },
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.65,
            },
            spots: [
                SpotLight {
                    position: [6.0, 8.0, 8.0],
                    target: [0.0, 0.0, 0.0],
                    angle: 0.48,
                    penumbra: 0.9,
                    intensity: 2.8,
                    color: linear_from_hex("#5b9aff"),
                    decay: 2.0,
                },
                SpotLight {
                    position: [-6.0, -8.0, -6.0],
                    target: [0.0, 0.0, 0.0],
                    angle: 0.48,
                    penumbra: 0.6,
                    intensity: 1.4,
                    color: linear_from_hex("#1b2f6f"),
                    decay: 2.0,
                },
            ],
            environment: Environment::night(),
            camera: OrbitController::new([0.0, 0.0, 8.0], 32.0, OrbitOptions::vault()),
        }
    }

    #[cfg(test)]
    pub fn transform(&self, element: ElementId) -> &Transform {
        match element {
            ElementId::CoreBody => &self.core.transform,
            ElementId::InnerRing => &self.inner_ring.transform,
            ElementId::OuterRing => &self.outer_ring.transform,
            ElementId::Halo => &self.halo.transform,
            ElementId::ParticleField => &self.particles.transform,
        }
    }

    pub fn transform_mut(&mut self, element: ElementId) -> &mut Transform {
        match element {
            ElementId::CoreBody => &mut self.core.transform,
            ElementId::InnerRing => &mut self.inner_ring.transform,
            ElementId::OuterRing => &mut self.outer_ring.transform,
            ElementId::Halo => &mut self.halo.transform,
            ElementId::ParticleField => &mut self.particles.transform,
        }
    }

    /// Mesh elements in draw order: opaque first, translucent last.
    pub fn mesh_elements(&self) -> [&Element; 4] {
        [&self.core, &self.inner_ring, &self.outer_ring, &self.halo]
    }
}

impl Default for VaultScene {
    fn default() -> Self {
        Self::new()
    }
}

fn part(shape: Shape, material: Material, local: Transform) -> MeshPart {
    MeshPart {
        shape,
        material,
        local,
    }
}

fn build_core() -> Element {
    Element::new(vec![
        part(
            Shape::Cylinder {
                radius: 1.8,
                height: 0.6,
                radial_segments: 64,
                height_segments: 16,
                open_ended: false,
            },
            Material::standard("#121c2f", 0.95, 0.25),
            Transform::IDENTITY,
        ),
        part(
            Shape::Cylinder {
                radius: 1.2,
                height: 0.6,
                radial_segments: 6,
                height_segments: 1,
                open_ended: true,
            },
            Material::standard("#18284a", 0.9, 0.18)
                .with_emissive("#1a3a6d", 0.35)
                .double_sided(),
            Transform::IDENTITY,
        ),
        part(
            Shape::Circle {
                radius: 1.05,
                segments: 64,
            },
            Material::standard("#0f2038", 0.98, 0.12),
            Transform::at([0.0, 0.0, 0.24]),
        ),
        part(
            Shape::Torus {
                radius: 0.92,
                tube: 0.06,
                radial_segments: 32,
                tubular_segments: 128,
            },
            Material::standard("#4cd1ff", 1.0, 0.05).with_emissive("#1b4f73", 0.7),
            Transform::at([0.0, 0.0, 0.27]),
        ),
        part(
            Shape::Circle {
                radius: 1.02,
                segments: 64,
            },
            Material::standard("#0d1732", 0.92, 0.18),
            Transform::at([0.0, 0.0, -0.24]),
        ),
        part(
            Shape::Octahedron { radius: 0.38 },
            Material::standard("#73f6ff", 0.85, 0.28).with_emissive("#24548d", 0.6),
            Transform::at([0.0, 0.0, 0.35]),
        ),
    ])
}

fn build_inner_ring() -> Element {
    Element::new(vec![part(
        Shape::Torus {
            radius: 2.2,
            tube: 0.05,
            radial_segments: 32,
            tubular_segments: 256,
        },
        Material::standard("#3ba3ff", 0.9, 0.1).with_emissive("#0e375f", 0.65),
        Transform::uniform_scale(1.3),
    )])
}

fn build_outer_ring() -> Element {
    Element::new(vec![part(
        Shape::Torus {
            radius: 3.1,
            tube: 0.08,
            radial_segments: 32,
            tubular_segments: 256,
        },
        Material::standard("#06b6d4", 0.9, 0.15).with_emissive("#0a2a42", 0.55),
        Transform::uniform_scale(1.45),
    )])
}

fn build_halo() -> Element {
    Element::new(vec![part(
        Shape::Ring {
            inner_radius: 2.4,
            outer_radius: 2.7,
            segments: 128,
        },
        Material::Basic {
            color: linear_from_hex("#70f5ff"),
            opacity: 0.35,
            double_sided: true,
        },
        Transform::IDENTITY,
    )])
}
