use crate::core::math::{Mat4, Vec3};
use crate::rendering::device::{GraphicsDevice, MeshHandle};
use log::{debug, error, warn};
use std::f32::consts::PI;

const MIN_RINGS: u32 = 2;
const MIN_SEGMENTS: u32 = 3;
// Keeps every generated vertex addressable by a u16 index.
const MAX_TESSELLATION: u32 = 255;

/// Position-only indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |triangle| {
            [
                self.positions[triangle[0] as usize],
                self.positions[triangle[1] as usize],
                self.positions[triangle[2] as usize],
            ]
        })
    }
}

pub struct MeshUtilities;

impl MeshUtilities {
    /// Unit UV sphere. The poles are single shared vertices closed with triangle fans.
    pub fn generate_sphere(rings: u32, segments: u32) -> MeshData {
        let rings = rings.clamp(MIN_RINGS, MAX_TESSELLATION);
        let segments = segments.clamp(MIN_SEGMENTS, MAX_TESSELLATION);

        let mut positions = Vec::with_capacity(((rings - 1) * segments + 2) as usize);
        positions.push(Vec3::new(0.0, 1.0, 0.0));

        for ring in 1..rings {
            let phi = PI * ring as f32 / rings as f32;
            let (ring_radius, y) = (phi.sin(), phi.cos());

            for segment in 0..segments {
                let theta = 2.0 * PI * segment as f32 / segments as f32;
                positions.push(Vec3::new(
                    ring_radius * theta.cos(),
                    y,
                    ring_radius * theta.sin(),
                ));
            }
        }

        let south_pole = positions.len() as u16;
        positions.push(Vec3::new(0.0, -1.0, 0.0));

        let ring_vertex = |ring: u32, segment: u32| -> u16 {
            (1 + (ring - 1) * segments + segment % segments) as u16
        };

        let mut indices = Vec::with_capacity((6 * segments * (rings - 1)) as usize);

        for segment in 0..segments {
            indices.extend_from_slice(&[0, ring_vertex(1, segment + 1), ring_vertex(1, segment)]);
        }

        for ring in 1..rings - 1 {
            for segment in 0..segments {
                let upper = ring_vertex(ring, segment);
                let upper_next = ring_vertex(ring, segment + 1);
                let lower = ring_vertex(ring + 1, segment);
                let lower_next = ring_vertex(ring + 1, segment + 1);

                indices.extend_from_slice(&[upper, upper_next, lower_next]);
                indices.extend_from_slice(&[upper, lower_next, lower]);
            }
        }

        for segment in 0..segments {
            indices.extend_from_slice(&[
                ring_vertex(rings - 1, segment),
                ring_vertex(rings - 1, segment + 1),
                south_pole,
            ]);
        }

        MeshData { positions, indices }
    }

    /// Unit radius cylinder running from z = 0 to z = 1 with capped ends.
    pub fn generate_cylinder(segments: u32) -> MeshData {
        let segments = segments.clamp(MIN_SEGMENTS, MAX_TESSELLATION);

        let mut positions = Vec::with_capacity((2 * segments + 2) as usize);
        positions.push(Vec3::new(0.0, 0.0, 0.0));
        positions.push(Vec3::new(0.0, 0.0, 1.0));

        for z in [0.0, 1.0] {
            for segment in 0..segments {
                let theta = 2.0 * PI * segment as f32 / segments as f32;
                positions.push(Vec3::new(theta.cos(), theta.sin(), z));
            }
        }

        let bottom = |segment: u32| -> u16 { (2 + segment % segments) as u16 };
        let top = |segment: u32| -> u16 { (2 + segments + segment % segments) as u16 };

        let mut indices = Vec::with_capacity((12 * segments) as usize);

        for segment in 0..segments {
            indices.extend_from_slice(&[bottom(segment), bottom(segment + 1), top(segment + 1)]);
            indices.extend_from_slice(&[bottom(segment), top(segment + 1), top(segment)]);
            indices.extend_from_slice(&[0, bottom(segment + 1), bottom(segment)]);
            indices.extend_from_slice(&[1, top(segment), top(segment + 1)]);
        }

        MeshData { positions, indices }
    }
}

/// A proxy mesh uploaded once at init and drawn once per light.
///
/// When the upload failed the volume stays invalid: drawing it does nothing
/// and reports a warning the first time.
#[derive(Debug)]
pub struct LightVolume {
    label: String,
    handle: Option<MeshHandle>,
    triangle_count: usize,
    warned: bool,
}

impl LightVolume {
    pub fn upload<D: GraphicsDevice>(device: &mut D, label: &str, data: &MeshData) -> Self {
        let handle = match device.create_mesh(label, data) {
            Ok(handle) => {
                debug!(
                    "Uploaded light volume '{}' with {} vertices and {} triangles.",
                    label,
                    data.vertex_count(),
                    data.triangle_count()
                );
                Some(handle)
            }
            Err(e) => {
                error!("Failed to upload light volume '{}': {}", label, e);
                None
            }
        };

        LightVolume {
            label: label.to_string(),
            handle,
            triangle_count: data.triangle_count(),
            warned: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Returns `false` if nothing was drawn.
    pub fn draw<D: GraphicsDevice>(&mut self, device: &mut D, model: &Mat4) -> bool {
        match self.handle {
            Some(handle) => {
                device.draw_mesh(handle, model);
                true
            }
            None => {
                if !self.warned {
                    warn!(
                        "Light volume '{}' is not available. Lights using it will not be drawn.",
                        self.label
                    );
                    self.warned = true;
                }
                false
            }
        }
    }

    pub fn destroy<D: GraphicsDevice>(self, device: &mut D) {
        if let Some(handle) = self.handle {
            device.destroy_mesh(handle);
        }
    }
}
