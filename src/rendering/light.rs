use crate::core::math::Vec3;
use crate::rendering::color;

/// Value written into the `light_type` field of a packed light record.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Tube = 2,
    Cone = 3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Directional {
        direction: Vec3,
    },
    Point {
        position: Vec3,
        inner_radius: f32,
        outer_radius: f32,
    },
    Cone {
        position: Vec3,
        direction: Vec3,
        inner_radius: f32,
        outer_radius: f32,
        cone_angle: f32,
        cone_inner_angle: f32,
        dual_cone: bool,
    },
    Tube {
        start: Vec3,
        end: Vec3,
        inner_radius: f32,
        outer_radius: f32,
    },
}

impl LightKind {
    /// Directional lights first, then point and cone lights, then tubes.
    pub fn sort_rank(&self) -> u8 {
        match self {
            LightKind::Directional { .. } => 0,
            LightKind::Point { .. } | LightKind::Cone { .. } => 1,
            LightKind::Tube { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub source_radius: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Light {
            color,
            intensity,
            source_radius: 0.0,
            kind: LightKind::Directional { direction },
        }
    }

    pub fn point(position: Vec3, inner_radius: f32, outer_radius: f32, color: Vec3, intensity: f32) -> Self {
        Light {
            color,
            intensity,
            source_radius: 0.0,
            kind: LightKind::Point {
                position,
                inner_radius,
                outer_radius,
            },
        }
    }

    pub fn tube(start: Vec3, end: Vec3, outer_radius: f32, color: Vec3, intensity: f32) -> Self {
        Light {
            color,
            intensity,
            source_radius: 0.0,
            kind: LightKind::Tube {
                start,
                end,
                inner_radius: 0.0,
                outer_radius,
            },
        }
    }

    pub fn with_source_radius(mut self, source_radius: f32) -> Self {
        self.source_radius = source_radius;
        self
    }

    pub fn light_type(&self) -> LightType {
        match self.kind {
            LightKind::Directional { .. } => LightType::Directional,
            LightKind::Point { .. } => LightType::Point,
            LightKind::Cone { .. } => LightType::Cone,
            LightKind::Tube { .. } => LightType::Tube,
        }
    }

    pub fn diffuse(&self) -> Vec3 {
        color::scale_intensity(&self.color, self.intensity)
    }
}

/// Stable sort by type rank. Lights of the same rank keep their input order,
/// which keeps the shadow casting directional light the same across frames.
pub fn sort_lights(lights: &[Light]) -> Vec<Light> {
    let mut sorted = lights.to_vec();
    sorted.sort_by_key(|light| light.kind.sort_rank());
    sorted
}
