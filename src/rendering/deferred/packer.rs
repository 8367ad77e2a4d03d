use crate::core::math::{self, Mat4, Vec3};
use crate::core::{LightingMode, ScreenSize, ShadowQuality};
use crate::rendering::buffer::{UniformAligner, UniformBufferBuilder};
use crate::rendering::deferred::uniforms::{mat4, vec3, DeferredGlobalData, DeferredLightData};
use crate::rendering::light::{Light, LightKind};
use crate::rendering::profile::LightingProfile;
use log::trace;
use nalgebra_glm as glm;

/// Padding applied to light volumes so the coarse proxy mesh never clips the lit area.
pub const VOLUME_PADDING: f32 = 1.05;

pub const SHADOW_CASCADES: usize = 4;

/// Cascaded shadow map transforms for the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowState {
    pub light_view_matrix: Mat4,
    pub cascade_projections: [Mat4; SHADOW_CASCADES],
    /// Very near, near, middle and far cascade split distances.
    pub cascade_distances: [f32; SHADOW_CASCADES],
    pub render_view_matrix: Mat4,
}

pub struct PackInput<'a> {
    pub view_matrix: Mat4,
    pub screen_size: ScreenSize,
    pub shadow_quality: ShadowQuality,
    pub shadows: Option<&'a ShadowState>,
    pub lighting_mode: LightingMode,
    pub profile: &'a LightingProfile,
    pub alignment: usize,
}

impl<'a> PackInput<'a> {
    fn shadows(&self) -> Option<&'a ShadowState> {
        if self.shadow_quality.enabled() {
            self.shadows
        } else {
            None
        }
    }

    fn volume_radius(&self, radius: f32) -> f32 {
        match self.lighting_mode {
            LightingMode::Cockpit => self.profile.cockpit_light_radius_modifier.apply(radius),
            LightingMode::Normal => radius,
        }
    }
}

/// How a light reaches the screen.
///
/// Volume transforms carry translation and orientation only. The record's
/// `scale` sizes the unit mesh in the vertex stage.
#[derive(Debug, Clone, PartialEq)]
pub enum LightDraw {
    FullScreen,
    Sphere { position: Vec3 },
    Cylinder { position: Vec3, orientation: Mat4 },
}

impl LightDraw {
    pub fn model_matrix(&self) -> Option<Mat4> {
        match self {
            LightDraw::FullScreen => None,
            LightDraw::Sphere { position } => Some(glm::translation(position)),
            LightDraw::Cylinder {
                position,
                orientation,
            } => Some(glm::translation(position) * orientation),
        }
    }
}

/// Index of the shadow and scattering light in the sorted frame list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalLight {
    pub index: usize,
    pub diffuse: Vec3,
}

/// The frame's light buffer contents. Borrows the sorted light list, so the
/// global light reference cannot outlive the frame.
#[derive(Debug)]
pub struct PackedLights<'a> {
    lights: &'a [Light],
    header: DeferredGlobalData,
    records: Vec<DeferredLightData>,
    draws: Vec<LightDraw>,
    aligner: UniformAligner,
    global_light: Option<GlobalLight>,
    shadows_enabled: bool,
}

impl<'a> PackedLights<'a> {
    pub fn header(&self) -> &DeferredGlobalData {
        &self.header
    }

    pub fn records(&self) -> &[DeferredLightData] {
        &self.records
    }

    pub fn draws(&self) -> &[LightDraw] {
        &self.draws
    }

    pub fn aligner(&self) -> &UniformAligner {
        &self.aligner
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    pub fn global_light(&self) -> Option<GlobalLight> {
        self.global_light
    }

    pub fn global_light_source(&self) -> Option<&'a Light> {
        self.global_light
            .and_then(|global| self.lights.get(global.index))
    }

    /// World space direction of the global light, zero when the frame has none.
    pub fn global_light_direction(&self) -> Vec3 {
        match self.global_light_source().map(|light| &light.kind) {
            Some(LightKind::Directional { direction }) => *direction,
            _ => Vec3::zeros(),
        }
    }

    pub fn global_light_diffuse(&self) -> Vec3 {
        self.global_light
            .map_or_else(Vec3::zeros, |global| global.diffuse)
    }

    pub fn buffer_size(&self) -> usize {
        self.aligner.buffer_size(self.records.len())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut builder = UniformBufferBuilder::<DeferredGlobalData, DeferredLightData>::new(
            self.aligner.alignment(),
            &self.header,
        );
        self.records.iter().for_each(|record| {
            builder.push(record);
        });
        builder.into_bytes()
    }
}

/// Builds the frame's light buffer from lights already ordered by [`sort_lights`].
///
/// [`sort_lights`]: crate::rendering::light::sort_lights
pub fn pack<'a>(sorted: &'a [Light], input: &PackInput) -> PackedLights<'a> {
    let aligner =
        UniformAligner::for_blocks::<DeferredGlobalData, DeferredLightData>(input.alignment);

    let mut header = DeferredGlobalData {
        inv_screen_width: 1.0 / input.screen_size.width as f32,
        inv_screen_height: 1.0 / input.screen_size.height as f32,
        ..Default::default()
    };

    let shadows = input.shadows();
    if let Some(shadows) = shadows {
        header.shadow_mv_matrix = mat4(&shadows.light_view_matrix);
        header.shadow_proj_matrix_0 = mat4(&shadows.cascade_projections[0]);
        header.shadow_proj_matrix_1 = mat4(&shadows.cascade_projections[1]);
        header.shadow_proj_matrix_2 = mat4(&shadows.cascade_projections[2]);
        header.shadow_proj_matrix_3 = mat4(&shadows.cascade_projections[3]);
        header.very_near_dist = shadows.cascade_distances[0];
        header.near_dist = shadows.cascade_distances[1];
        header.mid_dist = shadows.cascade_distances[2];
        header.far_dist = shadows.cascade_distances[3];
        header.inv_view_matrix = mat4(&math::inverse(&shadows.render_view_matrix));
    }

    let mut records = Vec::with_capacity(sorted.len());
    let mut draws = Vec::with_capacity(sorted.len());
    let mut global_light = None;

    for (index, light) in sorted.iter().enumerate() {
        let diffuse = light.diffuse();

        let mut record = DeferredLightData {
            diffuse_light_color: vec3(&diffuse),
            light_type: light.light_type() as i32,
            enable_shadows: 0,
            source_radius: light.source_radius,
            ..Default::default()
        };

        let draw = match &light.kind {
            LightKind::Directional { direction } => {
                if global_light.is_none() {
                    if shadows.is_some() {
                        record.enable_shadows = 1;
                    }
                    global_light = Some(GlobalLight { index, diffuse });
                }

                let view_dir = input.view_matrix * glm::vec4(-direction.x, -direction.y, -direction.z, 0.0);
                record.light_dir = vec3(&glm::vec3(view_dir.x, view_dir.y, view_dir.z));

                LightDraw::FullScreen
            }
            LightKind::Point {
                position,
                inner_radius,
                outer_radius,
            } => {
                let radius = input.volume_radius(inner_radius.max(*outer_radius));
                apply_sphere_volume(&mut record, radius);

                LightDraw::Sphere {
                    position: *position,
                }
            }
            LightKind::Cone {
                position,
                direction,
                inner_radius,
                outer_radius,
                cone_angle,
                cone_inner_angle,
                dual_cone,
            } => {
                record.dual_cone = if *dual_cone { 1.0 } else { 0.0 };
                record.cone_angle = *cone_angle;
                record.cone_inner_angle = *cone_inner_angle;
                record.cone_dir = vec3(direction);

                let radius = input.volume_radius(inner_radius.max(*outer_radius));
                apply_sphere_volume(&mut record, radius);

                LightDraw::Sphere {
                    position: *position,
                }
            }
            LightKind::Tube {
                start,
                end,
                outer_radius,
                ..
            } => {
                let radius = input.volume_radius(*outer_radius);
                let axis = start - end;
                let length = glm::length(&axis) + 2.0 * radius;

                record.light_radius = radius;
                record.scale = vec3(&Vec3::new(
                    radius * VOLUME_PADDING,
                    radius * VOLUME_PADDING,
                    length,
                ));

                // The unit cylinder starts at its origin, so the extended volume
                // begins one radius behind the tube end.
                let position = if glm::length(&axis) > f32::EPSILON {
                    end - glm::normalize(&axis) * radius
                } else {
                    *end
                };

                LightDraw::Cylinder {
                    position,
                    orientation: math::orientation_from_forward(&axis),
                }
            }
        };

        trace!("Packed light {} as {:?}", index, light.light_type());

        records.push(record);
        draws.push(draw);
    }

    PackedLights {
        lights: sorted,
        header,
        records,
        draws,
        aligner,
        global_light,
        shadows_enabled: shadows.is_some(),
    }
}

fn apply_sphere_volume(record: &mut DeferredLightData, radius: f32) {
    record.light_radius = radius;
    record.scale = vec3(&Vec3::new(
        radius * VOLUME_PADDING,
        radius * VOLUME_PADDING,
        radius * VOLUME_PADDING,
    ));
}
