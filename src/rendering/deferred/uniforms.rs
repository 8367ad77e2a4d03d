//! std140 uniform blocks shared with the lighting and post-process shaders.

use crate::core::math::{Mat4, Vec3};
use crevice::std140::AsStd140;

pub type Std140Vec3 = mint::Vector3<f32>;
pub type Std140Mat4 = mint::ColumnMatrix4<f32>;

pub fn vec3(value: &Vec3) -> Std140Vec3 {
    (*value).into()
}

pub fn mat4(value: &Mat4) -> Std140Mat4 {
    (*value).into()
}

/// Header of the per-frame light buffer, bound once at offset zero.
#[derive(AsStd140, Debug, Clone, Copy, PartialEq)]
pub struct DeferredGlobalData {
    pub shadow_mv_matrix: Std140Mat4,
    pub shadow_proj_matrix_0: Std140Mat4,
    pub shadow_proj_matrix_1: Std140Mat4,
    pub shadow_proj_matrix_2: Std140Mat4,
    pub shadow_proj_matrix_3: Std140Mat4,
    pub inv_view_matrix: Std140Mat4,
    pub very_near_dist: f32,
    pub near_dist: f32,
    pub mid_dist: f32,
    pub far_dist: f32,
    pub inv_screen_width: f32,
    pub inv_screen_height: f32,
}

impl Default for DeferredGlobalData {
    fn default() -> Self {
        let identity = mat4(&Mat4::identity());
        DeferredGlobalData {
            shadow_mv_matrix: identity,
            shadow_proj_matrix_0: identity,
            shadow_proj_matrix_1: identity,
            shadow_proj_matrix_2: identity,
            shadow_proj_matrix_3: identity,
            inv_view_matrix: identity,
            very_near_dist: 0.0,
            near_dist: 0.0,
            mid_dist: 0.0,
            far_dist: 0.0,
            inv_screen_width: 0.0,
            inv_screen_height: 0.0,
        }
    }
}

/// One record per light, bound as a range of the light buffer before its draw.
#[derive(AsStd140, Debug, Clone, Copy, PartialEq)]
pub struct DeferredLightData {
    pub diffuse_light_color: Std140Vec3,
    pub cone_angle: f32,
    pub light_dir: Std140Vec3,
    pub cone_inner_angle: f32,
    pub cone_dir: Std140Vec3,
    pub dual_cone: f32,
    pub scale: Std140Vec3,
    pub light_radius: f32,
    pub light_type: i32,
    pub enable_shadows: i32,
    pub source_radius: f32,
}

impl Default for DeferredLightData {
    fn default() -> Self {
        let zero = vec3(&Vec3::zeros());
        DeferredLightData {
            diffuse_light_color: zero,
            cone_angle: 0.0,
            light_dir: zero,
            cone_inner_angle: 0.0,
            cone_dir: zero,
            dual_cone: 0.0,
            scale: zero,
            light_radius: 0.0,
            light_type: 0,
            enable_shadows: 0,
            source_radius: 0.0,
        }
    }
}

#[derive(AsStd140, Debug, Clone, Copy, PartialEq)]
pub struct MsaaData {
    pub samples: i32,
    pub fov: f32,
}

#[derive(AsStd140, Debug, Clone, Copy, PartialEq)]
pub struct FogData {
    pub fog_color: Std140Vec3,
    pub fog_start: f32,
    pub fog_density: f32,
    pub z_near: f32,
    pub z_far: f32,
}

#[derive(AsStd140, Debug, Clone, Copy, PartialEq)]
pub struct VolumetricFogData {
    pub p_inv: Std140Mat4,
    pub v_inv: Std140Mat4,
    pub camera_pos: Std140Vec3,
    pub z_near: f32,
    pub global_light_direction: Std140Vec3,
    pub z_far: f32,
    pub global_light_diffuse: Std140Vec3,
    pub step_size: f32,
    pub neb_pos: Std140Vec3,
    pub global_step_alpha: f32,
    pub neb_size: Std140Vec3,
    pub alpha_limit: f32,
    pub noise_color: Std140Vec3,
    pub emissive_spread_factor: f32,
    pub emissive_intensity: f32,
    pub emissive_falloff: f32,
    pub henyey_greenstein_coeff: f32,
    pub directional_light_sample_steps: i32,
    pub directional_light_step_size: f32,
    pub noise_color_scale_1: f32,
    pub noise_color_scale_2: f32,
    pub noise_color_intensity: f32,
    pub aspect: f32,
    pub fov: f32,
}

/// std140 bytes of a single uniform block.
pub fn block_bytes<T: AsStd140>(block: &T) -> Vec<u8> {
    use crevice::std140::Std140;
    block.as_std140().as_bytes().to_vec()
}
