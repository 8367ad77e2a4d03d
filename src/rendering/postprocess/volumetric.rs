use crate::core::math::Vec3;
use crate::rendering::deferred::uniforms::{block_bytes, mat4, vec3, VolumetricFogData};
use crate::rendering::device::{
    DeviceError, DeviceResult, GBufferChannel, GraphicsDevice, TextureHandle, TextureSource,
};
use crate::rendering::postprocess::{CompositeContext, PostprocessingEffect};
use crate::rendering::sampler::{
    MagnificationFilter, MinificationFilter, SamplerDescriptor, WrappingMode,
};
use crate::rendering::shader::{ShaderFlags, ShaderKind, ShaderVariant};
use crate::rendering::state::{BlendMode, DepthMode};

/// Noise volume layered over the nebula density.
#[derive(Debug, Clone, PartialEq)]
pub struct NebulaNoise {
    pub volume: TextureHandle,
    pub color: Vec3,
    pub color_scale: (f32, f32),
    pub intensity: f32,
}

/// Raymarched nebula volume and its scattering parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumetricNebula {
    /// 3D density texture. The pass is skipped while this is missing.
    pub volume: Option<TextureHandle>,
    pub noise: Option<NebulaNoise>,
    pub edge_smoothing: bool,
    pub position: Vec3,
    pub size: Vec3,
    pub step_size: f32,
    pub step_alpha: f32,
    pub alpha_limit: f32,
    pub emissive_spread: f32,
    pub emissive_intensity: f32,
    pub emissive_falloff: f32,
    pub henyey_greenstein_coeff: f32,
    pub global_light_steps: i32,
    pub global_light_step_size: f32,
}

pub struct VolumetricNebulaPass<'a> {
    nebula: &'a VolumetricNebula,
}

impl<'a> VolumetricNebulaPass<'a> {
    pub fn new(nebula: &'a VolumetricNebula) -> Self {
        VolumetricNebulaPass { nebula }
    }

    pub fn shader_variant(&self) -> ShaderVariant {
        let mut flags = ShaderFlags::empty();
        if self.nebula.edge_smoothing {
            flags |= ShaderFlags::VOLUMETRICS_EDGE_SMOOTHING;
        }
        if self.nebula.noise.is_some() {
            flags |= ShaderFlags::VOLUMETRICS_NOISE;
        }
        ShaderVariant::with_flags(ShaderKind::VolumetricFog, flags)
    }

    pub fn uniforms(&self, context: &CompositeContext) -> VolumetricFogData {
        let camera = context.camera;
        let nebula = self.nebula;
        let (noise_color, (noise_color_scale_1, noise_color_scale_2), noise_color_intensity) =
            match &nebula.noise {
                Some(noise) => (noise.color, noise.color_scale, noise.intensity),
                None => (Vec3::zeros(), (0.0, 0.0), 0.0),
            };

        VolumetricFogData {
            p_inv: mat4(&camera.inverse_projection_matrix()),
            v_inv: mat4(&camera.inverse_view_matrix()),
            camera_pos: vec3(camera.position()),
            z_near: camera.near_plane(),
            global_light_direction: vec3(&context.global_light_direction),
            z_far: camera.far_plane(),
            global_light_diffuse: vec3(&context.global_light_diffuse),
            step_size: nebula.step_size,
            neb_pos: vec3(&nebula.position),
            global_step_alpha: nebula.step_alpha,
            neb_size: vec3(&nebula.size),
            alpha_limit: nebula.alpha_limit,
            noise_color: vec3(&noise_color),
            emissive_spread_factor: nebula.emissive_spread,
            emissive_intensity: nebula.emissive_intensity,
            emissive_falloff: nebula.emissive_falloff,
            henyey_greenstein_coeff: nebula.henyey_greenstein_coeff,
            directional_light_sample_steps: nebula.global_light_steps,
            directional_light_step_size: nebula.global_light_step_size,
            noise_color_scale_1,
            noise_color_scale_2,
            noise_color_intensity,
            aspect: camera.aspect(),
            fov: camera.fov(),
        }
    }
}

impl<'a> PostprocessingEffect for VolumetricNebulaPass<'a> {
    fn name(&self) -> &str {
        "volumetric nebula"
    }

    fn apply<D: GraphicsDevice>(
        &self,
        device: &mut D,
        context: &CompositeContext,
    ) -> DeviceResult<()> {
        let volume = self.nebula.volume.ok_or(DeviceError::InvalidHandle {
            kind: "nebula density volume",
            id: 0,
        })?;

        let camera = context.camera;
        device.set_view_projection(&camera.view_matrix(), &camera.projection_matrix());
        device.set_blend_mode(BlendMode::None);
        device.set_depth_mode(DepthMode::None);
        device.use_shader(&self.shader_variant())?;

        device.bind_texture(
            0,
            TextureSource::Channel(GBufferChannel::Composite),
            &SamplerDescriptor::linear_clamped(),
        );

        // The emissive mip chain feeds the blurred glow lookups.
        device.bind_texture(
            1,
            TextureSource::Channel(GBufferChannel::Emissive),
            &SamplerDescriptor::new(
                MinificationFilter::LinearMipmapLinear,
                MagnificationFilter::Linear,
                WrappingMode::ClampToEdge,
            ),
        );
        device.generate_mipmaps(GBufferChannel::Emissive);
        device.set_min_filter(GBufferChannel::Emissive, MinificationFilter::LinearMipmapLinear);

        device.bind_texture(
            2,
            TextureSource::SceneDepth,
            &SamplerDescriptor::nearest_clamped(),
        );
        device.bind_texture(
            3,
            TextureSource::External(volume),
            &SamplerDescriptor::linear_clamped(),
        );
        if let Some(noise) = &self.nebula.noise {
            device.bind_texture(
                4,
                TextureSource::External(noise.volume),
                &SamplerDescriptor::linear_repeat(),
            );
        }

        device.set_generic_uniforms(&block_bytes(&self.uniforms(context)));
        device.push_debug_group("Volumetric nebula draw");
        device.draw_fullscreen();
        device.pop_debug_group();

        device.set_min_filter(GBufferChannel::Emissive, MinificationFilter::Linear);

        Ok(())
    }
}
