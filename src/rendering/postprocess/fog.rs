use crate::rendering::color;
use crate::rendering::deferred::uniforms::{block_bytes, vec3, FogData};
use crate::rendering::device::{DeviceResult, GBufferChannel, GraphicsDevice, TextureSource};
use crate::rendering::postprocess::{CompositeContext, PostprocessingEffect};
use crate::rendering::sampler::SamplerDescriptor;
use crate::rendering::shader::{ShaderKind, ShaderVariant};
use crate::rendering::state::{BlendMode, DepthMode};

/// Distance fog of a full nebula mission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NebulaFog {
    pub start: f32,
    pub density: f32,
    pub color: [u8; 3],
}

pub struct SceneFog<'a> {
    fog: &'a NebulaFog,
}

impl<'a> SceneFog<'a> {
    pub fn new(fog: &'a NebulaFog) -> Self {
        SceneFog { fog }
    }

    pub fn uniforms(&self, context: &CompositeContext) -> FogData {
        FogData {
            fog_color: vec3(&color::rgb8_to_vec3(self.fog.color)),
            fog_start: self.fog.start,
            fog_density: self.fog.density,
            z_near: context.camera.near_plane(),
            z_far: context.camera.far_plane(),
        }
    }
}

impl<'a> PostprocessingEffect for SceneFog<'a> {
    fn name(&self) -> &str {
        "scene fog"
    }

    fn apply<D: GraphicsDevice>(
        &self,
        device: &mut D,
        context: &CompositeContext,
    ) -> DeviceResult<()> {
        device.set_blend_mode(BlendMode::None);
        device.set_depth_mode(DepthMode::None);
        device.use_shader(&ShaderVariant::new(ShaderKind::SceneFog))?;

        device.bind_texture(
            0,
            TextureSource::Channel(GBufferChannel::Composite),
            &SamplerDescriptor::linear_clamped(),
        );
        device.bind_texture(
            1,
            TextureSource::SceneDepth,
            &SamplerDescriptor::nearest_clamped(),
        );

        device.set_generic_uniforms(&block_bytes(&self.uniforms(context)));
        device.draw_fullscreen();

        Ok(())
    }
}
