use crate::core::math::{Mat4, Vec4};
use crate::rendering::mesh::MeshData;
use crate::rendering::sampler::{MinificationFilter, SamplerDescriptor};
use crate::rendering::shader::ShaderVariant;
use crate::rendering::state::{BlendMode, ColorMask, DepthMode, RenderState};
use thiserror::Error;

/// `GL_UNIFORM_BUFFER_OFFSET_ALIGNMENT` on most desktop drivers.
pub const DEFAULT_UNIFORM_OFFSET_ALIGNMENT: usize = 256;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to create {kind} '{label}': {reason}")]
    ResourceCreation {
        kind: &'static str,
        label: String,
        reason: String,
    },
    #[error("Shader variant {0} is not available.")]
    MissingShader(ShaderVariant),
    #[error("Invalid {kind} handle {id}.")]
    InvalidHandle { kind: &'static str, id: u32 },
    #[error("Incomplete framebuffer: {0}")]
    IncompleteFramebuffer(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Texture owned outside the lighting core, e.g. a nebula density volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Colour attachments of the scene framebuffer.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferChannel {
    Color = 0,
    Position = 1,
    Normal = 2,
    Specular = 3,
    Emissive = 4,
    Composite = 6,
}

impl GBufferChannel {
    pub const ALL: [GBufferChannel; 6] = [
        GBufferChannel::Color,
        GBufferChannel::Position,
        GBufferChannel::Normal,
        GBufferChannel::Specular,
        GBufferChannel::Emissive,
        GBufferChannel::Composite,
    ];

    pub fn attachment_index(&self) -> u32 {
        *self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferTarget {
    Scene,
    SceneMultisample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    Channel(GBufferChannel),
    MultisampleChannel(GBufferChannel),
    SceneDepth,
    MultisampleDepth,
    ShadowMap,
    External(TextureHandle),
}

/// Uniform block binding points used by the lighting shader.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformBlock {
    DeferredGlobals = 1,
    Lights = 2,
}

impl UniformBlock {
    pub fn binding(&self) -> u32 {
        *self as u32
    }
}

/// Graphics services consumed by the lighting core.
///
/// Operations that can fail without taking the frame down return a
/// [`DeviceResult`]; the caller decides whether to skip the pass.
pub trait GraphicsDevice {
    fn uniform_offset_alignment(&self) -> usize {
        DEFAULT_UNIFORM_OFFSET_ALIGNMENT
    }

    fn create_mesh(&mut self, label: &str, data: &MeshData) -> DeviceResult<MeshHandle>;

    fn destroy_mesh(&mut self, mesh: MeshHandle);

    fn create_uniform_buffer(&mut self, label: &str, data: &[u8]) -> DeviceResult<BufferHandle>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn bind_uniform_range(
        &mut self,
        block: UniformBlock,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    );

    /// Uploads the per-pass generic uniform block.
    fn set_generic_uniforms(&mut self, data: &[u8]);

    fn use_shader(&mut self, variant: &ShaderVariant) -> DeviceResult<()>;

    fn bind_texture(&mut self, unit: u32, source: TextureSource, sampler: &SamplerDescriptor);

    fn generate_mipmaps(&mut self, channel: GBufferChannel);

    fn set_min_filter(&mut self, channel: GBufferChannel, filter: MinificationFilter);

    fn set_blend_mode(&mut self, mode: BlendMode);

    fn set_depth_mode(&mut self, mode: DepthMode);

    fn set_culling(&mut self, enabled: bool);

    fn set_color_mask(&mut self, mask: ColorMask);

    fn bind_framebuffer(&mut self, target: FramebufferTarget);

    fn set_draw_channels(&mut self, channels: &[GBufferChannel]);

    fn clear_channel(&mut self, channel: GBufferChannel, color: Vec4);

    /// Copies one channel into another. The active draw channels are left unchanged.
    fn blit_channel(&mut self, source: GBufferChannel, destination: GBufferChannel);

    fn draw_fullscreen(&mut self);

    fn draw_mesh(&mut self, mesh: MeshHandle, model: &Mat4);

    fn set_view_projection(&mut self, view: &Mat4, projection: &Mat4);

    /// Default blend, depth, cull and colour mask state, no shader bound.
    fn reset_state(&mut self);

    /// Blend, depth and cull state set by the last calls to their setters.
    fn render_state(&self) -> RenderState;

    fn push_debug_group(&mut self, _label: &str) {}

    fn pop_debug_group(&mut self) {}
}
