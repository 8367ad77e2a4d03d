//! OpenGL 4.5 implementation of [`GraphicsDevice`] built on direct state access.
//!
//! Shader programs are not compiled here. The host registers one program
//! pipeline per [`ShaderVariant`] through a [`ShaderProvider`].

pub mod buffer;
pub mod framebuffer;
pub mod mesh;
pub mod sampler;
pub mod state;

use crate::core::math::{Mat4, UVec2, Vec4};
use crate::core::{Msaa, Settings};
use crate::rendering::deferred::uniforms::{block_bytes, mat4, Std140Mat4};
use crate::rendering::device::{
    BufferHandle, DeviceError, DeviceResult, FramebufferTarget, GBufferChannel, GraphicsDevice,
    MeshHandle, TextureSource, UniformBlock, DEFAULT_UNIFORM_OFFSET_ALIGNMENT,
};
use crate::rendering::mesh::MeshData;
use crate::rendering::sampler::{MinificationFilter, SamplerDescriptor};
use crate::rendering::shader::ShaderVariant;
use crate::rendering::state::{BlendMode, ColorMask, DepthMode, RenderState};
use buffer::{debug_label, Buffer, BufferStorageFlags, BufferTarget};
use crevice::std140::AsStd140;
use framebuffer::GBuffer;
use gl::types::*;
use log::{info, warn};
use mesh::{FullscreenTriangle, GlMesh};
use sampler::{with_min_filter, SamplerCache};
use state::StateManager;
use std::collections::HashMap;

/// Binding point of the per-pass generic uniform block.
pub const GENERIC_UNIFORM_BINDING: u32 = 0;
/// Binding point of the model/view/projection block.
pub const TRANSFORM_BINDING: u32 = 3;

const INITIAL_GENERIC_CAPACITY: usize = 1024;

/// Supplies the program pipeline object for a shader variant.
pub trait ShaderProvider {
    fn pipeline(&self, variant: &ShaderVariant) -> Option<GLuint>;
}

#[derive(Debug, Default)]
pub struct ShaderLibrary {
    pipelines: HashMap<ShaderVariant, GLuint>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(&mut self, variant: ShaderVariant, pipeline: GLuint) -> Option<GLuint> {
        self.pipelines.insert(variant, pipeline)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl ShaderProvider for ShaderLibrary {
    fn pipeline(&self, variant: &ShaderVariant) -> Option<GLuint> {
        self.pipelines.get(variant).copied()
    }
}

#[derive(AsStd140)]
struct TransformData {
    model: Std140Mat4,
    view: Std140Mat4,
    projection: Std140Mat4,
}

pub struct GlDevice<S: ShaderProvider> {
    shaders: S,
    scene: GBuffer,
    scene_multisample: Option<GBuffer>,
    bound: FramebufferTarget,
    shadow_map: Option<GLuint>,
    meshes: HashMap<MeshHandle, GlMesh>,
    buffers: HashMap<BufferHandle, Buffer>,
    generic_uniforms: Buffer,
    transforms: Buffer,
    samplers: SamplerCache,
    min_filters: HashMap<GBufferChannel, MinificationFilter>,
    channel_units: HashMap<u32, (GBufferChannel, SamplerDescriptor)>,
    state: RenderState,
    fullscreen: FullscreenTriangle,
    view: Mat4,
    projection: Mat4,
    uniform_offset_alignment: usize,
    next_handle: u32,
}

impl<S: ShaderProvider> GlDevice<S> {
    /// Creates the scene G-buffers for the configured screen size and MSAA level.
    ///
    /// Requires a current OpenGL 4.5 context with function pointers loaded.
    pub fn new(settings: &Settings, shaders: S) -> DeviceResult<Self> {
        let size = UVec2::new(settings.screen_size.width, settings.screen_size.height);

        let scene = GBuffer::new("Scene G-buffer", size, Msaa::None)?;
        let scene_multisample = if settings.msaa.is_enabled() {
            Some(GBuffer::new("Scene G-buffer (multisampled)", size, settings.msaa)?)
        } else {
            None
        };

        let generic_uniforms = Self::create_generic_buffer(INITIAL_GENERIC_CAPACITY)?;
        let transforms = Buffer::new(
            "Transforms",
            TransformData::std140_size_static() as isize,
            BufferTarget::Uniform,
            BufferStorageFlags::DYNAMIC,
        )?;

        let mut alignment: GLint = 0;
        unsafe { gl::GetIntegerv(gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT, &mut alignment) };
        let uniform_offset_alignment = if alignment > 0 {
            alignment as usize
        } else {
            DEFAULT_UNIFORM_OFFSET_ALIGNMENT
        };

        // Tracked render state starts from the reset defaults.
        StateManager::reset();

        info!(
            "OpenGL device ready ({}x{}, msaa: {:?}, uniform offset alignment: {}).",
            size.x, size.y, settings.msaa, uniform_offset_alignment
        );

        Ok(GlDevice {
            shaders,
            scene,
            scene_multisample,
            bound: FramebufferTarget::Scene,
            shadow_map: None,
            meshes: HashMap::new(),
            buffers: HashMap::new(),
            generic_uniforms,
            transforms,
            samplers: SamplerCache::default(),
            min_filters: HashMap::new(),
            channel_units: HashMap::new(),
            state: RenderState::default(),
            fullscreen: FullscreenTriangle::new(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            uniform_offset_alignment,
            next_handle: 1,
        })
    }

    /// Texture the directional shadow pass rendered into, if any.
    pub fn set_shadow_map(&mut self, texture: Option<GLuint>) {
        self.shadow_map = texture;
    }

    pub fn shaders_mut(&mut self) -> &mut S {
        &mut self.shaders
    }

    pub fn present(&self, window_size: UVec2) {
        self.scene.present(window_size);
    }

    fn create_generic_buffer(capacity: usize) -> DeviceResult<Buffer> {
        Buffer::new(
            "Generic uniforms",
            capacity as isize,
            BufferTarget::Uniform,
            BufferStorageFlags::DYNAMIC,
        )
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn framebuffer(&self) -> &GBuffer {
        match (self.bound, &self.scene_multisample) {
            (FramebufferTarget::SceneMultisample, Some(multisample)) => multisample,
            _ => &self.scene,
        }
    }

    fn framebuffer_mut(&mut self) -> &mut GBuffer {
        match (self.bound, &mut self.scene_multisample) {
            (FramebufferTarget::SceneMultisample, Some(multisample)) => multisample,
            _ => &mut self.scene,
        }
    }

    fn resolve_texture(&self, source: TextureSource) -> Option<GLuint> {
        match source {
            TextureSource::Channel(channel) => self.scene.channel_texture(channel),
            TextureSource::MultisampleChannel(channel) => self
                .scene_multisample
                .as_ref()
                .and_then(|gbuffer| gbuffer.channel_texture(channel)),
            TextureSource::SceneDepth => Some(self.scene.depth_texture()),
            TextureSource::MultisampleDepth => self
                .scene_multisample
                .as_ref()
                .map(|gbuffer| gbuffer.depth_texture()),
            TextureSource::ShadowMap => self.shadow_map,
            TextureSource::External(handle) => Some(handle.0),
        }
    }

    fn upload_transforms(&self, model: &Mat4) {
        let bytes = block_bytes(&TransformData {
            model: mat4(model),
            view: mat4(&self.view),
            projection: mat4(&self.projection),
        });
        self.transforms.fill_bytes(&bytes);
        if let Err(e) = self.transforms.bind_range(
            TRANSFORM_BINDING,
            0,
            self.transforms.size(),
        ) {
            warn!("Failed to bind transforms: {}", e);
        }
    }
}

impl<S: ShaderProvider> GraphicsDevice for GlDevice<S> {
    fn uniform_offset_alignment(&self) -> usize {
        self.uniform_offset_alignment
    }

    fn create_mesh(&mut self, label: &str, data: &MeshData) -> DeviceResult<MeshHandle> {
        let mesh = GlMesh::new(label, data)?;
        let handle = MeshHandle(self.allocate_handle());
        self.meshes.insert(handle, mesh);
        Ok(handle)
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_none() {
            warn!("Attempted to destroy unknown mesh {:?}.", mesh);
        }
    }

    fn create_uniform_buffer(&mut self, label: &str, data: &[u8]) -> DeviceResult<BufferHandle> {
        let buffer = Buffer::new_from_slice(
            label,
            data,
            BufferTarget::Uniform,
            BufferStorageFlags::NONE,
        )?;
        let handle = BufferHandle(self.allocate_handle());
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            warn!("Attempted to destroy unknown buffer {:?}.", buffer);
        }
    }

    fn bind_uniform_range(
        &mut self,
        block: UniformBlock,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    ) {
        let result = match self.buffers.get(&buffer) {
            Some(gl_buffer) => gl_buffer.bind_range(block.binding(), offset as isize, size as isize),
            None => Err(DeviceError::InvalidHandle {
                kind: "uniform buffer",
                id: buffer.0,
            }),
        };

        if let Err(e) = result {
            warn!("Failed to bind {:?}: {}", block, e);
        }
    }

    fn set_generic_uniforms(&mut self, data: &[u8]) {
        if data.len() as isize > self.generic_uniforms.size() {
            match Self::create_generic_buffer(data.len().next_power_of_two()) {
                Ok(buffer) => self.generic_uniforms = buffer,
                Err(e) => {
                    warn!("Failed to grow the generic uniform buffer: {}", e);
                    return;
                }
            }
        }

        self.generic_uniforms.fill_bytes(data);
        if let Err(e) =
            self.generic_uniforms
                .bind_range(GENERIC_UNIFORM_BINDING, 0, data.len() as isize)
        {
            warn!("Failed to bind generic uniforms: {}", e);
        }
    }

    fn use_shader(&mut self, variant: &ShaderVariant) -> DeviceResult<()> {
        let pipeline = self
            .shaders
            .pipeline(variant)
            .ok_or(DeviceError::MissingShader(*variant))?;

        unsafe { gl::BindProgramPipeline(pipeline) }

        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, source: TextureSource, sampler: &SamplerDescriptor) {
        let texture = match self.resolve_texture(source) {
            Some(texture) => texture,
            None => {
                warn!("No texture available for {:?}, unit {} left unbound.", source, unit);
                self.channel_units.remove(&unit);
                return;
            }
        };
        let descriptor = match source {
            TextureSource::Channel(channel) => {
                self.channel_units.insert(unit, (channel, *sampler));
                with_min_filter(sampler, self.min_filters.get(&channel).copied())
            }
            _ => {
                self.channel_units.remove(&unit);
                *sampler
            }
        };
        let sampler = self.samplers.get(&descriptor);

        unsafe {
            gl::BindTextureUnit(unit, texture);
            gl::BindSampler(unit, sampler);
        }
    }

    fn generate_mipmaps(&mut self, channel: GBufferChannel) {
        if let Some(texture) = self.scene.channel_texture(channel) {
            unsafe { gl::GenerateTextureMipmap(texture) }
        }
    }

    /// Every channel texture is sampled through a sampler object, so the
    /// filter is applied by swapping samplers on the units holding `channel`.
    fn set_min_filter(&mut self, channel: GBufferChannel, filter: MinificationFilter) {
        self.min_filters.insert(channel, filter);

        let units = self
            .channel_units
            .iter()
            .filter(|(_, (bound, _))| *bound == channel)
            .map(|(unit, (_, descriptor))| (*unit, with_min_filter(descriptor, Some(filter))))
            .collect::<Vec<_>>();
        for (unit, descriptor) in units {
            let sampler = self.samplers.get(&descriptor);
            unsafe { gl::BindSampler(unit, sampler) }
        }
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        StateManager::set_blend_mode(mode);
    }

    fn set_depth_mode(&mut self, mode: DepthMode) {
        self.state.depth = mode;
        StateManager::set_depth_mode(mode);
    }

    fn set_culling(&mut self, enabled: bool) {
        self.state.culling = enabled;
        StateManager::set_culling(enabled);
    }

    fn set_color_mask(&mut self, mask: ColorMask) {
        StateManager::set_color_mask(mask);
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        if target == FramebufferTarget::SceneMultisample && self.scene_multisample.is_none() {
            warn!("No multisampled G-buffer exists, binding the scene G-buffer instead.");
        }
        self.bound = target;
        self.framebuffer().bind();
    }

    fn set_draw_channels(&mut self, channels: &[GBufferChannel]) {
        self.framebuffer_mut().set_draw_channels(channels);
    }

    fn clear_channel(&mut self, channel: GBufferChannel, color: Vec4) {
        self.framebuffer().clear_channel(channel, &color);
    }

    fn blit_channel(&mut self, source: GBufferChannel, destination: GBufferChannel) {
        self.framebuffer().blit_channel(source, destination);
    }

    fn draw_fullscreen(&mut self) {
        self.fullscreen.draw();
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, model: &Mat4) {
        if !self.meshes.contains_key(&mesh) {
            warn!("Attempted to draw unknown mesh {:?}.", mesh);
            return;
        }

        self.upload_transforms(model);
        if let Some(gl_mesh) = self.meshes.get(&mesh) {
            gl_mesh.draw();
        }
    }

    fn set_view_projection(&mut self, view: &Mat4, projection: &Mat4) {
        self.view = *view;
        self.projection = *projection;
    }

    fn reset_state(&mut self) {
        self.state = RenderState::default();
        StateManager::reset();
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn push_debug_group(&mut self, label: &str) {
        let message = debug_label(label);
        unsafe { gl::PushDebugGroup(gl::DEBUG_SOURCE_APPLICATION, 0, -1, message.as_ptr()) }
    }

    fn pop_debug_group(&mut self) {
        unsafe { gl::PopDebugGroup() }
    }
}
