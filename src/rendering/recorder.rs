use crate::core::math::{Mat4, Vec4};
use crate::rendering::device::{
    BufferHandle, DeviceError, DeviceResult, FramebufferTarget, GBufferChannel, GraphicsDevice,
    MeshHandle, TextureSource, UniformBlock, DEFAULT_UNIFORM_OFFSET_ALIGNMENT,
};
use crate::rendering::mesh::MeshData;
use crate::rendering::sampler::{MinificationFilter, SamplerDescriptor};
use crate::rendering::shader::{ShaderKind, ShaderVariant};
use crate::rendering::state::{BlendMode, ColorMask, DepthMode, RenderState};
use log::trace;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateMesh {
        mesh: MeshHandle,
        label: String,
        triangles: usize,
    },
    DestroyMesh(MeshHandle),
    CreateUniformBuffer {
        buffer: BufferHandle,
        label: String,
        size: usize,
    },
    DestroyBuffer(BufferHandle),
    BindUniformRange {
        block: UniformBlock,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    },
    SetGenericUniforms(Vec<u8>),
    UseShader(ShaderVariant),
    BindTexture {
        unit: u32,
        source: TextureSource,
        sampler: SamplerDescriptor,
    },
    GenerateMipmaps(GBufferChannel),
    SetMinFilter {
        channel: GBufferChannel,
        filter: MinificationFilter,
    },
    SetBlendMode(BlendMode),
    SetDepthMode(DepthMode),
    SetCulling(bool),
    SetColorMask(ColorMask),
    BindFramebuffer(FramebufferTarget),
    SetDrawChannels(Vec<GBufferChannel>),
    ClearChannel {
        channel: GBufferChannel,
        color: Vec4,
    },
    BlitChannel {
        source: GBufferChannel,
        destination: GBufferChannel,
    },
    DrawFullscreen,
    DrawMesh {
        mesh: MeshHandle,
        model: Mat4,
    },
    SetViewProjection {
        view: Mat4,
        projection: Mat4,
    },
    ResetState,
    PushDebugGroup(String),
    PopDebugGroup,
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawFullscreen | Command::DrawMesh { .. })
    }
}

/// Headless [`GraphicsDevice`] that records every call in order.
///
/// Resource creation and shader availability can be made to fail so callers
/// can observe how they degrade.
#[derive(Debug)]
pub struct CommandRecorder {
    commands: Vec<Command>,
    uniform_offset_alignment: usize,
    next_handle: u32,
    live_meshes: HashSet<MeshHandle>,
    live_buffers: HashMap<BufferHandle, Vec<u8>>,
    uploads: Vec<(BufferHandle, Vec<u8>)>,
    missing_shaders: HashSet<ShaderKind>,
    state: RenderState,
    fail_mesh_uploads: bool,
    fail_buffer_uploads: bool,
}

impl Default for CommandRecorder {
    fn default() -> Self {
        CommandRecorder {
            commands: vec![],
            uniform_offset_alignment: DEFAULT_UNIFORM_OFFSET_ALIGNMENT,
            next_handle: 1,
            live_meshes: HashSet::new(),
            live_buffers: HashMap::new(),
            uploads: vec![],
            missing_shaders: HashSet::new(),
            state: RenderState::default(),
            fail_mesh_uploads: false,
            fail_buffer_uploads: false,
        }
    }
}

impl CommandRecorder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_uniform_offset_alignment(mut self, alignment: usize) -> Self {
        self.uniform_offset_alignment = alignment;
        self
    }

    pub fn fail_mesh_uploads(&mut self, fail: bool) {
        self.fail_mesh_uploads = fail;
    }

    pub fn fail_buffer_uploads(&mut self, fail: bool) {
        self.fail_buffer_uploads = fail;
    }

    pub fn remove_shader(&mut self, kind: ShaderKind) {
        self.missing_shaders.insert(kind);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    pub fn live_mesh_count(&self) -> usize {
        self.live_meshes.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    /// Every uniform buffer uploaded so far, including released ones.
    pub fn uploads(&self) -> &[(BufferHandle, Vec<u8>)] {
        &self.uploads
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn record(&mut self, command: Command) {
        trace!("{:?}", command);
        self.commands.push(command);
    }
}

impl GraphicsDevice for CommandRecorder {
    fn uniform_offset_alignment(&self) -> usize {
        self.uniform_offset_alignment
    }

    fn create_mesh(&mut self, label: &str, data: &MeshData) -> DeviceResult<MeshHandle> {
        if self.fail_mesh_uploads {
            return Err(DeviceError::ResourceCreation {
                kind: "mesh",
                label: label.to_string(),
                reason: "uploads disabled".to_string(),
            });
        }

        let mesh = MeshHandle(self.allocate_handle());
        self.live_meshes.insert(mesh);
        self.record(Command::CreateMesh {
            mesh,
            label: label.to_string(),
            triangles: data.triangle_count(),
        });
        Ok(mesh)
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        self.live_meshes.remove(&mesh);
        self.record(Command::DestroyMesh(mesh));
    }

    fn create_uniform_buffer(&mut self, label: &str, data: &[u8]) -> DeviceResult<BufferHandle> {
        if self.fail_buffer_uploads {
            return Err(DeviceError::ResourceCreation {
                kind: "uniform buffer",
                label: label.to_string(),
                reason: "uploads disabled".to_string(),
            });
        }

        let buffer = BufferHandle(self.allocate_handle());
        self.live_buffers.insert(buffer, data.to_vec());
        self.uploads.push((buffer, data.to_vec()));
        self.record(Command::CreateUniformBuffer {
            buffer,
            label: label.to_string(),
            size: data.len(),
        });
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.live_buffers.remove(&buffer);
        self.record(Command::DestroyBuffer(buffer));
    }

    fn bind_uniform_range(
        &mut self,
        block: UniformBlock,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    ) {
        self.record(Command::BindUniformRange {
            block,
            buffer,
            offset,
            size,
        });
    }

    fn set_generic_uniforms(&mut self, data: &[u8]) {
        self.record(Command::SetGenericUniforms(data.to_vec()));
    }

    fn use_shader(&mut self, variant: &ShaderVariant) -> DeviceResult<()> {
        if self.missing_shaders.contains(&variant.kind) {
            return Err(DeviceError::MissingShader(*variant));
        }

        self.record(Command::UseShader(*variant));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, source: TextureSource, sampler: &SamplerDescriptor) {
        self.record(Command::BindTexture {
            unit,
            source,
            sampler: *sampler,
        });
    }

    fn generate_mipmaps(&mut self, channel: GBufferChannel) {
        self.record(Command::GenerateMipmaps(channel));
    }

    fn set_min_filter(&mut self, channel: GBufferChannel, filter: MinificationFilter) {
        self.record(Command::SetMinFilter { channel, filter });
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        self.record(Command::SetBlendMode(mode));
    }

    fn set_depth_mode(&mut self, mode: DepthMode) {
        self.state.depth = mode;
        self.record(Command::SetDepthMode(mode));
    }

    fn set_culling(&mut self, enabled: bool) {
        self.state.culling = enabled;
        self.record(Command::SetCulling(enabled));
    }

    fn set_color_mask(&mut self, mask: ColorMask) {
        self.record(Command::SetColorMask(mask));
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        self.record(Command::BindFramebuffer(target));
    }

    fn set_draw_channels(&mut self, channels: &[GBufferChannel]) {
        self.record(Command::SetDrawChannels(channels.to_vec()));
    }

    fn clear_channel(&mut self, channel: GBufferChannel, color: Vec4) {
        self.record(Command::ClearChannel { channel, color });
    }

    fn blit_channel(&mut self, source: GBufferChannel, destination: GBufferChannel) {
        self.record(Command::BlitChannel {
            source,
            destination,
        });
    }

    fn draw_fullscreen(&mut self) {
        self.record(Command::DrawFullscreen);
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, model: &Mat4) {
        self.record(Command::DrawMesh { mesh, model: *model });
    }

    fn set_view_projection(&mut self, view: &Mat4, projection: &Mat4) {
        self.record(Command::SetViewProjection {
            view: *view,
            projection: *projection,
        });
    }

    fn reset_state(&mut self) {
        self.state = RenderState::default();
        self.record(Command::ResetState);
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn push_debug_group(&mut self, label: &str) {
        self.record(Command::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.record(Command::PopDebugGroup);
    }
}
