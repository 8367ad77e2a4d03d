//! Deferred light accumulation over the scene G-buffer.
//!
//! A frame goes through `begin_accumulation` → geometry rendering →
//! (`resolve_msaa`) → `end_accumulation` → `finish_lighting`. The renderer owns
//! the state of that sequence and the light volume meshes; everything else is
//! consumed through [`GraphicsDevice`].

pub mod packer;
pub mod uniforms;

use crate::core::camera::Camera;
use crate::core::math::Vec4;
use crate::core::{ConfigResult, Msaa, Settings};
use crate::rendering::device::{
    BufferHandle, FramebufferTarget, GBufferChannel, GraphicsDevice, TextureSource, UniformBlock,
};
use crate::rendering::light::{sort_lights, Light};
use crate::rendering::mesh::{LightVolume, MeshUtilities};
use crate::rendering::postprocess::{
    select_compositor, Atmosphere, CompositeContext, Compositor, CopyBack, PostprocessingEffect,
    SceneFog, VolumetricNebulaPass,
};
use crate::rendering::profile::LightingProfile;
use crate::rendering::sampler::SamplerDescriptor;
use crate::rendering::shader::{ShaderFlags, ShaderKind, ShaderVariant};
use crate::rendering::state::{BlendMode, ColorMask, DepthMode};
use log::{debug, info, trace, warn};
use packer::{LightDraw, PackInput, PackedLights, ShadowState};
use uniforms::{block_bytes, MsaaData};

pub const SPHERE_RINGS: u32 = 16;
pub const SPHERE_SEGMENTS: u32 = 16;
pub const CYLINDER_SEGMENTS: u32 = 16;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

const ACCUMULATION_CHANNELS: [GBufferChannel; 6] = GBufferChannel::ALL;

const RESOLVE_CHANNELS: [GBufferChannel; 5] = [
    GBufferChannel::Color,
    GBufferChannel::Position,
    GBufferChannel::Normal,
    GBufferChannel::Specular,
    GBufferChannel::Emissive,
];

const OPTIONAL_CLEAR_CHANNELS: [GBufferChannel; 4] = [
    GBufferChannel::Position,
    GBufferChannel::Normal,
    GBufferChannel::Specular,
    GBufferChannel::Composite,
];

/// Everything `finish_lighting` needs from the frame.
pub struct LightingFrame<'a> {
    pub lights: &'a [Light],
    pub camera: &'a Camera,
    pub shadows: Option<&'a ShadowState>,
    pub atmosphere: &'a Atmosphere,
}

pub struct DeferredRenderer {
    settings: Settings,
    profile: LightingProfile,
    msaa_flags: Option<ShaderFlags>,
    sphere: LightVolume,
    cylinder: LightVolume,
    accumulating: bool,
    gbuffer_pending: bool,
    fog_overridden: bool,
}

impl DeferredRenderer {
    /// Validates the settings and uploads the light volume meshes.
    ///
    /// A mesh that fails to upload leaves its volume invalid rather than failing
    /// construction; only configuration problems are errors.
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        settings: Settings,
        profile: LightingProfile,
    ) -> ConfigResult<Self> {
        settings.validate()?;

        let msaa_flags = ShaderFlags::msaa_samples(settings.msaa);

        let sphere = LightVolume::upload(
            device,
            "Deferred light sphere",
            &MeshUtilities::generate_sphere(SPHERE_RINGS, SPHERE_SEGMENTS),
        );
        let cylinder = LightVolume::upload(
            device,
            "Deferred light cylinder",
            &MeshUtilities::generate_cylinder(CYLINDER_SEGMENTS),
        );

        info!(
            "Deferred lighting initialized (enabled: {}, msaa: {:?}, shadows: {:?}).",
            settings.deferred_lighting, settings.msaa, settings.shadow_quality
        );

        Ok(DeferredRenderer {
            settings,
            profile,
            msaa_flags,
            sphere,
            cylinder,
            accumulating: false,
            gbuffer_pending: false,
            fog_overridden: false,
        })
    }

    /// Like [`DeferredRenderer::new`] but takes the MSAA count as read from a raw source.
    pub fn with_msaa_samples<D: GraphicsDevice>(
        device: &mut D,
        mut settings: Settings,
        profile: LightingProfile,
        samples: u32,
    ) -> ConfigResult<Self> {
        settings.msaa = Msaa::try_from(samples)?;
        Self::new(device, settings, profile)
    }

    pub fn shutdown<D: GraphicsDevice>(self, device: &mut D) {
        self.sphere.destroy(device);
        self.cylinder.destroy(device);
        info!("Deferred lighting shut down.");
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    pub fn fog_overridden(&self) -> bool {
        self.fog_overridden
    }

    pub fn override_fog(&mut self, overridden: bool) {
        self.fog_overridden = overridden;
    }

    pub fn begin_accumulation<D: GraphicsDevice>(&mut self, device: &mut D, clear_all_channels: bool) {
        if !self.settings.deferred_lighting {
            return;
        }
        if self.accumulating {
            debug!("Deferred accumulation already active, ignoring begin.");
            return;
        }

        device.push_debug_group("Deferred lighting begin");

        self.accumulating = true;
        self.gbuffer_pending = true;
        device.set_color_mask(ColorMask::ALL);

        // Whatever was rendered before the G-buffer pass is treated as emissive.
        if self.settings.msaa.is_enabled() {
            device.bind_framebuffer(FramebufferTarget::SceneMultisample);
            device.set_draw_channels(&[GBufferChannel::Emissive]);
            match device.use_shader(&ShaderVariant::new(ShaderKind::Copy)) {
                Ok(()) => {
                    device.bind_texture(
                        0,
                        TextureSource::Channel(GBufferChannel::Color),
                        &SamplerDescriptor::nearest_clamped(),
                    );
                    device.set_blend_mode(BlendMode::None);
                    device.set_depth_mode(DepthMode::None);
                    device.draw_fullscreen();
                }
                Err(e) => warn!("Skipping emissive copy: {}", e),
            }
        } else {
            device.blit_channel(GBufferChannel::Color, GBufferChannel::Emissive);
        }

        device.set_draw_channels(&ACCUMULATION_CHANNELS);

        let black = Vec4::from(CLEAR_COLOR);
        device.clear_channel(GBufferChannel::Color, black);
        if clear_all_channels {
            OPTIONAL_CLEAR_CHANNELS
                .iter()
                .for_each(|&channel| device.clear_channel(channel, black));
        }

        device.pop_debug_group();
    }

    pub fn resolve_msaa<D: GraphicsDevice>(&mut self, device: &mut D, camera: &Camera) {
        if !self.accumulating {
            return;
        }
        let flags = match self.msaa_flags {
            Some(flags) => flags,
            None => return,
        };

        device.push_debug_group("MSAA pass");

        device.bind_framebuffer(FramebufferTarget::Scene);
        device.set_draw_channels(&RESOLVE_CHANNELS);

        match device.use_shader(&ShaderVariant::with_flags(ShaderKind::MsaaResolve, flags)) {
            Ok(()) => {
                let sampler = SamplerDescriptor::nearest_clamped();
                RESOLVE_CHANNELS
                    .iter()
                    .enumerate()
                    .for_each(|(unit, &channel)| {
                        device.bind_texture(
                            unit as u32,
                            TextureSource::MultisampleChannel(channel),
                            &sampler,
                        )
                    });
                device.bind_texture(
                    RESOLVE_CHANNELS.len() as u32,
                    TextureSource::MultisampleDepth,
                    &sampler,
                );

                device.set_generic_uniforms(&block_bytes(&MsaaData {
                    samples: self.settings.msaa.samples() as i32,
                    fov: camera.fov(),
                }));
                device.set_blend_mode(BlendMode::None);
                device.set_depth_mode(DepthMode::Write);
                device.draw_fullscreen();
            }
            Err(e) => warn!("Skipping MSAA resolve: {}", e),
        }

        device.pop_debug_group();
    }

    pub fn end_accumulation<D: GraphicsDevice>(&mut self, device: &mut D) {
        if !self.accumulating {
            trace!("Deferred accumulation not active, ignoring end.");
            return;
        }

        device.push_debug_group("Deferred lighting end");

        self.accumulating = false;
        device.set_draw_channels(&[GBufferChannel::Color]);
        device.set_color_mask(ColorMask::RGB);

        device.pop_debug_group();
    }

    pub fn finish_lighting<D: GraphicsDevice>(&mut self, device: &mut D, frame: &LightingFrame) {
        if !self.settings.deferred_lighting {
            return;
        }
        if !self.gbuffer_pending {
            debug!("No G-buffer was accumulated since the last finish, skipping lighting.");
            return;
        }
        self.gbuffer_pending = false;

        device.push_debug_group("Deferred lighting finish");

        device.set_blend_mode(BlendMode::Additive);
        device.set_depth_mode(DepthMode::None);

        let lighting_shader = device.use_shader(&ShaderVariant::new(ShaderKind::DeferredLighting));

        // Lights accumulate on top of the emissive contribution.
        device.set_draw_channels(&[GBufferChannel::Composite]);
        device.blit_channel(GBufferChannel::Emissive, GBufferChannel::Composite);

        let sorted = sort_lights(frame.lights);
        let packed = packer::pack(
            &sorted,
            &PackInput {
                view_matrix: frame.camera.view_matrix(),
                screen_size: self.settings.screen_size,
                shadow_quality: self.settings.shadow_quality,
                shadows: frame.shadows,
                lighting_mode: self.settings.lighting_mode,
                profile: &self.profile,
                alignment: device.uniform_offset_alignment(),
            },
        );

        let light_buffer = match lighting_shader {
            Ok(()) => self.draw_lights(device, frame.camera, &packed),
            Err(e) => {
                warn!("Skipping light accumulation: {}", e);
                None
            }
        };

        device.set_draw_channels(&[GBufferChannel::Color]);

        self.composite(device, frame, &packed);

        device.set_view_projection(
            &frame.camera.view_matrix(),
            &frame.camera.projection_matrix(),
        );
        device.reset_state();

        if let Some(buffer) = light_buffer {
            device.destroy_buffer(buffer);
        }

        device.pop_debug_group();
    }

    /// Resets every G-buffer channel with the clear shader, leaving depth,
    /// blending and culling as they were.
    pub fn clear_deferred_buffers<D: GraphicsDevice>(&mut self, device: &mut D) {
        device.push_debug_group("Clear deferred buffers");

        let previous = device.render_state();
        device.set_depth_mode(DepthMode::None);
        device.set_blend_mode(BlendMode::None);
        device.set_culling(false);
        device.set_color_mask(ColorMask::ALL);

        match device.use_shader(&ShaderVariant::new(ShaderKind::DeferredClear)) {
            Ok(()) => device.draw_fullscreen(),
            Err(e) => warn!("Skipping deferred buffer clear: {}", e),
        }

        device.set_color_mask(ColorMask::RGB);
        device.set_depth_mode(previous.depth);
        device.set_blend_mode(previous.blend);
        device.set_culling(previous.culling);

        device.pop_debug_group();
    }

    fn draw_lights<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        camera: &Camera,
        packed: &PackedLights,
    ) -> Option<BufferHandle> {
        let sampler = SamplerDescriptor::nearest_clamped();
        device.bind_texture(0, TextureSource::Channel(GBufferChannel::Color), &sampler);
        device.bind_texture(1, TextureSource::Channel(GBufferChannel::Normal), &sampler);
        device.bind_texture(2, TextureSource::Channel(GBufferChannel::Position), &sampler);
        device.bind_texture(3, TextureSource::Channel(GBufferChannel::Specular), &sampler);
        if self.settings.shadow_quality.enabled() {
            device.bind_texture(4, TextureSource::ShadowMap, &SamplerDescriptor::linear_clamped());
        }

        let buffer = match device.create_uniform_buffer("Deferred lights", &packed.to_bytes()) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Skipping light accumulation: {}", e);
                return None;
            }
        };

        let aligner = packed.aligner();
        device.bind_uniform_range(
            UniformBlock::DeferredGlobals,
            buffer,
            0,
            aligner.header_size(),
        );

        device.set_view_projection(&camera.view_matrix(), &camera.projection_matrix());

        let mut drawn = 0;
        for (index, draw) in packed.draws().iter().enumerate() {
            device.bind_uniform_range(
                UniformBlock::Lights,
                buffer,
                aligner.element_offset(index),
                aligner.element_size(),
            );

            let visible = match draw {
                LightDraw::FullScreen => {
                    device.draw_fullscreen();
                    true
                }
                LightDraw::Sphere { .. } => match draw.model_matrix() {
                    Some(model) => self.sphere.draw(device, &model),
                    None => false,
                },
                LightDraw::Cylinder { .. } => match draw.model_matrix() {
                    Some(model) => self.cylinder.draw(device, &model),
                    None => false,
                },
            };

            if visible {
                drawn += 1;
            }
        }

        debug!("Accumulated {} of {} lights.", drawn, packed.len());

        Some(buffer)
    }

    fn composite<D: GraphicsDevice>(
        &self,
        device: &mut D,
        frame: &LightingFrame,
        packed: &PackedLights,
    ) {
        let context = CompositeContext {
            camera: frame.camera,
            global_light_direction: packed.global_light_direction(),
            global_light_diffuse: packed.global_light_diffuse(),
        };

        let compositor = select_compositor(frame.atmosphere, self.fog_overridden);
        let result = match (compositor, &frame.atmosphere.fog, &frame.atmosphere.volumetrics) {
            (Compositor::SceneFog, Some(fog), _) => {
                Self::run_effect(device, &SceneFog::new(fog), &context)
            }
            (Compositor::Volumetric, _, Some(nebula)) => {
                Self::run_effect(device, &VolumetricNebulaPass::new(nebula), &context)
            }
            _ => Self::run_effect(device, &CopyBack, &context),
        };

        // Without the composite pass the lit image would never reach the colour channel.
        if !result {
            if let Err(e) = CopyBack.apply(device, &context) {
                warn!("Copy back failed: {}", e);
            }
        }
    }

    fn run_effect<D: GraphicsDevice, E: PostprocessingEffect>(
        device: &mut D,
        effect: &E,
        context: &CompositeContext,
    ) -> bool {
        device.push_debug_group(effect.name());
        let result = effect.apply(device, context);
        device.pop_debug_group();

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping {} pass: {}", effect.name(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::Vec3;
    use crate::core::{ConfigError, ShadowQuality};
    use crate::rendering::buffer::UniformAligner;
    use crate::rendering::deferred::uniforms::{DeferredGlobalData, DeferredLightData};
    use crate::rendering::device::MeshHandle;
    use crate::rendering::postprocess::{NebulaFog, VolumetricNebula};
    use crate::rendering::device::TextureHandle;
    use crate::rendering::recorder::{Command, CommandRecorder};

    fn settings(msaa: Msaa) -> Settings {
        Settings {
            msaa,
            ..Default::default()
        }
    }

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::zeros(),
            0.75,
            16.0 / 9.0,
            1.0,
            10000.0,
        )
    }

    fn renderer(recorder: &mut CommandRecorder, msaa: Msaa) -> DeferredRenderer {
        DeferredRenderer::new(recorder, settings(msaa), LightingProfile::default()).unwrap()
    }

    fn white() -> Vec3 {
        Vec3::new(1.0, 1.0, 1.0)
    }

    fn run_frame(
        renderer: &mut DeferredRenderer,
        recorder: &mut CommandRecorder,
        lights: &[Light],
        atmosphere: &Atmosphere,
    ) -> Vec<Command> {
        let camera = camera();
        renderer.begin_accumulation(recorder, true);
        renderer.resolve_msaa(recorder, &camera);
        renderer.end_accumulation(recorder);
        recorder.take_commands();

        renderer.finish_lighting(
            recorder,
            &LightingFrame {
                lights,
                camera: &camera,
                shadows: None,
                atmosphere,
            },
        );
        recorder.take_commands()
    }

    fn light_draws(commands: &[Command]) -> Vec<&Command> {
        let start = commands.iter().position(|c| {
            matches!(
                c,
                Command::BindUniformRange {
                    block: UniformBlock::DeferredGlobals,
                    ..
                }
            )
        });
        match start {
            Some(start) => commands[start..]
                .iter()
                .take_while(|c| !matches!(c, Command::SetDrawChannels(_)))
                .filter(|c| c.is_draw())
                .collect(),
            None => vec![],
        }
    }

    #[test]
    fn test_init_uploads_volumes() {
        let mut recorder = CommandRecorder::new();
        let renderer = renderer(&mut recorder, Msaa::None);

        assert_eq!(recorder.live_mesh_count(), 2);
        assert!(!renderer.is_accumulating());

        renderer.shutdown(&mut recorder);
        assert_eq!(recorder.live_mesh_count(), 0);
    }

    #[test]
    fn test_unsupported_msaa_is_a_config_error() {
        let mut recorder = CommandRecorder::new();
        let result = DeferredRenderer::with_msaa_samples(
            &mut recorder,
            Settings::default(),
            LightingProfile::default(),
            5,
        );

        assert!(matches!(result, Err(ConfigError::UnsupportedMsaaSamples(5))));
        assert_eq!(recorder.live_mesh_count(), 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut recorder = CommandRecorder::new();
        let mut settings = Settings::default();
        settings.screen_size.width = 0;

        let result = DeferredRenderer::new(&mut recorder, settings, LightingProfile::default());
        assert!(matches!(result, Err(ConfigError::InvalidScreenSize { .. })));
    }

    #[test]
    fn test_begin_without_msaa() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.take_commands();

        renderer.begin_accumulation(&mut recorder, false);
        assert!(renderer.is_accumulating());

        let commands = recorder.take_commands();
        assert!(commands.contains(&Command::SetColorMask(ColorMask::ALL)));
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Color,
            destination: GBufferChannel::Emissive,
        }));
        assert!(commands.contains(&Command::SetDrawChannels(GBufferChannel::ALL.to_vec())));

        let cleared = commands
            .iter()
            .filter_map(|c| match c {
                Command::ClearChannel { channel, .. } => Some(*channel),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(cleared, vec![GBufferChannel::Color]);
    }

    #[test]
    fn test_begin_clears_all_but_emissive() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.take_commands();

        renderer.begin_accumulation(&mut recorder, true);

        let cleared = recorder
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::ClearChannel { channel, .. } => Some(*channel),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            cleared,
            vec![
                GBufferChannel::Color,
                GBufferChannel::Position,
                GBufferChannel::Normal,
                GBufferChannel::Specular,
                GBufferChannel::Composite,
            ]
        );
    }

    #[test]
    fn test_begin_with_msaa_copies_into_multisampled_emissive() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::X4);
        recorder.take_commands();

        renderer.begin_accumulation(&mut recorder, false);
        let commands = recorder.take_commands();

        let bind = commands
            .iter()
            .position(|c| *c == Command::BindFramebuffer(FramebufferTarget::SceneMultisample))
            .unwrap();
        let copy = commands
            .iter()
            .position(|c| *c == Command::UseShader(ShaderVariant::new(ShaderKind::Copy)))
            .unwrap();
        assert!(bind < copy);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::BlitChannel { .. })));
        assert_eq!(commands.iter().filter(|c| c.is_draw()).count(), 1);
    }

    #[test]
    fn test_double_begin_is_a_no_op() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);

        renderer.begin_accumulation(&mut recorder, true);
        recorder.take_commands();

        renderer.begin_accumulation(&mut recorder, true);
        assert!(recorder.commands().is_empty());
        assert!(renderer.is_accumulating());
    }

    #[test]
    fn test_end_without_begin_is_a_no_op() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.take_commands();

        renderer.end_accumulation(&mut recorder);
        assert!(recorder.commands().is_empty());

        renderer.begin_accumulation(&mut recorder, false);
        renderer.end_accumulation(&mut recorder);
        assert!(!renderer.is_accumulating());
        assert!(recorder
            .commands()
            .contains(&Command::SetColorMask(ColorMask::RGB)));
    }

    #[test]
    fn test_disabled_renderer_does_nothing() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = DeferredRenderer::new(
            &mut recorder,
            Settings {
                deferred_lighting: false,
                ..Default::default()
            },
            LightingProfile::default(),
        )
        .unwrap();

        let commands = run_frame(
            &mut renderer,
            &mut recorder,
            &[Light::point(Vec3::zeros(), 1.0, 1.0, white(), 1.0)],
            &Atmosphere::default(),
        );
        assert!(commands.is_empty());
        assert!(!renderer.is_accumulating());
    }

    #[test]
    fn test_resolve_msaa_only_while_accumulating() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::X8);
        let camera = camera();
        recorder.take_commands();

        renderer.resolve_msaa(&mut recorder, &camera);
        assert!(recorder.commands().is_empty());

        renderer.begin_accumulation(&mut recorder, false);
        recorder.take_commands();
        renderer.resolve_msaa(&mut recorder, &camera);

        let commands = recorder.take_commands();
        assert!(commands.contains(&Command::UseShader(ShaderVariant::with_flags(
            ShaderKind::MsaaResolve,
            ShaderFlags::MSAA_SAMPLES_8
        ))));
        assert!(commands.contains(&Command::BindTexture {
            unit: 5,
            source: TextureSource::MultisampleDepth,
            sampler: SamplerDescriptor::nearest_clamped(),
        }));
        assert!(commands.contains(&Command::SetGenericUniforms(block_bytes(&MsaaData {
            samples: 8,
            fov: 0.75,
        }))));
        assert!(commands.contains(&Command::SetDepthMode(DepthMode::Write)));
        assert_eq!(commands.iter().filter(|c| c.is_draw()).count(), 1);
    }

    #[test]
    fn test_resolve_msaa_without_msaa_is_a_no_op() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);

        renderer.begin_accumulation(&mut recorder, false);
        recorder.take_commands();
        renderer.resolve_msaa(&mut recorder, &camera());
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_finish_with_zero_lights() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);

        let commands = run_frame(&mut renderer, &mut recorder, &[], &Atmosphere::default());

        assert!(commands.contains(&Command::SetBlendMode(BlendMode::Additive)));
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Emissive,
            destination: GBufferChannel::Composite,
        }));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::BindUniformRange { block: UniformBlock::Lights, .. })));
        assert!(light_draws(&commands).is_empty());

        // Copy back, then state reset and release of the header-only buffer.
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));
        assert!(commands.contains(&Command::ResetState));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::DestroyBuffer(_))));
        assert_eq!(recorder.live_buffer_count(), 0);

        let (_, bytes) = recorder.uploads().last().unwrap();
        let aligner = UniformAligner::for_blocks::<DeferredGlobalData, DeferredLightData>(256);
        assert_eq!(bytes.len(), aligner.header_stride());
    }

    #[test]
    fn test_one_draw_per_light_in_sorted_order() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let lights = vec![
            Light::tube(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), 1.0, white(), 1.0),
            Light::point(Vec3::new(3.0, 0.0, 0.0), 1.0, 2.0, white(), 1.0),
            Light::directional(Vec3::new(0.0, -1.0, 0.0), white(), 1.0),
        ];

        let commands = run_frame(&mut renderer, &mut recorder, &lights, &Atmosphere::default());
        let draws = light_draws(&commands);

        assert_eq!(draws.len(), 3);
        assert_eq!(*draws[0], Command::DrawFullscreen);
        // Sphere uploads first, then the cylinder.
        assert!(matches!(draws[1], Command::DrawMesh { mesh: MeshHandle(1), .. }));
        assert!(matches!(draws[2], Command::DrawMesh { mesh: MeshHandle(2), .. }));

        let ranges = commands
            .iter()
            .filter_map(|c| match c {
                Command::BindUniformRange {
                    block: UniformBlock::Lights,
                    offset,
                    ..
                } => Some(*offset),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(ranges.len(), 3);
        assert!(ranges.iter().all(|offset| offset % 256 == 0));
        assert!(ranges.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_invalid_volume_skips_only_its_lights() {
        let mut recorder = CommandRecorder::new();
        recorder.fail_mesh_uploads(true);
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.fail_mesh_uploads(false);

        let lights = vec![
            Light::directional(Vec3::new(0.0, -1.0, 0.0), white(), 1.0),
            Light::point(Vec3::zeros(), 1.0, 2.0, white(), 1.0),
            Light::point(Vec3::zeros(), 1.0, 3.0, white(), 1.0),
        ];
        let commands = run_frame(&mut renderer, &mut recorder, &lights, &Atmosphere::default());

        assert_eq!(light_draws(&commands), vec![&Command::DrawFullscreen]);
        assert!(commands.contains(&Command::ResetState));
    }

    #[test]
    fn test_failed_light_buffer_skips_draws() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.fail_buffer_uploads(true);

        let lights = vec![
            Light::directional(Vec3::new(0.0, -1.0, 0.0), white(), 1.0),
            Light::point(Vec3::zeros(), 1.0, 2.0, white(), 1.0),
        ];
        let commands = run_frame(&mut renderer, &mut recorder, &lights, &Atmosphere::default());

        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::BindUniformRange { .. })));
        assert_eq!(commands.iter().filter(|c| c.is_draw()).count(), 0);
        assert!(!commands.iter().any(|c| matches!(c, Command::DestroyBuffer(_))));
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));
    }

    #[test]
    fn test_missing_lighting_shader_skips_accumulation() {
        let mut recorder = CommandRecorder::new();
        recorder.remove_shader(ShaderKind::DeferredLighting);
        let mut renderer = renderer(&mut recorder, Msaa::None);

        let lights = vec![Light::point(Vec3::zeros(), 1.0, 2.0, white(), 1.0)];
        let commands = run_frame(&mut renderer, &mut recorder, &lights, &Atmosphere::default());

        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::CreateUniformBuffer { .. })));
        assert!(!commands.iter().any(|c| matches!(c, Command::DrawMesh { .. })));
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));
    }

    #[test]
    fn test_finish_without_begin_is_a_no_op() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.take_commands();

        let camera = camera();
        renderer.finish_lighting(
            &mut recorder,
            &LightingFrame {
                lights: &[],
                camera: &camera,
                shadows: None,
                atmosphere: &Atmosphere::default(),
            },
        );
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_scene_fog_compositor() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let atmosphere = Atmosphere {
            fog: Some(NebulaFog {
                start: 10.0,
                density: 0.2,
                color: [10, 20, 30],
            }),
            volumetrics: Some(VolumetricNebula::default()),
        };

        let commands = run_frame(&mut renderer, &mut recorder, &[], &atmosphere);
        assert!(commands.contains(&Command::UseShader(ShaderVariant::new(ShaderKind::SceneFog))));
        assert!(!commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));

        renderer.override_fog(true);
        let commands = run_frame(&mut renderer, &mut recorder, &[], &atmosphere);
        assert!(!commands.contains(&Command::UseShader(ShaderVariant::new(ShaderKind::SceneFog))));
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));
    }

    #[test]
    fn test_missing_fog_shader_falls_back_to_copy_back() {
        let mut recorder = CommandRecorder::new();
        recorder.remove_shader(ShaderKind::SceneFog);
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let atmosphere = Atmosphere {
            fog: Some(NebulaFog {
                start: 10.0,
                density: 0.2,
                color: [10, 20, 30],
            }),
            volumetrics: None,
        };

        let commands = run_frame(&mut renderer, &mut recorder, &[], &atmosphere);
        assert!(commands.contains(&Command::BlitChannel {
            source: GBufferChannel::Composite,
            destination: GBufferChannel::Color,
        }));
        assert!(commands.contains(&Command::ResetState));
    }

    #[test]
    fn test_volumetric_receives_first_directional_light() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let atmosphere = Atmosphere {
            fog: None,
            volumetrics: Some(VolumetricNebula {
                volume: Some(TextureHandle(3)),
                ..Default::default()
            }),
        };
        let first = Vec3::new(0.0, -1.0, 0.0);
        let lights = vec![
            Light::point(Vec3::zeros(), 1.0, 2.0, white(), 1.0),
            Light::directional(first, Vec3::new(0.5, 0.5, 0.5), 2.0),
            Light::directional(Vec3::new(1.0, 0.0, 0.0), white(), 1.0),
        ];

        let commands = run_frame(&mut renderer, &mut recorder, &lights, &atmosphere);

        let camera = camera();
        let expected = VolumetricNebulaPass::new(atmosphere.volumetrics.as_ref().unwrap())
            .uniforms(&CompositeContext {
                camera: &camera,
                global_light_direction: first,
                global_light_diffuse: white(),
            });
        assert!(commands.contains(&Command::SetGenericUniforms(block_bytes(&expected))));
    }

    #[test]
    fn test_volumetric_without_directional_light_uses_zero_direction() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let atmosphere = Atmosphere {
            fog: None,
            volumetrics: Some(VolumetricNebula {
                volume: Some(TextureHandle(3)),
                ..Default::default()
            }),
        };
        let lights = vec![Light::point(Vec3::zeros(), 1.0, 2.0, white(), 1.0)];

        let commands = run_frame(&mut renderer, &mut recorder, &lights, &atmosphere);

        let camera = camera();
        let expected = VolumetricNebulaPass::new(atmosphere.volumetrics.as_ref().unwrap())
            .uniforms(&CompositeContext {
                camera: &camera,
                global_light_direction: Vec3::zeros(),
                global_light_diffuse: Vec3::zeros(),
            });
        assert!(commands.contains(&Command::SetGenericUniforms(block_bytes(&expected))));
    }

    #[test]
    fn test_shadow_map_bound_when_enabled() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = DeferredRenderer::new(
            &mut recorder,
            Settings {
                shadow_quality: ShadowQuality::Medium,
                ..Default::default()
            },
            LightingProfile::default(),
        )
        .unwrap();

        let commands = run_frame(&mut renderer, &mut recorder, &[], &Atmosphere::default());
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::BindTexture {
                unit: 4,
                source: TextureSource::ShadowMap,
                ..
            }
        )));
    }

    #[test]
    fn test_clear_deferred_buffers() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.take_commands();

        renderer.clear_deferred_buffers(&mut recorder);
        let commands = recorder.take_commands();

        assert!(commands.contains(&Command::SetCulling(false)));
        assert!(commands.contains(&Command::UseShader(ShaderVariant::new(
            ShaderKind::DeferredClear
        ))));
        assert_eq!(commands.iter().filter(|c| c.is_draw()).count(), 1);
        assert!(commands.contains(&Command::SetColorMask(ColorMask::RGB)));
        assert!(!commands.contains(&Command::ResetState));
    }

    #[test]
    fn test_clear_deferred_buffers_restores_caller_state() {
        let mut recorder = CommandRecorder::new();
        let mut renderer = renderer(&mut recorder, Msaa::None);
        recorder.set_depth_mode(DepthMode::Read);
        recorder.set_culling(false);
        recorder.set_blend_mode(BlendMode::Additive);
        let before = recorder.render_state();
        recorder.take_commands();

        renderer.clear_deferred_buffers(&mut recorder);
        let commands = recorder.take_commands();

        assert_eq!(recorder.render_state(), before);
        assert_eq!(
            commands[commands.len() - 4..],
            [
                Command::SetDepthMode(DepthMode::Read),
                Command::SetBlendMode(BlendMode::Additive),
                Command::SetCulling(false),
                Command::PopDebugGroup,
            ]
        );
        assert!(!commands.contains(&Command::ResetState));

        // Restores state even when the clear shader is unavailable.
        recorder.remove_shader(ShaderKind::DeferredClear);
        renderer.clear_deferred_buffers(&mut recorder);
        assert_eq!(recorder.render_state(), before);
        assert_eq!(recorder.draw_count(), 0);
    }

    #[test]
    fn test_light_ranges_follow_device_alignment() {
        let mut recorder = CommandRecorder::new().with_uniform_offset_alignment(64);
        let mut renderer = renderer(&mut recorder, Msaa::None);
        let lights = vec![
            Light::point(Vec3::new(3.0, 0.0, 0.0), 1.0, 2.0, white(), 1.0),
            Light::point(Vec3::new(-3.0, 0.0, 0.0), 1.0, 2.0, white(), 1.0),
            Light::tube(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), 1.0, white(), 1.0),
        ];

        let commands = run_frame(&mut renderer, &mut recorder, &lights, &Atmosphere::default());

        let aligner = UniformAligner::for_blocks::<DeferredGlobalData, DeferredLightData>(64);
        let buffer = commands
            .iter()
            .find_map(|c| match c {
                Command::CreateUniformBuffer { buffer, .. } => Some(*buffer),
                _ => None,
            })
            .unwrap();
        assert!(commands.contains(&Command::BindUniformRange {
            block: UniformBlock::DeferredGlobals,
            buffer,
            offset: 0,
            size: aligner.header_size(),
        }));

        let offsets = commands
            .iter()
            .filter_map(|c| match c {
                Command::BindUniformRange {
                    block: UniformBlock::Lights,
                    offset,
                    size,
                    ..
                } => Some((*offset, *size)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            offsets,
            (0..3)
                .map(|i| (aligner.element_offset(i), aligner.element_size()))
                .collect::<Vec<_>>()
        );
        assert!(offsets.iter().all(|(offset, _)| offset % 64 == 0));

        let (_, bytes) = recorder.uploads().last().unwrap();
        assert_eq!(bytes.len(), aligner.buffer_size(3));
    }

    #[test]
    fn test_resolve_msaa_shader_follows_sample_count() {
        for (msaa, flags, samples) in [
            (Msaa::X4, ShaderFlags::MSAA_SAMPLES_4, 4),
            (Msaa::X16, ShaderFlags::MSAA_SAMPLES_16, 16),
        ] {
            let mut recorder = CommandRecorder::new();
            let mut renderer = renderer(&mut recorder, msaa);

            renderer.begin_accumulation(&mut recorder, false);
            recorder.take_commands();
            renderer.resolve_msaa(&mut recorder, &camera());

            let commands = recorder.take_commands();
            assert!(commands.contains(&Command::UseShader(ShaderVariant::with_flags(
                ShaderKind::MsaaResolve,
                flags
            ))));
            assert!(commands.contains(&Command::SetGenericUniforms(block_bytes(&MsaaData {
                samples,
                fov: 0.75,
            }))));
            assert_eq!(commands.iter().filter(|c| c.is_draw()).count(), 1);
        }
    }
}
