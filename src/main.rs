// crevice's AsStd140 derive emits deeply nested padding consts that trip this lint.
#![allow(long_running_const_eval)]

use deferred_lighting::core::camera::Camera;
use deferred_lighting::core::math::Vec3;
use deferred_lighting::core::Settings;
use deferred_lighting::rendering::deferred::{DeferredRenderer, LightingFrame};
use deferred_lighting::rendering::device::TextureHandle;
use deferred_lighting::rendering::light::{Light, LightKind};
use deferred_lighting::rendering::postprocess::{Atmosphere, VolumetricNebula};
use deferred_lighting::rendering::recorder::CommandRecorder;
use log::{error, info};
use std::process;

const FRAMES: usize = 3;

fn scene_lights() -> Vec<Light> {
    vec![
        Light::point(Vec3::new(20.0, 5.0, -10.0), 5.0, 40.0, Vec3::new(1.0, 0.6, 0.3), 1.5),
        Light::tube(
            Vec3::new(-30.0, 0.0, 0.0),
            Vec3::new(-30.0, 0.0, -60.0),
            8.0,
            Vec3::new(0.4, 0.7, 1.0),
            2.0,
        )
        .with_source_radius(1.0),
        Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::new(1.0, 0.95, 0.9), 1.0),
        Light {
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 3.0,
            source_radius: 0.5,
            kind: LightKind::Cone {
                position: Vec3::new(0.0, 10.0, 0.0),
                direction: Vec3::new(0.0, -1.0, 0.0),
                inner_radius: 10.0,
                outer_radius: 60.0,
                cone_angle: 0.6,
                cone_inner_angle: 0.4,
                dual_cone: false,
            },
        },
    ]
}

fn nebula() -> Atmosphere {
    Atmosphere {
        fog: None,
        volumetrics: Some(VolumetricNebula {
            volume: Some(TextureHandle(1)),
            position: Vec3::new(0.0, 0.0, -500.0),
            size: Vec3::new(1000.0, 400.0, 1000.0),
            step_size: 10.0,
            step_alpha: 0.02,
            alpha_limit: 0.98,
            emissive_spread: 0.7,
            emissive_intensity: 1.1,
            emissive_falloff: 2.0,
            henyey_greenstein_coeff: 0.2,
            global_light_steps: 6,
            global_light_step_size: 40.0,
            ..Default::default()
        }),
    }
}

fn main() {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path),
        None => Ok(Settings::default()),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let camera = Camera::from_settings(Vec3::new(0.0, 20.0, 150.0), Vec3::zeros(), &settings);
    let profile = settings.lighting_profile;

    let mut device = CommandRecorder::new();
    let mut renderer = match DeferredRenderer::new(&mut device, settings, profile) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to initialize deferred lighting: {}", e);
            process::exit(1);
        }
    };

    let lights = scene_lights();
    let atmosphere = nebula();

    for frame in 0..FRAMES {
        renderer.begin_accumulation(&mut device, true);
        renderer.resolve_msaa(&mut device, &camera);
        renderer.end_accumulation(&mut device);

        renderer.finish_lighting(
            &mut device,
            &LightingFrame {
                lights: &lights,
                camera: &camera,
                shadows: None,
                atmosphere: &atmosphere,
            },
        );

        let commands = device.take_commands();
        info!(
            "Frame {}: {} commands, {} draws.",
            frame,
            commands.len(),
            commands.iter().filter(|c| c.is_draw()).count()
        );
    }

    renderer.shutdown(&mut device);
    info!(
        "Live meshes: {}, live buffers: {}.",
        device.live_mesh_count(),
        device.live_buffer_count()
    );
}
