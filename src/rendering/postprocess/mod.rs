use crate::core::camera::Camera;
use crate::core::math::Vec3;
use crate::rendering::device::{DeviceResult, GBufferChannel, GraphicsDevice};

pub mod fog;
pub mod volumetric;

pub use fog::{NebulaFog, SceneFog};
pub use volumetric::{NebulaNoise, VolumetricNebula, VolumetricNebulaPass};

/// Frame state the compositing passes read besides the G-buffer.
pub struct CompositeContext<'a> {
    pub camera: &'a Camera,
    pub global_light_direction: Vec3,
    pub global_light_diffuse: Vec3,
}

/// A full-screen pass that turns the lit composite channel into the final colour channel.
pub trait PostprocessingEffect {
    fn name(&self) -> &str;

    fn apply<D: GraphicsDevice>(
        &self,
        device: &mut D,
        context: &CompositeContext,
    ) -> DeviceResult<()>;
}

/// Fog and nebula configuration of the current mission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atmosphere {
    /// Full nebula scene fog. `None` when the mission has no full nebula or fog rendering is off.
    pub fog: Option<NebulaFog>,
    pub volumetrics: Option<VolumetricNebula>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    SceneFog,
    Volumetric,
    CopyBack,
}

pub fn select_compositor(atmosphere: &Atmosphere, fog_overridden: bool) -> Compositor {
    if fog_overridden {
        Compositor::CopyBack
    } else if atmosphere.fog.is_some() {
        Compositor::SceneFog
    } else if atmosphere.volumetrics.is_some() {
        Compositor::Volumetric
    } else {
        Compositor::CopyBack
    }
}

/// Moves the lit composite channel back into the colour channel untouched.
pub struct CopyBack;

impl PostprocessingEffect for CopyBack {
    fn name(&self) -> &str {
        "copy back"
    }

    fn apply<D: GraphicsDevice>(&self, device: &mut D, _: &CompositeContext) -> DeviceResult<()> {
        device.blit_channel(GBufferChannel::Composite, GBufferChannel::Color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fog() -> NebulaFog {
        NebulaFog {
            start: 10.0,
            density: 0.5,
            color: [128, 64, 255],
        }
    }

    #[test]
    fn test_select_scene_fog_first() {
        let atmosphere = Atmosphere {
            fog: Some(fog()),
            volumetrics: Some(VolumetricNebula::default()),
        };

        assert_eq!(select_compositor(&atmosphere, false), Compositor::SceneFog);
        assert_eq!(select_compositor(&atmosphere, true), Compositor::CopyBack);
    }

    #[test]
    fn test_select_volumetric_without_fog() {
        let atmosphere = Atmosphere {
            fog: None,
            volumetrics: Some(VolumetricNebula::default()),
        };

        assert_eq!(select_compositor(&atmosphere, false), Compositor::Volumetric);
        assert_eq!(select_compositor(&atmosphere, true), Compositor::CopyBack);
    }

    #[test]
    fn test_select_copy_back_by_default() {
        assert_eq!(
            select_compositor(&Atmosphere::default(), false),
            Compositor::CopyBack
        );
    }
}
