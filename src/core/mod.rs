pub mod camera;
pub mod math;

use crate::rendering::profile::LightingProfile;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported MSAA sample count {0}. Supported counts are 0, 4, 8 and 16.")]
    UnsupportedMsaaSamples(u32),
    #[error("Invalid screen size {width}x{height}.")]
    InvalidScreenSize { width: u32, height: u32 },
    #[error("Invalid draw distances: near {near}, far {far}.")]
    InvalidDrawDistances { near: f32, far: f32 },
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Multisample count of the scene framebuffer. Serialized as the raw sample count.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Msaa {
    None = 0,
    X4 = 4,
    X8 = 8,
    X16 = 16,
}

impl Msaa {
    pub fn samples(&self) -> u32 {
        *self as u32
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Msaa::None)
    }
}

impl TryFrom<u32> for Msaa {
    type Error = ConfigError;

    fn try_from(samples: u32) -> Result<Self, Self::Error> {
        match samples {
            0 | 1 => Ok(Msaa::None),
            4 => Ok(Msaa::X4),
            8 => Ok(Msaa::X8),
            16 => Ok(Msaa::X16),
            _ => Err(ConfigError::UnsupportedMsaaSamples(samples)),
        }
    }
}

impl From<Msaa> for u32 {
    fn from(msaa: Msaa) -> Self {
        msaa.samples()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowQuality {
    Disabled,
    Low,
    Medium,
    High,
    Ultra,
}

impl ShadowQuality {
    pub fn enabled(&self) -> bool {
        !matches!(self, ShadowQuality::Disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightingMode {
    Normal,
    Cockpit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        ScreenSize { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub deferred_lighting: bool,
    pub msaa: Msaa,
    pub shadow_quality: ShadowQuality,
    pub lighting_mode: LightingMode,
    pub screen_size: ScreenSize,
    pub near_draw_distance: f32,
    pub far_draw_distance: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub lighting_profile: LightingProfile,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            deferred_lighting: true,
            msaa: Msaa::None,
            shadow_quality: ShadowQuality::Disabled,
            lighting_mode: LightingMode::Normal,
            screen_size: ScreenSize::new(1920, 1080),
            near_draw_distance: 1.0,
            far_draw_distance: 1.0e5,
            fov: 0.75,
            lighting_profile: LightingProfile::default(),
        }
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let source = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&source)
    }

    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let settings: Settings = ron::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_ron_string(&self) -> ConfigResult<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.screen_size.width == 0 || self.screen_size.height == 0 {
            return Err(ConfigError::InvalidScreenSize {
                width: self.screen_size.width,
                height: self.screen_size.height,
            });
        }

        if !(self.near_draw_distance > 0.0 && self.far_draw_distance > self.near_draw_distance) {
            return Err(ConfigError::InvalidDrawDistances {
                near: self.near_draw_distance,
                far: self.far_draw_distance,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_msaa_sample_counts() {
        assert_eq!(Msaa::try_from(0).unwrap(), Msaa::None);
        assert_eq!(Msaa::try_from(4).unwrap(), Msaa::X4);
        assert_eq!(Msaa::try_from(8).unwrap(), Msaa::X8);
        assert_eq!(Msaa::try_from(16).unwrap(), Msaa::X16);
        assert!(matches!(
            Msaa::try_from(5),
            Err(ConfigError::UnsupportedMsaaSamples(5))
        ));
        assert!(Msaa::try_from(2).is_err());
    }

    #[test]
    fn test_parse_partial_settings() {
        let settings = Settings::from_ron_str(
            "(msaa: 8, shadow_quality: High, lighting_mode: Cockpit, screen_size: (width: 800, height: 600))",
        )
        .unwrap();

        assert_eq!(settings.msaa, Msaa::X8);
        assert_eq!(settings.shadow_quality, ShadowQuality::High);
        assert_eq!(settings.lighting_mode, LightingMode::Cockpit);
        assert_eq!(settings.screen_size, ScreenSize::new(800, 600));
        assert!(settings.deferred_lighting);
    }

    #[test]
    fn test_parse_rejects_unsupported_msaa() {
        let result = Settings::from_ron_str("(msaa: 5)");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_bad_draw_distances() {
        let settings = Settings {
            near_draw_distance: 10.0,
            far_draw_distance: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidDrawDistances { .. })
        ));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let settings = Settings {
            msaa: Msaa::X16,
            shadow_quality: ShadowQuality::Medium,
            ..Default::default()
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(settings.to_ron_string().unwrap().as_bytes())
            .unwrap();

        let loaded = Settings::load(file.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(dir.path().join("missing.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
