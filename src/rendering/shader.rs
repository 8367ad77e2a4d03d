use crate::core::Msaa;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    DeferredClear,
    Copy,
    MsaaResolve,
    DeferredLighting,
    SceneFog,
    VolumetricFog,
}

impl ShaderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShaderKind::DeferredClear => "deferred_clear",
            ShaderKind::Copy => "copy",
            ShaderKind::MsaaResolve => "msaa_resolve",
            ShaderKind::DeferredLighting => "deferred_lighting",
            ShaderKind::SceneFog => "scene_fog",
            ShaderKind::VolumetricFog => "volumetric_fog",
        }
    }
}

bitflags! {
    pub struct ShaderFlags: u32 {
        const MSAA_SAMPLES_4 = 1 << 0;
        const MSAA_SAMPLES_8 = 1 << 1;
        const MSAA_SAMPLES_16 = 1 << 2;
        const VOLUMETRICS_EDGE_SMOOTHING = 1 << 3;
        const VOLUMETRICS_NOISE = 1 << 4;
    }
}

impl ShaderFlags {
    pub fn msaa_samples(msaa: Msaa) -> Option<ShaderFlags> {
        match msaa {
            Msaa::None => None,
            Msaa::X4 => Some(ShaderFlags::MSAA_SAMPLES_4),
            Msaa::X8 => Some(ShaderFlags::MSAA_SAMPLES_8),
            Msaa::X16 => Some(ShaderFlags::MSAA_SAMPLES_16),
        }
    }

    /// Preprocessor keywords for the enabled flags, in declaration order.
    pub fn keywords(&self) -> Vec<&'static str> {
        [
            (ShaderFlags::MSAA_SAMPLES_4, "MSAA_SAMPLES_4"),
            (ShaderFlags::MSAA_SAMPLES_8, "MSAA_SAMPLES_8"),
            (ShaderFlags::MSAA_SAMPLES_16, "MSAA_SAMPLES_16"),
            (
                ShaderFlags::VOLUMETRICS_EDGE_SMOOTHING,
                "VOLUMETRICS_EDGE_SMOOTHING",
            ),
            (ShaderFlags::VOLUMETRICS_NOISE, "VOLUMETRICS_NOISE"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, keyword)| *keyword)
        .collect_vec()
    }
}

/// A shader and the keyword flags it was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVariant {
    pub kind: ShaderKind,
    pub flags: ShaderFlags,
}

impl ShaderVariant {
    pub fn new(kind: ShaderKind) -> Self {
        ShaderVariant {
            kind,
            flags: ShaderFlags::empty(),
        }
    }

    pub fn with_flags(kind: ShaderKind, flags: ShaderFlags) -> Self {
        ShaderVariant { kind, flags }
    }
}

impl fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.flags.is_empty() {
            write!(f, "{}", self.kind.name())
        } else {
            write!(
                f,
                "{}[{}]",
                self.kind.name(),
                self.flags.keywords().iter().join(" ")
            )
        }
    }
}
