use crate::rendering::state::{BlendMode, ColorMask, DepthMode};

pub struct StateManager;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendFactor {
    Zero = gl::ZERO,
    One = gl::ONE,
    SourceAlpha = gl::SRC_ALPHA,
    OneMinusSourceAlpha = gl::ONE_MINUS_SRC_ALPHA,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy)]
pub enum DepthFunction {
    Less = gl::LESS,
    LessOrEqual = gl::LEQUAL,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy)]
pub enum FaceCulling {
    Front = gl::FRONT,
    Back = gl::BACK,
}

pub fn blend_factors(mode: BlendMode) -> Option<(BlendFactor, BlendFactor)> {
    match mode {
        BlendMode::None => None,
        BlendMode::Additive => Some((BlendFactor::One, BlendFactor::One)),
        BlendMode::AlphaBlend => Some((BlendFactor::SourceAlpha, BlendFactor::OneMinusSourceAlpha)),
    }
}

impl StateManager {
    pub fn set_viewport(x: i32, y: i32, width: i32, height: i32) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    pub fn set_blend_mode(mode: BlendMode) {
        match blend_factors(mode) {
            Some((source, destination)) => unsafe {
                gl::Enable(gl::BLEND);
                gl::BlendFunc(source as u32, destination as u32);
            },
            None => unsafe { gl::Disable(gl::BLEND) },
        }
    }

    pub fn set_depth_mode(mode: DepthMode) {
        unsafe {
            if mode.test_enabled() {
                gl::Enable(gl::DEPTH_TEST);
                gl::DepthFunc(DepthFunction::LessOrEqual as u32);
            } else if mode.write_enabled() {
                // Depth writes only happen while the test is enabled.
                gl::Enable(gl::DEPTH_TEST);
                gl::DepthFunc(gl::ALWAYS);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }

            gl::DepthMask(if mode.write_enabled() { gl::TRUE } else { gl::FALSE });
        }
    }

    pub fn set_culling(enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::CULL_FACE);
                gl::CullFace(FaceCulling::Back as u32);
            } else {
                gl::Disable(gl::CULL_FACE);
            }
        }
    }

    pub fn set_color_mask(mask: ColorMask) {
        let flag = |enabled: bool| if enabled { gl::TRUE } else { gl::FALSE };
        unsafe {
            gl::ColorMask(
                flag(mask.red),
                flag(mask.green),
                flag(mask.blue),
                flag(mask.alpha),
            )
        }
    }

    pub fn reset() {
        Self::set_blend_mode(BlendMode::None);
        Self::set_depth_mode(DepthMode::Full);
        Self::set_culling(true);
        Self::set_color_mask(ColorMask::RGB);
        unsafe { gl::BindProgramPipeline(0) }
    }
}
