#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    None,
    Additive,
    AlphaBlend,
}

/// Depth test and depth write combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    None,
    Read,
    Write,
    Full,
}

impl DepthMode {
    pub fn test_enabled(&self) -> bool {
        matches!(self, DepthMode::Read | DepthMode::Full)
    }

    pub fn write_enabled(&self) -> bool {
        matches!(self, DepthMode::Write | DepthMode::Full)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };

    pub const RGB: ColorMask = ColorMask {
        red: true,
        green: true,
        blue: true,
        alpha: false,
    };
}

/// Blend, depth and cull state a pass can save and put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub blend: BlendMode,
    pub depth: DepthMode,
    pub culling: bool,
}

impl Default for RenderState {
    /// The state `reset_state` leaves behind.
    fn default() -> Self {
        RenderState {
            blend: BlendMode::None,
            depth: DepthMode::Full,
            culling: true,
        }
    }
}
