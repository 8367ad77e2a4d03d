#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinificationFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl MinificationFilter {
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, MinificationFilter::Nearest | MinificationFilter::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagnificationFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrappingMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Filtering and addressing used when a texture is bound to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDescriptor {
    pub min_filter: MinificationFilter,
    pub mag_filter: MagnificationFilter,
    pub wrap_s: WrappingMode,
    pub wrap_t: WrappingMode,
    pub wrap_r: WrappingMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self::linear_clamped()
    }
}

impl SamplerDescriptor {
    pub fn new(
        min_filter: MinificationFilter,
        mag_filter: MagnificationFilter,
        wrapping: WrappingMode,
    ) -> Self {
        SamplerDescriptor {
            min_filter,
            mag_filter,
            wrap_s: wrapping,
            wrap_t: wrapping,
            wrap_r: wrapping,
        }
    }

    pub fn linear_clamped() -> Self {
        Self::new(
            MinificationFilter::Linear,
            MagnificationFilter::Linear,
            WrappingMode::ClampToEdge,
        )
    }

    pub fn linear_repeat() -> Self {
        Self::new(
            MinificationFilter::Linear,
            MagnificationFilter::Linear,
            WrappingMode::Repeat,
        )
    }

    pub fn nearest_clamped() -> Self {
        Self::new(
            MinificationFilter::Nearest,
            MagnificationFilter::Nearest,
            WrappingMode::ClampToEdge,
        )
    }
}
