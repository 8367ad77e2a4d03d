use crate::rendering::sampler::{
    MagnificationFilter, MinificationFilter, SamplerDescriptor, WrappingMode,
};
use gl::types::*;
use std::collections::HashMap;

pub fn gl_min_filter(filter: MinificationFilter) -> GLenum {
    match filter {
        MinificationFilter::Nearest => gl::NEAREST,
        MinificationFilter::Linear => gl::LINEAR,
        MinificationFilter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
        MinificationFilter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
        MinificationFilter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
    }
}

pub fn gl_mag_filter(filter: MagnificationFilter) -> GLenum {
    match filter {
        MagnificationFilter::Nearest => gl::NEAREST,
        MagnificationFilter::Linear => gl::LINEAR,
    }
}

pub fn gl_wrapping(mode: WrappingMode) -> GLenum {
    match mode {
        WrappingMode::Repeat => gl::REPEAT,
        WrappingMode::ClampToEdge => gl::CLAMP_TO_EDGE,
        WrappingMode::MirroredRepeat => gl::MIRRORED_REPEAT,
    }
}

/// Bound sampler objects take precedence over texture parameters, so a
/// channel's minification filter has to travel in the descriptor.
pub fn with_min_filter(
    descriptor: &SamplerDescriptor,
    filter: Option<MinificationFilter>,
) -> SamplerDescriptor {
    match filter {
        Some(min_filter) => SamplerDescriptor {
            min_filter,
            ..*descriptor
        },
        None => *descriptor,
    }
}

#[derive(Debug)]
pub struct Sampler {
    id: GLuint,
    descriptor: SamplerDescriptor,
}

impl Sampler {
    pub fn new(descriptor: SamplerDescriptor) -> Sampler {
        let mut id: GLuint = 0;

        unsafe {
            gl::CreateSamplers(1, &mut id);

            gl::SamplerParameteri(
                id,
                gl::TEXTURE_MIN_FILTER,
                gl_min_filter(descriptor.min_filter) as i32,
            );
            gl::SamplerParameteri(
                id,
                gl::TEXTURE_MAG_FILTER,
                gl_mag_filter(descriptor.mag_filter) as i32,
            );
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_S, gl_wrapping(descriptor.wrap_s) as i32);
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_T, gl_wrapping(descriptor.wrap_t) as i32);
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_R, gl_wrapping(descriptor.wrap_r) as i32);
        }

        Sampler { id, descriptor }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe { gl::DeleteSamplers(1, &self.id) }
    }
}

/// One GL sampler object per distinct descriptor, created on first use.
#[derive(Debug, Default)]
pub struct SamplerCache {
    samplers: HashMap<SamplerDescriptor, Sampler>,
}

impl SamplerCache {
    pub fn get(&mut self, descriptor: &SamplerDescriptor) -> GLuint {
        self.samplers
            .entry(*descriptor)
            .or_insert_with(|| Sampler::new(*descriptor))
            .id()
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_mapping() {
        assert_eq!(gl_min_filter(MinificationFilter::Nearest), gl::NEAREST);
        assert_eq!(
            gl_min_filter(MinificationFilter::LinearMipmapLinear),
            gl::LINEAR_MIPMAP_LINEAR
        );
        assert_eq!(gl_mag_filter(MagnificationFilter::Linear), gl::LINEAR);
        assert_eq!(gl_wrapping(WrappingMode::ClampToEdge), gl::CLAMP_TO_EDGE);
    }

    #[test]
    fn test_channel_min_filter_replaces_descriptor_filter() {
        let mipmapped = SamplerDescriptor::new(
            MinificationFilter::LinearMipmapLinear,
            MagnificationFilter::Linear,
            WrappingMode::ClampToEdge,
        );

        assert_eq!(with_min_filter(&mipmapped, None), mipmapped);

        let reset = with_min_filter(&mipmapped, Some(MinificationFilter::Linear));
        assert_eq!(reset.min_filter, MinificationFilter::Linear);
        assert_eq!(reset.mag_filter, mipmapped.mag_filter);
        assert_eq!(reset.wrap_s, WrappingMode::ClampToEdge);
    }
}
