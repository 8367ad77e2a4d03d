use crate::core::math::{UVec2, Vec4};
use crate::core::Msaa;
use crate::rendering::device::{DeviceError, GBufferChannel};
use crate::rendering::opengl::buffer::object_label;
use crate::rendering::opengl::state::StateManager;
use gl::types::*;
use log::warn;
use thiserror::Error;

/// Half float keeps positions and HDR light accumulation precise enough.
const COLOR_FORMAT: GLenum = gl::RGBA16F;
const DEPTH_FORMAT: GLenum = gl::DEPTH_COMPONENT32F;

/// Colour attachment slots. Slot 5 is left unused so channel numbers match attachment points.
const ATTACHMENT_SLOTS: usize = 7;

#[derive(Debug, Error)]
pub enum FramebufferError {
    #[error("Undefined framebuffer.")]
    Undefined,
    #[error("Incomplete framebuffer attachment.")]
    IncompleteAttachment,
    #[error("Incomplete framebuffer. Add at least one attachment to the framebuffer.")]
    IncompleteMissingAttachment,
    #[error("Incomplete draw buffer. Check that all attachments enabled exist in the framebuffer.")]
    IncompleteDrawBuffer,
    #[error("Attachments do not share the same sample count.")]
    IncompleteMultisample,
    #[error("Unknown framebuffer status {0:#x}.")]
    Unknown(GLenum),
}

impl From<FramebufferError> for DeviceError {
    fn from(e: FramebufferError) -> Self {
        DeviceError::IncompleteFramebuffer(e.to_string())
    }
}

/// Scene G-buffer: one colour texture per channel plus a sampled depth texture.
#[derive(Debug)]
pub struct GBuffer {
    id: GLuint,
    size: UVec2,
    samples: Msaa,
    attachments: [Option<GLuint>; ATTACHMENT_SLOTS],
    depth: GLuint,
    draw_channels: Vec<GBufferChannel>,
}

impl GBuffer {
    pub fn new(label: &str, size: UVec2, samples: Msaa) -> Result<Self, DeviceError> {
        let label = object_label("framebuffer", label)?;

        let mut id: GLuint = 0;
        unsafe {
            gl::CreateFramebuffers(1, &mut id);
            gl::ObjectLabel(gl::FRAMEBUFFER, id, -1, label.as_ptr());
        }

        let mut attachments = [None; ATTACHMENT_SLOTS];
        for channel in GBufferChannel::ALL.iter() {
            let texture = Self::create_texture(size, samples, COLOR_FORMAT, mip_levels(*channel, size, samples));
            unsafe {
                gl::NamedFramebufferTexture(
                    id,
                    gl::COLOR_ATTACHMENT0 + channel.attachment_index(),
                    texture,
                    0,
                );
            }
            attachments[channel.attachment_index() as usize] = Some(texture);
        }

        let depth = Self::create_texture(size, samples, DEPTH_FORMAT, 1);
        unsafe { gl::NamedFramebufferTexture(id, gl::DEPTH_ATTACHMENT, depth, 0) }

        let mut gbuffer = GBuffer {
            id,
            size,
            samples,
            attachments,
            depth,
            draw_channels: vec![],
        };
        gbuffer.set_draw_channels(&GBufferChannel::ALL);

        Self::check_status(id)?;

        Ok(gbuffer)
    }

    fn create_texture(size: UVec2, samples: Msaa, format: GLenum, levels: i32) -> GLuint {
        let mut texture: GLuint = 0;
        unsafe {
            match samples {
                Msaa::None => {
                    gl::CreateTextures(gl::TEXTURE_2D, 1, &mut texture);
                    gl::TextureStorage2D(texture, levels, format, size.x as i32, size.y as i32);
                }
                _ => {
                    gl::CreateTextures(gl::TEXTURE_2D_MULTISAMPLE, 1, &mut texture);
                    gl::TextureStorage2DMultisample(
                        texture,
                        samples.samples() as i32,
                        format,
                        size.x as i32,
                        size.y as i32,
                        gl::TRUE,
                    );
                }
            }
        }
        texture
    }

    pub fn bind(&self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, self.id) }
        StateManager::set_viewport(0, 0, self.size.x as i32, self.size.y as i32);
    }

    pub fn set_draw_channels(&mut self, channels: &[GBufferChannel]) {
        let buffers = draw_buffers(channels);
        unsafe { gl::NamedFramebufferDrawBuffers(self.id, buffers.len() as i32, buffers.as_ptr()) }
        self.draw_channels = channels.to_vec();
    }

    pub fn clear_channel(&self, channel: GBufferChannel, color: &Vec4) {
        match draw_buffer_slot(&self.draw_channels, channel) {
            Some(slot) => unsafe {
                gl::ClearNamedFramebufferfv(self.id, gl::COLOR, slot as i32, color.as_ptr())
            },
            None => warn!(
                "Cannot clear {:?}, it is not one of the active draw channels {:?}.",
                channel, self.draw_channels
            ),
        }
    }

    /// Copies `source` into `destination`; the active draw channels are restored afterwards.
    pub fn blit_channel(&self, source: GBufferChannel, destination: GBufferChannel) {
        let buffers = draw_buffers(&self.draw_channels);
        unsafe {
            gl::NamedFramebufferReadBuffer(self.id, gl::COLOR_ATTACHMENT0 + source.attachment_index());
            gl::NamedFramebufferDrawBuffer(
                self.id,
                gl::COLOR_ATTACHMENT0 + destination.attachment_index(),
            );

            gl::BlitNamedFramebuffer(
                self.id,
                self.id,
                0,
                0,
                self.size.x as i32,
                self.size.y as i32,
                0,
                0,
                self.size.x as i32,
                self.size.y as i32,
                gl::COLOR_BUFFER_BIT,
                gl::NEAREST,
            );

            gl::NamedFramebufferReadBuffer(self.id, gl::COLOR_ATTACHMENT0);
            gl::NamedFramebufferDrawBuffers(self.id, buffers.len() as i32, buffers.as_ptr());
        }
    }

    /// Blits the colour channel into the default framebuffer.
    pub fn present(&self, window_size: UVec2) {
        unsafe {
            gl::NamedFramebufferReadBuffer(
                self.id,
                gl::COLOR_ATTACHMENT0 + GBufferChannel::Color.attachment_index(),
            );
            gl::BlitNamedFramebuffer(
                self.id,
                0,
                0,
                0,
                self.size.x as i32,
                self.size.y as i32,
                0,
                0,
                window_size.x as i32,
                window_size.y as i32,
                gl::COLOR_BUFFER_BIT,
                gl::LINEAR,
            );
            gl::NamedFramebufferReadBuffer(self.id, gl::COLOR_ATTACHMENT0);
        }
    }

    pub fn channel_texture(&self, channel: GBufferChannel) -> Option<GLuint> {
        self.attachments[channel.attachment_index() as usize]
    }

    pub fn depth_texture(&self) -> GLuint {
        self.depth
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn samples(&self) -> Msaa {
        self.samples
    }

    fn check_status(id: GLuint) -> Result<(), FramebufferError> {
        let status = unsafe { gl::CheckNamedFramebufferStatus(id, gl::DRAW_FRAMEBUFFER) };

        match status {
            gl::FRAMEBUFFER_COMPLETE => Ok(()),
            gl::FRAMEBUFFER_UNDEFINED => Err(FramebufferError::Undefined),
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Err(FramebufferError::IncompleteAttachment),
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                Err(FramebufferError::IncompleteMissingAttachment)
            }
            gl::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => Err(FramebufferError::IncompleteDrawBuffer),
            gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => Err(FramebufferError::IncompleteMultisample),
            other => Err(FramebufferError::Unknown(other)),
        }
    }
}

impl Drop for GBuffer {
    fn drop(&mut self) {
        let textures = self
            .attachments
            .iter()
            .flatten()
            .copied()
            .chain(std::iter::once(self.depth))
            .collect::<Vec<_>>();

        unsafe {
            gl::DeleteTextures(textures.len() as i32, textures.as_ptr());
            gl::DeleteFramebuffers(1, &self.id);
        }
    }
}

fn draw_buffers(channels: &[GBufferChannel]) -> Vec<GLenum> {
    channels
        .iter()
        .map(|channel| gl::COLOR_ATTACHMENT0 + channel.attachment_index())
        .collect()
}

/// `glClearBuffer` addresses draw buffer slots, not attachment points.
fn draw_buffer_slot(draw_channels: &[GBufferChannel], channel: GBufferChannel) -> Option<usize> {
    draw_channels.iter().position(|&active| active == channel)
}

/// Only the single-sampled emissive channel carries a mip chain, used for the nebula glow.
fn mip_levels(channel: GBufferChannel, size: UVec2, samples: Msaa) -> i32 {
    if channel != GBufferChannel::Emissive || samples.is_enabled() {
        return 1;
    }
    let largest = size.x.max(size.y).max(1);
    (32 - largest.leading_zeros()) as i32
}
