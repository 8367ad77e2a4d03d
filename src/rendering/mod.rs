pub mod buffer;
pub mod color;
pub mod deferred;
pub mod device;
pub mod light;
pub mod mesh;
#[cfg(feature = "opengl")]
pub mod opengl;
pub mod postprocess;
pub mod profile;
pub mod recorder;
pub mod sampler;
pub mod shader;
pub mod state;
