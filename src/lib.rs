// crevice's AsStd140 derive emits deeply nested padding consts that trip this lint.
#![allow(long_running_const_eval)]

#[macro_use]
extern crate bitflags;

pub mod core;
pub mod rendering;

pub use crate::core::{ConfigError, LightingMode, Msaa, Settings, ShadowQuality};
pub use crate::rendering::deferred::{DeferredRenderer, LightingFrame};
pub use crate::rendering::device::{DeviceError, GraphicsDevice};
pub use crate::rendering::light::{Light, LightKind};
