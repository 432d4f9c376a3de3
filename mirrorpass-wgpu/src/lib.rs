//! Headless wgpu backend for MirrorPass.
//!
//! [`WgpuEngine`] implements [`mirrorpass_render::RenderEngine`] on top of a
//! surface-less wgpu device. Views render into textures, which can be read
//! back with [`WgpuEngine::read_texture`].

pub mod backend;
mod culling;
mod handle;
mod passes;
mod pipeline;
pub mod render_targets;

pub use backend::{SceneLighting, WgpuEngine};
