//! MirrorPass core: planar mirror reflections rendered in two passes.
//!
//! Every frame the primary camera is reflected across the mirror plane, the
//! scene is rendered from the reflected camera into an offscreen texture, and
//! the mirror quad samples that texture during the primary pass.
//!
//! The rendering engine itself is reached only through [`engine::RenderEngine`];
//! `mirrorpass-wgpu` provides the wgpu implementation.

pub mod camera;
pub mod composite;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod offscreen;
pub mod plane;
pub mod scheduler;
pub mod solver;

#[cfg(test)]
mod mock;

pub use camera::{CameraPose, LensProjection, PrimaryCamera};
pub use config::MirrorConfig;
pub use context::MirrorContext;
pub use engine::RenderEngine;
pub use error::{EngineError, MirrorError};
pub use plane::ReflectionPlane;
pub use scheduler::{FrameOutcome, FrameStats};
pub use solver::{reflect, reflect_camera, MirrorCameraSolver, MirrorSolution};
