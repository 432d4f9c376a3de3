//! Render pass implementations.

pub mod scene;
