//! Data shared between the MirrorPass core and GPU backends: vertex layouts,
//! uniform block layouts and embedded WGSL sources.

pub mod shaders;
pub mod uniforms;
pub mod vertex;
