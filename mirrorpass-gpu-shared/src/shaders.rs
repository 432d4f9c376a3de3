//! Embedded WGSL shader source strings.
//! Both shaders share the per-view block at group 0 and the per-object block at group 1.

pub const LIT_MESH_SHADER: &str = include_str!("../shaders/lit_mesh.wgsl");
pub const MIRROR_QUAD_SHADER: &str = include_str!("../shaders/mirror_quad.wgsl");
