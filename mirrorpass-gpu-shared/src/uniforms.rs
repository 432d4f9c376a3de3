use bytemuck::{Pod, Zeroable};

/// Per-view uniform data: matches GPU bind group 0, binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PerViewUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// xyz = direction the sun light travels (world space), w unused.
    pub sun_direction: [f32; 4],
    /// rgb = linear color, a = intensity.
    pub sun_color: [f32; 4],
    /// rgb = ambient term, a unused.
    pub ambient: [f32; 4],
}

/// Per-object uniform data: matches GPU bind group 1, binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PerObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix_col0: [f32; 4],
    pub normal_matrix_col1: [f32; 4],
    pub normal_matrix_col2: [f32; 4],
    /// Multiplied into lit color; the mirror quad uses it as a tint.
    pub base_color: [f32; 4],
}
