use bytemuck::{Pod, Zeroable};

/// Interleaved mirror quad vertex: position (vec3) followed by uv (vec2).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Byte stride of [`QuadVertex`].
pub const QUAD_VERTEX_STRIDE: u64 = 20;
/// Byte offset of the uv attribute inside [`QuadVertex`].
pub const QUAD_UV_OFFSET: u64 = 12;

const _: () = assert!(std::mem::size_of::<QuadVertex>() == QUAD_VERTEX_STRIDE as usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_vertex_layout() {
        let v = QuadVertex {
            position: [1.0, 2.0, 3.0],
            uv: [0.25, 0.75],
        };
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 20);
        let uv: [f32; 2] = bytemuck::pod_read_unaligned(&bytes[QUAD_UV_OFFSET as usize..]);
        assert_eq!(uv, [0.25, 0.75]);
    }
}
