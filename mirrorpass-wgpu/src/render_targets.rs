//! Texture and render target creation, plus the row-padding arithmetic used
//! when copying a color texture back to the CPU.

use mirrorpass_render::engine::{PixelFormat, TextureUsage};

/// Depth format of every render target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Color texture with its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

/// Render destination: a borrowed color texture plus an optional owned depth buffer.
pub struct RenderTarget {
    /// Core handle of the color texture, used to detect self-sampling.
    pub color: u64,
    pub color_view: wgpu::TextureView,
    pub depth_texture: Option<wgpu::Texture>,
    pub depth_view: Option<wgpu::TextureView>,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

/// Copy source is always included so any texture can be read back.
pub fn texture_usages(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
    if usage.color_attachment {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if usage.sampleable {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    usages
}

pub fn create_color_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    levels: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.max(1),
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    // Level 0 only; the pass renders into the base level.
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        base_mip_level: 0,
        mip_level_count: Some(1),
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        format,
        width,
        height,
    }
}

/// Create a render target around an existing color texture.
pub fn create_render_target(
    device: &wgpu::Device,
    label: &str,
    color_handle: u64,
    color: &GpuTexture,
    with_depth: bool,
) -> RenderTarget {
    let color_view = color.texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        base_mip_level: 0,
        mip_level_count: Some(1),
        ..Default::default()
    });

    let (depth_texture, depth_view) = if with_depth {
        let dt = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} Depth")),
            size: wgpu::Extent3d {
                width: color.width,
                height: color.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let dv = dt.create_view(&wgpu::TextureViewDescriptor::default());
        (Some(dt), Some(dv))
    } else {
        (None, None)
    };

    RenderTarget {
        color: color_handle,
        color_view,
        depth_texture,
        depth_view,
        format: color.format,
        width: color.width,
        height: color.height,
    }
}

/// Row pitch of a texture-to-buffer copy, rounded up to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strip the per-row padding from a mapped readback buffer.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, bytes_per_pixel: u32) -> Vec<u8> {
    let row = (width * bytes_per_pixel) as usize;
    let padded = padded_bytes_per_row(width, bytes_per_pixel) as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded).take(height as usize) {
        pixels.extend_from_slice(&chunk[..row]);
    }
    pixels
}
