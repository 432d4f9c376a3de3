//! Forward scene pass: clear the target, then draw lit meshes and mirror quads.

use mirrorpass_gpu_shared::uniforms::PerObjectUniforms;
use mirrorpass_render::engine::Viewport;

use crate::backend::GpuGeometry;
use crate::pipeline::{BindGroupLayouts, PipelineSet};
use crate::render_targets::RenderTarget;

/// One draw recorded into the scene pass.
pub struct DrawItem<'a> {
    pub geometry: &'a GpuGeometry,
    pub per_object: PerObjectUniforms,
    /// Mirror material bind group; `None` draws with the lit pipeline.
    pub material: Option<&'a wgpu::BindGroup>,
}

/// Record a full scene render into `target`.
pub fn render_scene_pass(
    encoder: &mut wgpu::CommandEncoder,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &RenderTarget,
    pipelines: &PipelineSet,
    layouts: &BindGroupLayouts,
    per_view_bg: &wgpu::BindGroup,
    clear_color: wgpu::Color,
    viewport: &Viewport,
    items: &[DrawItem<'_>],
) {
    // One buffer per draw: queue.write_buffer is staged, so reusing a single
    // buffer would leave every draw with the last write.
    let object_bind_groups: Vec<wgpu::BindGroup> = items
        .iter()
        .map(|item| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Scene Per-Object UBO"),
                size: std::mem::size_of::<PerObjectUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            queue.write_buffer(&buffer, 0, bytemuck::bytes_of(&item.per_object));
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Per-Object BG"),
                layout: &layouts.per_object,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        })
        .collect();

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Scene Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: target.depth_view.as_ref().map(|view| {
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }
        }),
        ..Default::default()
    });

    pass.set_viewport(
        viewport.x as f32,
        viewport.y as f32,
        viewport.width as f32,
        viewport.height as f32,
        0.0,
        1.0,
    );
    pass.set_bind_group(0, per_view_bg, &[]);

    for (item, object_bg) in items.iter().zip(&object_bind_groups) {
        let mesh = item.geometry;
        match item.material {
            Some(material_bg) => {
                pass.set_pipeline(&pipelines.mirror_quad);
                pass.set_bind_group(2, material_bg, &[]);
            }
            None => {
                pass.set_pipeline(&pipelines.lit);
                let Some(normals) = mesh.normal_buffer.as_ref() else {
                    log::warn!("Skipping lit draw of geometry without normals");
                    continue;
                };
                pass.set_vertex_buffer(1, normals.slice(..));
            }
        }
        pass.set_bind_group(1, object_bg, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), mesh.index_format);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}
