use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};
use mirrorpass_gpu_shared::uniforms::{PerObjectUniforms, PerViewUniforms};
use mirrorpass_render::camera::LensProjection;
use mirrorpass_render::engine::{
    Aabb, CameraHandle, EntityHandle, FilterMode, GeometryConfig, GeometryHandle, MaterialConfig,
    MaterialHandle, RenderEngine, RenderTargetConfig, RenderTargetHandle, RenderableConfig,
    Resource, SceneHandle, TextureConfig, TextureHandle, ViewConfig, ViewHandle, Viewport,
};
use mirrorpass_render::error::EngineError;
use wgpu::util::DeviceExt;

use crate::culling::Frustum;
use crate::handle::HandleStore;
use crate::passes::scene::{render_scene_pass, DrawItem};
use crate::pipeline::{BindGroupLayouts, PipelineSet};
use crate::render_targets::{self, GpuTexture, RenderTarget};

/// GPU mesh with vertex and index buffers.
pub struct GpuGeometry {
    /// Interleaved [`QuadVertex`](mirrorpass_gpu_shared::vertex::QuadVertex) data
    /// for mirror quads, bare positions for lit meshes.
    pub vertex_buffer: wgpu::Buffer,
    /// Present only on lit meshes.
    pub normal_buffer: Option<wgpu::Buffer>,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub index_count: u32,
    /// Object-space bounds.
    pub bounds: Aabb,
}

struct GpuMaterial {
    texture: u64,
    bind_group: wgpu::BindGroup,
}

struct GpuCamera {
    eye: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl Default for GpuCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

struct GpuView {
    label: &'static str,
    scene: u64,
    camera: u64,
    target: u64,
    viewport: Viewport,
    clear_color: wgpu::Color,
}

enum Shading {
    /// Unlit, samples a material texture.
    Mirror { material: u64 },
    Lit { base_color: [f32; 4] },
}

struct GpuEntity {
    geometry: u64,
    shading: Shading,
    transform: Mat4,
    bounds: Aabb,
    culling: bool,
}

/// Directional sun plus ambient term applied to lit meshes of one scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLighting {
    /// Direction the light travels.
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub sun_intensity: f32,
    pub ambient: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            sun_direction: Vec3::new(0.0, -1.0, 0.0),
            sun_color: Vec3::ONE,
            sun_intensity: 1.0,
            ambient: Vec3::splat(0.1),
        }
    }
}

#[derive(Default)]
struct GpuScene {
    entities: Vec<u64>,
    lighting: SceneLighting,
}

fn unknown(kind: &'static str, handle: u64) -> EngineError {
    EngineError::UnknownHandle { kind, handle }
}

/// Run `create` inside validation and out-of-memory error scopes.
fn scoped<T>(
    device: &wgpu::Device,
    resource: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, EngineError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(err) => Err(EngineError::Allocation {
            resource,
            reason: err.to_string(),
        }),
        None => Ok(value),
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn object_uniforms(model: Mat4, base_color: [f32; 4]) -> PerObjectUniforms {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    PerObjectUniforms {
        model: model.to_cols_array_2d(),
        normal_matrix_col0: normal.x_axis.extend(0.0).to_array(),
        normal_matrix_col1: normal.y_axis.extend(0.0).to_array(),
        normal_matrix_col2: normal.z_axis.extend(0.0).to_array(),
        base_color,
    }
}

/// Headless wgpu implementation of [`RenderEngine`].
///
/// Every `render_view` call records and submits its own command buffer, so
/// submissions reach the queue in call order.
pub struct WgpuEngine {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    layouts: BindGroupLayouts,
    pipelines: HashMap<(wgpu::TextureFormat, bool), PipelineSet>,

    textures: HandleStore<GpuTexture>,
    render_targets: HandleStore<RenderTarget>,
    cameras: HandleStore<GpuCamera>,
    views: HandleStore<GpuView>,
    geometries: HandleStore<GpuGeometry>,
    materials: HandleStore<GpuMaterial>,
    entities: HandleStore<GpuEntity>,
    scenes: HandleStore<GpuScene>,
}

impl WgpuEngine {
    /// Create a device without a surface; views render into textures only.
    pub fn new_headless() -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| EngineError::Initialization("no suitable GPU adapter".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("MirrorPass Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|e| EngineError::Initialization(format!("failed to create device: {e}")))?;

        let info = adapter.get_info();
        log::info!("wgpu backend initialized: {} ({})", info.name, info.backend.to_str());

        Ok(Self {
            layouts: BindGroupLayouts::new(&device),
            device,
            queue,
            pipelines: HashMap::new(),
            textures: HandleStore::new(),
            render_targets: HandleStore::new(),
            cameras: HandleStore::new(),
            views: HandleStore::new(),
            geometries: HandleStore::new(),
            materials: HandleStore::new(),
            entities: HandleStore::new(),
            scenes: HandleStore::new(),
        })
    }

    pub fn create_scene(&mut self) -> SceneHandle {
        SceneHandle(self.scenes.insert(GpuScene::default()))
    }

    pub fn set_scene_lighting(
        &mut self,
        scene: SceneHandle,
        lighting: SceneLighting,
    ) -> Result<(), EngineError> {
        let scene = self
            .scenes
            .get_mut(scene.0)
            .ok_or_else(|| unknown("Scene", scene.0))?;
        scene.lighting = lighting;
        Ok(())
    }

    /// Upload an indexed triangle mesh for the lit pipeline.
    pub fn upload_mesh(
        &mut self,
        label: &'static str,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        indices: &[u32],
    ) -> Result<GeometryHandle, EngineError> {
        if positions.is_empty() || positions.len() != normals.len() || indices.is_empty() {
            return Err(EngineError::Allocation {
                resource: label,
                reason: format!(
                    "mesh needs matching positions/normals and indices, got {}/{}/{}",
                    positions.len(),
                    normals.len(),
                    indices.len()
                ),
            });
        }
        let points: Vec<Vec3> = positions.iter().copied().map(Vec3::from_array).collect();
        let device = &self.device;
        let geometry = scoped(device, label, || GpuGeometry {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Position Buffer"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            normal_buffer: Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Normal Buffer"),
                contents: bytemuck::cast_slice(normals),
                usage: wgpu::BufferUsages::VERTEX,
            })),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_format: wgpu::IndexFormat::Uint32,
            index_count: indices.len() as u32,
            bounds: Aabb::from_points(&points),
        })?;
        Ok(GeometryHandle(self.geometries.insert(geometry)))
    }

    /// Place a lit mesh; its transform starts at identity.
    pub fn create_lit_renderable(
        &mut self,
        geometry: GeometryHandle,
        base_color: [f32; 4],
        culling: bool,
    ) -> Result<EntityHandle, EngineError> {
        let mesh = self
            .geometries
            .get(geometry.0)
            .ok_or_else(|| unknown("Geometry", geometry.0))?;
        if mesh.normal_buffer.is_none() {
            return Err(EngineError::Allocation {
                resource: "lit renderable",
                reason: "geometry has no normals".to_string(),
            });
        }
        let entity = GpuEntity {
            geometry: geometry.0,
            shading: Shading::Lit { base_color },
            transform: Mat4::IDENTITY,
            bounds: mesh.bounds,
            culling,
        };
        Ok(EntityHandle(self.entities.insert(entity)))
    }

    pub fn set_transform(&mut self, entity: EntityHandle, transform: Mat4) -> Result<(), EngineError> {
        let e = self
            .entities
            .get_mut(entity.0)
            .ok_or_else(|| unknown("Entity", entity.0))?;
        e.transform = transform;
        Ok(())
    }

    /// Number of live objects across all stores, scenes excluded.
    pub fn live_resources(&self) -> usize {
        self.textures.len()
            + self.render_targets.len()
            + self.cameras.len()
            + self.views.len()
            + self.geometries.len()
            + self.materials.len()
            + self.entities.len()
    }

    /// Copy an 8-bit RGBA texture back to the CPU.
    pub fn read_texture(&self, texture: TextureHandle) -> Result<image::RgbaImage, EngineError> {
        let tex = self
            .textures
            .get(texture.0)
            .ok_or_else(|| unknown("Texture", texture.0))?;
        if tex.format != wgpu::TextureFormat::Rgba8UnormSrgb {
            return Err(EngineError::Readback(format!(
                "unsupported readback format {:?}",
                tex.format
            )));
        }

        let (width, height) = (tex.width, tex.height);
        let padded = render_targets::padded_bytes_per_row(width, 4);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| EngineError::Readback(e.to_string()))?
            .map_err(|e| EngineError::Readback(e.to_string()))?;

        let pixels = {
            let data = slice.get_mapped_range();
            render_targets::unpad_rows(&data, width, height, 4)
        };
        buffer.unmap();

        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| EngineError::Readback("pixel buffer size mismatch".to_string()))
    }

    fn per_view_bind_group(&self, camera: &GpuCamera, lighting: &SceneLighting) -> wgpu::BindGroup {
        let uniforms = PerViewUniforms {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            sun_direction: lighting.sun_direction.normalize_or_zero().extend(0.0).to_array(),
            sun_color: lighting.sun_color.extend(lighting.sun_intensity).to_array(),
            ambient: lighting.ambient.extend(0.0).to_array(),
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Per-View Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Per-View BG"),
            layout: &self.layouts.per_view,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}

impl RenderEngine for WgpuEngine {
    fn create_texture(&mut self, config: &TextureConfig) -> Result<TextureHandle, EngineError> {
        if config.width == 0 || config.height == 0 {
            return Err(EngineError::Allocation {
                resource: config.label,
                reason: format!("zero-sized texture {}x{}", config.width, config.height),
            });
        }
        let device = &self.device;
        let texture = scoped(device, config.label, || {
            render_targets::create_color_texture(
                device,
                config.label,
                config.width,
                config.height,
                config.levels,
                render_targets::texture_format(config.format),
                render_targets::texture_usages(config.usage),
            )
        })?;
        let id = self.textures.insert(texture);
        log::debug!("Created texture {id} '{}' ({}x{})", config.label, config.width, config.height);
        Ok(TextureHandle(id))
    }

    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig,
    ) -> Result<RenderTargetHandle, EngineError> {
        let color = self
            .textures
            .get(config.color.0)
            .ok_or_else(|| unknown("Texture", config.color.0))?;
        if !color.texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return Err(EngineError::Allocation {
                resource: config.label,
                reason: "color texture is not a render attachment".to_string(),
            });
        }
        let device = &self.device;
        let target = scoped(device, config.label, || {
            render_targets::create_render_target(
                device,
                config.label,
                config.color.0,
                color,
                config.with_depth,
            )
        })?;
        Ok(RenderTargetHandle(self.render_targets.insert(target)))
    }

    fn create_camera(&mut self) -> Result<CameraHandle, EngineError> {
        Ok(CameraHandle(self.cameras.insert(GpuCamera::default())))
    }

    fn create_view(&mut self, config: &ViewConfig) -> Result<ViewHandle, EngineError> {
        if self.scenes.get(config.scene.0).is_none() {
            return Err(unknown("Scene", config.scene.0));
        }
        if self.cameras.get(config.camera.0).is_none() {
            return Err(unknown("Camera", config.camera.0));
        }
        let target = self
            .render_targets
            .get(config.target.0)
            .ok_or_else(|| unknown("RenderTarget", config.target.0))?;
        let vp = config.viewport;
        if vp.width == 0 || vp.height == 0 || vp.x + vp.width > target.width || vp.y + vp.height > target.height {
            return Err(EngineError::Allocation {
                resource: config.label,
                reason: format!(
                    "viewport {vp:?} does not fit a {}x{} target",
                    target.width, target.height
                ),
            });
        }
        let [r, g, b, a] = config.clear_color;
        let view = GpuView {
            label: config.label,
            scene: config.scene.0,
            camera: config.camera.0,
            target: config.target.0,
            viewport: vp,
            clear_color: wgpu::Color { r, g, b, a },
        };
        Ok(ViewHandle(self.views.insert(view)))
    }

    fn create_geometry(&mut self, config: &GeometryConfig<'_>) -> Result<GeometryHandle, EngineError> {
        if config.vertices.is_empty() || config.indices.is_empty() {
            return Err(EngineError::Allocation {
                resource: config.label,
                reason: "empty geometry".to_string(),
            });
        }
        let points: Vec<Vec3> = config
            .vertices
            .iter()
            .map(|v| Vec3::from_array(v.position))
            .collect();
        let device = &self.device;
        let geometry = scoped(device, config.label, || GpuGeometry {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(config.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            normal_buffer: None,
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Index Buffer"),
                contents: bytemuck::cast_slice(config.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_format: wgpu::IndexFormat::Uint16,
            index_count: config.indices.len() as u32,
            bounds: Aabb::from_points(&points),
        })?;
        Ok(GeometryHandle(self.geometries.insert(geometry)))
    }

    fn create_material(&mut self, config: &MaterialConfig) -> Result<MaterialHandle, EngineError> {
        let texture = self
            .textures
            .get(config.texture.0)
            .ok_or_else(|| unknown("Texture", config.texture.0))?;
        if !texture.texture.usage().contains(wgpu::TextureUsages::TEXTURE_BINDING) {
            return Err(EngineError::Allocation {
                resource: config.label,
                reason: "texture is not sampleable".to_string(),
            });
        }
        let device = &self.device;
        let layout = &self.layouts.material;
        let bind_group = scoped(device, config.label, || {
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(config.label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter_mode(config.sampler.mag_filter),
                min_filter: filter_mode(config.sampler.min_filter),
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(config.label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        })?;
        let material = GpuMaterial {
            texture: config.texture.0,
            bind_group,
        };
        Ok(MaterialHandle(self.materials.insert(material)))
    }

    fn create_renderable(&mut self, config: &RenderableConfig) -> Result<EntityHandle, EngineError> {
        if self.geometries.get(config.geometry.0).is_none() {
            return Err(unknown("Geometry", config.geometry.0));
        }
        if self.materials.get(config.material.0).is_none() {
            return Err(unknown("Material", config.material.0));
        }
        if config.cast_shadows || config.receive_shadows {
            log::debug!("'{}': shadows are not rendered by this backend", config.label);
        }
        let entity = GpuEntity {
            geometry: config.geometry.0,
            shading: Shading::Mirror {
                material: config.material.0,
            },
            transform: Mat4::IDENTITY,
            bounds: config.bounds,
            culling: config.culling,
        };
        Ok(EntityHandle(self.entities.insert(entity)))
    }

    fn add_to_scene(&mut self, scene: SceneHandle, entity: EntityHandle) -> Result<(), EngineError> {
        if self.entities.get(entity.0).is_none() {
            return Err(unknown("Entity", entity.0));
        }
        let scene = self
            .scenes
            .get_mut(scene.0)
            .ok_or_else(|| unknown("Scene", scene.0))?;
        if !scene.entities.contains(&entity.0) {
            scene.entities.push(entity.0);
        }
        Ok(())
    }

    fn remove_from_scene(&mut self, scene: SceneHandle, entity: EntityHandle) {
        match self.scenes.get_mut(scene.0) {
            Some(scene) => scene.entities.retain(|&e| e != entity.0),
            None => log::warn!("remove_from_scene: unknown scene {}", scene.0),
        }
    }

    fn set_camera_look_at(
        &mut self,
        camera: CameraHandle,
        eye: Vec3,
        target: Vec3,
        up: Vec3,
    ) -> Result<(), EngineError> {
        let cam = self
            .cameras
            .get_mut(camera.0)
            .ok_or_else(|| unknown("Camera", camera.0))?;
        cam.eye = eye;
        cam.view = Mat4::look_at_rh(eye, target, up);
        Ok(())
    }

    fn set_camera_projection(
        &mut self,
        camera: CameraHandle,
        lens: &LensProjection,
    ) -> Result<(), EngineError> {
        let cam = self
            .cameras
            .get_mut(camera.0)
            .ok_or_else(|| unknown("Camera", camera.0))?;
        cam.projection = lens.matrix();
        Ok(())
    }

    fn render_view(&mut self, view: ViewHandle) -> Result<(), EngineError> {
        let v = self.views.get(view.0).ok_or_else(|| unknown("View", view.0))?;
        let camera = self
            .cameras
            .get(v.camera)
            .ok_or_else(|| unknown("Camera", v.camera))?;
        let target = self
            .render_targets
            .get(v.target)
            .ok_or_else(|| unknown("RenderTarget", v.target))?;
        let scene = self
            .scenes
            .get(v.scene)
            .ok_or_else(|| unknown("Scene", v.scene))?;

        let key = (target.format, target.depth_view.is_some());
        if !self.pipelines.contains_key(&key) {
            let (device, layouts) = (&self.device, &self.layouts);
            let set = scoped(device, "scene pipelines", || {
                PipelineSet::new(device, layouts, key.0, key.1)
            })?;
            self.pipelines.insert(key, set);
        }
        let Some(pipelines) = self.pipelines.get(&key) else {
            return Err(EngineError::Submission(format!("no pipelines for {key:?}")));
        };

        let frustum = Frustum::from_view_projection(camera.projection * camera.view);
        let mut items = Vec::with_capacity(scene.entities.len());
        let mut culled = 0usize;
        for &id in &scene.entities {
            let Some(entity) = self.entities.get(id) else {
                continue;
            };
            let Some(geometry) = self.geometries.get(entity.geometry) else {
                continue;
            };
            if entity.culling && !frustum.intersects_aabb(&entity.bounds.transformed(entity.transform)) {
                culled += 1;
                continue;
            }
            let (material, base_color) = match entity.shading {
                Shading::Mirror { material } => {
                    let Some(material) = self.materials.get(material) else {
                        continue;
                    };
                    // A view cannot sample the texture it is rendering into.
                    if material.texture == target.color {
                        log::trace!("'{}': skipping entity {id} that samples the view's own target", v.label);
                        continue;
                    }
                    (Some(&material.bind_group), [1.0; 4])
                }
                Shading::Lit { base_color } => (None, base_color),
            };
            items.push(DrawItem {
                geometry,
                per_object: object_uniforms(entity.transform, base_color),
                material,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let per_view_bg = self.per_view_bind_group(camera, &scene.lighting);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(v.label),
            });
        render_scene_pass(
            &mut encoder,
            &self.device,
            &self.queue,
            target,
            pipelines,
            &self.layouts,
            &per_view_bg,
            v.clear_color,
            &v.viewport,
            &items,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(EngineError::Submission(format!("'{}': {err}", v.label)));
        }

        log::trace!("Rendered '{}': {} draws, {culled} culled", v.label, items.len());
        Ok(())
    }

    fn destroy(&mut self, resource: Resource) {
        let found = match resource {
            Resource::Texture(h) => self.textures.remove(h.0).map(|t| t.texture.destroy()).is_some(),
            Resource::RenderTarget(h) => self.render_targets.remove(h.0).is_some(),
            Resource::Camera(h) => self.cameras.remove(h.0).is_some(),
            Resource::View(h) => self.views.remove(h.0).is_some(),
            Resource::Geometry(h) => self.geometries.remove(h.0).is_some(),
            Resource::Material(h) => self.materials.remove(h.0).is_some(),
            Resource::Entity(h) => {
                for scene in self.scenes.values_mut() {
                    scene.entities.retain(|&e| e != h.0);
                }
                self.entities.remove(h.0).is_some()
            }
        };
        if !found {
            log::warn!("destroy: {} already released", resource.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_uniforms_normal_matrix_undoes_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = object_uniforms(model, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(u.normal_matrix_col0, [0.5, 0.0, 0.0, 0.0]);
        assert_eq!(u.normal_matrix_col1, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(u.base_color, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_headless_mirror_frame_and_teardown() {
        use mirrorpass_render::engine::{PixelFormat, TextureUsage};
        use mirrorpass_render::{CameraPose, MirrorConfig, MirrorContext, PrimaryCamera};

        let _ = env_logger::builder().is_test(true).try_init();
        let mut engine = match WgpuEngine::new_headless() {
            Ok(engine) => engine,
            Err(err) => {
                eprintln!("skipping: {err}");
                return;
            }
        };
        let scene = engine.create_scene();

        let mut config = MirrorConfig::default();
        config.offscreen.width = 64;
        config.offscreen.height = 64;
        let mut mirror = MirrorContext::setup(&mut engine, scene, &config).unwrap();

        let color = engine
            .create_texture(&TextureConfig {
                label: "Primary Color",
                width: 32,
                height: 32,
                levels: 1,
                format: PixelFormat::Rgba8,
                usage: TextureUsage {
                    color_attachment: true,
                    sampleable: false,
                },
            })
            .unwrap();
        let target = engine
            .create_render_target(&RenderTargetConfig {
                label: "Primary Target",
                color,
                with_depth: true,
            })
            .unwrap();
        let camera = engine.create_camera().unwrap();
        let view = engine
            .create_view(&ViewConfig {
                label: "Primary View",
                scene,
                camera,
                target,
                viewport: Viewport::full(32, 32),
                clear_color: [0.0, 0.0, 0.0, 1.0],
            })
            .unwrap();

        let pose = CameraPose::look_at(Vec3::new(0.0, 0.0, 4.0), Vec3::new(-2.0, 0.0, -5.0), Vec3::Y);
        let lens = LensProjection {
            focal_length_mm: 28.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        };
        engine.set_camera_look_at(camera, pose.eye, pose.target(), pose.up).unwrap();
        engine.set_camera_projection(camera, &lens).unwrap();

        mirror
            .frame(&mut engine, 0.0, &PrimaryCamera::new(pose, 28.0), view)
            .unwrap();

        let reflection = engine.read_texture(mirror.offscreen().texture()).unwrap();
        assert_eq!(reflection.dimensions(), (64, 64));

        // The primary camera looks straight at the mirror, which shows the
        // offscreen clear color.
        let primary = engine.read_texture(color).unwrap();
        let center = primary.get_pixel(16, 16).0;
        assert!(center[2] > center[0], "expected bluish mirror texel, got {center:?}");

        mirror.teardown(&mut engine);
        assert_eq!(engine.live_resources(), 4);
    }

    #[test]
    fn test_filter_mode_mapping() {
        assert_eq!(filter_mode(FilterMode::Linear), wgpu::FilterMode::Linear);
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
    }
}
