//! Recording engine for unit tests.

use glam::Vec3;
use mirrorpass_gpu_shared::vertex::QuadVertex;

use crate::camera::LensProjection;
use crate::engine::*;
use crate::error::EngineError;

pub const SCENE: SceneHandle = SceneHandle(1);

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Created(Resource),
    AddedToScene(SceneHandle, EntityHandle),
    RemovedFromScene(SceneHandle, EntityHandle),
    LookAt {
        camera: CameraHandle,
        eye: Vec3,
        target: Vec3,
        up: Vec3,
    },
    Projection {
        camera: CameraHandle,
        lens: LensProjection,
    },
    Rendered(ViewHandle),
    Destroyed(Resource),
}

#[derive(Debug, Default)]
pub struct MockEngine {
    pub events: Vec<Event>,
    pub textures: Vec<TextureConfig>,
    pub views: Vec<ViewConfig>,
    pub geometries: Vec<(Vec<QuadVertex>, Vec<u16>)>,
    pub materials: Vec<MaterialConfig>,
    pub renderables: Vec<RenderableConfig>,
    /// Operation name that fails: "texture", "render_target", "camera", "view",
    /// "geometry", "material", "renderable", "scene", "look_at", "projection" or "render".
    pub fail_on: Option<&'static str>,
    next_handle: u64,
}

impl MockEngine {
    pub fn failing_on(op: &'static str) -> Self {
        Self {
            fail_on: Some(op),
            ..Self::default()
        }
    }

    fn check(&self, op: &'static str) -> Result<(), EngineError> {
        if self.fail_on == Some(op) {
            return Err(EngineError::Allocation {
                resource: op,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn allocate<H: Into<Resource> + Copy>(
        &mut self,
        op: &'static str,
        make: fn(u64) -> H,
    ) -> Result<H, EngineError> {
        self.check(op)?;
        self.next_handle += 1;
        let handle = make(self.next_handle + 100);
        self.events.push(Event::Created(handle.into()));
        Ok(handle)
    }

    pub fn created(&self) -> Vec<Resource> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Created(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<Resource> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Destroyed(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn rendered_views(&self) -> Vec<ViewHandle> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Rendered(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn look_at_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::LookAt { .. }))
            .count()
    }

    pub fn last_look_at(&self, camera: CameraHandle) -> Option<(Vec3, Vec3, Vec3)> {
        self.events.iter().rev().find_map(|e| match e {
            Event::LookAt {
                camera: c,
                eye,
                target,
                up,
            } if *c == camera => Some((*eye, *target, *up)),
            _ => None,
        })
    }

    pub fn last_projection(&self, camera: CameraHandle) -> Option<LensProjection> {
        self.events.iter().rev().find_map(|e| match e {
            Event::Projection { camera: c, lens } if *c == camera => Some(*lens),
            _ => None,
        })
    }
}

impl RenderEngine for MockEngine {
    fn create_texture(&mut self, config: &TextureConfig) -> Result<TextureHandle, EngineError> {
        let handle = self.allocate("texture", TextureHandle)?;
        self.textures.push(*config);
        Ok(handle)
    }

    fn create_render_target(
        &mut self,
        _config: &RenderTargetConfig,
    ) -> Result<RenderTargetHandle, EngineError> {
        self.allocate("render_target", RenderTargetHandle)
    }

    fn create_camera(&mut self) -> Result<CameraHandle, EngineError> {
        self.allocate("camera", CameraHandle)
    }

    fn create_view(&mut self, config: &ViewConfig) -> Result<ViewHandle, EngineError> {
        let handle = self.allocate("view", ViewHandle)?;
        self.views.push(*config);
        Ok(handle)
    }

    fn create_geometry(&mut self, config: &GeometryConfig<'_>) -> Result<GeometryHandle, EngineError> {
        let handle = self.allocate("geometry", GeometryHandle)?;
        self.geometries
            .push((config.vertices.to_vec(), config.indices.to_vec()));
        Ok(handle)
    }

    fn create_material(&mut self, config: &MaterialConfig) -> Result<MaterialHandle, EngineError> {
        let handle = self.allocate("material", MaterialHandle)?;
        self.materials.push(*config);
        Ok(handle)
    }

    fn create_renderable(&mut self, config: &RenderableConfig) -> Result<EntityHandle, EngineError> {
        let handle = self.allocate("renderable", EntityHandle)?;
        self.renderables.push(*config);
        Ok(handle)
    }

    fn add_to_scene(&mut self, scene: SceneHandle, entity: EntityHandle) -> Result<(), EngineError> {
        self.check("scene")?;
        self.events.push(Event::AddedToScene(scene, entity));
        Ok(())
    }

    fn remove_from_scene(&mut self, scene: SceneHandle, entity: EntityHandle) {
        self.events.push(Event::RemovedFromScene(scene, entity));
    }

    fn set_camera_look_at(
        &mut self,
        camera: CameraHandle,
        eye: Vec3,
        target: Vec3,
        up: Vec3,
    ) -> Result<(), EngineError> {
        self.check("look_at")?;
        self.events.push(Event::LookAt {
            camera,
            eye,
            target,
            up,
        });
        Ok(())
    }

    fn set_camera_projection(
        &mut self,
        camera: CameraHandle,
        lens: &LensProjection,
    ) -> Result<(), EngineError> {
        self.check("projection")?;
        self.events.push(Event::Projection {
            camera,
            lens: *lens,
        });
        Ok(())
    }

    fn render_view(&mut self, view: ViewHandle) -> Result<(), EngineError> {
        if self.fail_on == Some("render") {
            return Err(EngineError::Submission("injected failure".to_string()));
        }
        self.events.push(Event::Rendered(view));
        Ok(())
    }

    fn destroy(&mut self, resource: Resource) {
        self.events.push(Event::Destroyed(resource));
    }
}
