//! Offscreen pass: renders the scene from the reflected camera into a
//! fixed-resolution texture that the mirror quad samples.

use crate::camera::{CameraPose, LensProjection, DEFAULT_FOCAL_LENGTH_MM};
use crate::config::{OffscreenConfig, ProjectionConfig};
use crate::engine::{
    CameraHandle, RenderEngine, RenderTargetConfig, RenderTargetHandle, SceneHandle,
    TextureConfig, TextureHandle, TextureUsage, ViewConfig, ViewHandle, Viewport,
};
use crate::error::{EngineError, MirrorError};
use crate::ledger::ResourceLedger;

/// Texture, render target, camera and view of the mirror world render.
///
/// The texture handle is stable for the lifetime of the pass; only its
/// contents change, fully overwritten by every [`render`](Self::render).
#[derive(Debug)]
pub struct OffscreenRenderPass {
    texture: TextureHandle,
    render_target: RenderTargetHandle,
    camera: CameraHandle,
    view: ViewHandle,
    width: u32,
    height: u32,
    near: f64,
    far: f64,
    reflected: CameraPose,
    lens: LensProjection,
}

impl OffscreenRenderPass {
    /// Allocate the offscreen resources, each recorded in `ledger`.
    ///
    /// Any allocation failure aborts construction; whatever was already created
    /// stays in the ledger for the caller to release.
    pub fn new<E: RenderEngine + ?Sized>(
        engine: &mut E,
        ledger: &mut ResourceLedger,
        scene: SceneHandle,
        config: &OffscreenConfig,
        projection: &ProjectionConfig,
    ) -> Result<Self, MirrorError> {
        let (width, height) = (config.width, config.height);

        let texture = engine
            .create_texture(&TextureConfig {
                label: "Mirror Offscreen Color",
                width,
                height,
                levels: 1,
                format: config.format,
                usage: TextureUsage::RENDER_AND_SAMPLE,
            })
            .map_err(MirrorError::setup("offscreen texture"))?;
        ledger.track(texture);

        let render_target = engine
            .create_render_target(&RenderTargetConfig {
                label: "Mirror Offscreen Target",
                color: texture,
                with_depth: true,
            })
            .map_err(MirrorError::setup("offscreen render target"))?;
        ledger.track(render_target);

        let camera = engine
            .create_camera()
            .map_err(MirrorError::setup("reflected camera"))?;
        ledger.track(camera);

        let view = engine
            .create_view(&ViewConfig {
                label: "Mirror Offscreen View",
                scene,
                camera,
                target: render_target,
                viewport: Viewport::full(width, height),
                clear_color: config.clear_color,
            })
            .map_err(MirrorError::setup("offscreen view"))?;
        ledger.track(view);

        let mut pass = Self {
            texture,
            render_target,
            camera,
            view,
            width,
            height,
            near: projection.near,
            far: projection.far,
            reflected: CameraPose::default(),
            lens: LensProjection {
                focal_length_mm: DEFAULT_FOCAL_LENGTH_MM,
                aspect: width as f64 / height as f64,
                near: projection.near,
                far: projection.far,
            },
        };
        pass.update_camera(engine, CameraPose::default(), DEFAULT_FOCAL_LENGTH_MM)
            .map_err(MirrorError::setup("reflected camera"))?;

        log::info!("Offscreen mirror pass created ({width}x{height}, {:?})", config.format);
        Ok(pass)
    }

    /// Sampleable result of the pass.
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn render_target(&self) -> RenderTargetHandle {
        self.render_target
    }

    pub fn camera(&self) -> CameraHandle {
        self.camera
    }

    pub fn view(&self) -> ViewHandle {
        self.view
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Projection aspect ratio, fixed to the target resolution.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Reflected pose currently applied to the offscreen camera.
    pub fn reflected_pose(&self) -> &CameraPose {
        &self.reflected
    }

    pub fn lens(&self) -> &LensProjection {
        &self.lens
    }

    /// Point the reflected camera at `pose` and give it the primary camera's
    /// focal length with this pass's aspect ratio and near/far planes.
    pub fn update_camera<E: RenderEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        pose: CameraPose,
        focal_length_mm: f64,
    ) -> Result<(), EngineError> {
        let lens = LensProjection {
            focal_length_mm,
            aspect: self.aspect_ratio(),
            near: self.near,
            far: self.far,
        };
        // Each field follows the engine call that applied it, so a failed
        // projection leaves the new pose recorded next to the old lens.
        engine.set_camera_look_at(self.camera, pose.eye, pose.target(), pose.up)?;
        self.reflected = pose;
        engine.set_camera_projection(self.camera, &lens)?;
        self.lens = lens;
        Ok(())
    }

    /// Submit the mirror world render.
    pub fn render<E: RenderEngine + ?Sized>(&self, engine: &mut E) -> Result<(), EngineError> {
        engine.render_view(self.view)
    }
}
