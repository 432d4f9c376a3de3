//! Ownership context for everything the mirror allocates.

use crate::camera::PrimaryCamera;
use crate::composite::CompositeSurface;
use crate::config::MirrorConfig;
use crate::engine::{RenderEngine, SceneHandle, ViewHandle};
use crate::error::MirrorError;
use crate::ledger::ResourceLedger;
use crate::offscreen::OffscreenRenderPass;
use crate::plane::ReflectionPlane;
use crate::scheduler::{FrameOutcome, FrameScheduler, FrameStats};
use crate::solver::MirrorCameraSolver;

/// A planar mirror living in one scene.
///
/// Created by [`setup`](Self::setup), driven by [`frame`](Self::frame) once per
/// frame, and released by [`teardown`](Self::teardown).
#[derive(Debug)]
pub struct MirrorContext {
    scene: SceneHandle,
    plane: ReflectionPlane,
    offscreen: OffscreenRenderPass,
    composite: CompositeSurface,
    scheduler: FrameScheduler,
    ledger: ResourceLedger,
}

impl MirrorContext {
    /// Allocate the offscreen pass and the mirror quad and add the quad to `scene`.
    ///
    /// On failure every resource created so far is released before returning.
    pub fn setup<E: RenderEngine + ?Sized>(
        engine: &mut E,
        scene: SceneHandle,
        config: &MirrorConfig,
    ) -> Result<Self, MirrorError> {
        config.validate()?;
        let plane = config.reflection_plane()?;

        let mut ledger = ResourceLedger::new();
        let built = OffscreenRenderPass::new(
            engine,
            &mut ledger,
            scene,
            &config.offscreen,
            &config.projection,
        )
        .and_then(|offscreen| {
            CompositeSurface::new(engine, &mut ledger, scene, &plane, offscreen.texture())
                .map(|composite| (offscreen, composite))
        });

        match built {
            Ok((offscreen, composite)) => {
                log::info!(
                    "Mirror ready: center {} normal {} ({} resources)",
                    plane.center(),
                    plane.normal(),
                    ledger.len()
                );
                Ok(Self {
                    scene,
                    plane,
                    offscreen,
                    composite,
                    scheduler: FrameScheduler::new(MirrorCameraSolver::new(config.parallel_threshold)),
                    ledger,
                })
            }
            Err(err) => {
                log::error!("{err}");
                ledger.release_all(engine);
                Err(err)
            }
        }
    }

    /// Per-frame hook: update the reflected camera, then render the mirror world
    /// followed by `primary_view`.
    pub fn frame<E: RenderEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        now: f64,
        primary: &PrimaryCamera,
        primary_view: ViewHandle,
    ) -> Result<FrameOutcome, MirrorError> {
        log::trace!("Mirror frame at t={now:.3}s");
        self.scheduler
            .run_frame(engine, primary, &self.plane, &mut self.offscreen, primary_view)
            .map_err(MirrorError::Frame)
    }

    /// Remove the quad from the scene and release everything in reverse creation order.
    pub fn teardown<E: RenderEngine + ?Sized>(mut self, engine: &mut E) {
        self.composite.detach(engine, self.scene);
        let count = self.ledger.len();
        self.ledger.release_all(engine);
        log::info!("Mirror torn down ({count} resources released)");
    }

    pub fn plane(&self) -> &ReflectionPlane {
        &self.plane
    }

    pub fn offscreen(&self) -> &OffscreenRenderPass {
        &self.offscreen
    }

    pub fn composite(&self) -> &CompositeSurface {
        &self.composite
    }

    pub fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::camera::{CameraPose, DEFAULT_FOCAL_LENGTH_MM};
    use crate::engine::{FilterMode, Resource, ViewHandle};
    use crate::mock::{Event, MockEngine, SCENE};

    const PRIMARY_VIEW: ViewHandle = ViewHandle(9000);

    fn setup(engine: &mut MockEngine) -> MirrorContext {
        MirrorContext::setup(engine, SCENE, &MirrorConfig::default()).unwrap()
    }

    fn facing_mirror() -> PrimaryCamera {
        PrimaryCamera::new(
            CameraPose::look_at(Vec3::new(0.0, 0.0, 4.0), Vec3::new(-2.0, 0.0, -5.0), Vec3::Y),
            28.0,
        )
    }

    fn parallel_to_mirror() -> PrimaryCamera {
        // Default mirror normal is (1, 0, 2); (2, 0, -1) lies in the plane.
        PrimaryCamera::new(
            CameraPose::new(Vec3::new(0.0, 0.0, 4.0), Vec3::new(2.0, 0.0, -1.0), Vec3::Y),
            28.0,
        )
    }

    #[test]
    fn test_setup_builds_mirror_resources() {
        let mut engine = MockEngine::default();
        let mirror = setup(&mut engine);

        let texture = engine.textures[0];
        assert_eq!((texture.width, texture.height), (1024, 1024));
        assert!(texture.usage.color_attachment && texture.usage.sampleable);

        let material = engine.materials[0];
        assert_eq!(material.texture, mirror.offscreen().texture());
        assert_eq!(material.sampler.min_filter, FilterMode::Linear);
        assert_eq!(material.sampler.mag_filter, FilterMode::Linear);

        let renderable = engine.renderables[0];
        assert!(!renderable.culling);
        assert!(!renderable.cast_shadows);
        assert!(!renderable.receive_shadows);

        let (vertices, indices) = &engine.geometries[0];
        assert_eq!(vertices.as_slice(), mirror.composite().vertices().as_slice());
        assert_eq!(indices.as_slice(), &[0, 1, 2, 3, 2, 1]);

        // Offscreen view renders the same scene the quad lives in.
        assert_eq!(engine.views[0].scene, SCENE);
        assert!(engine
            .events
            .contains(&Event::AddedToScene(SCENE, mirror.composite().entity())));

        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_offscreen_pass_submitted_before_primary_every_frame() {
        let mut engine = MockEngine::default();
        let mut mirror = setup(&mut engine);
        let offscreen_view = mirror.offscreen().view();

        for frame in 0..3 {
            let camera = if frame == 1 { parallel_to_mirror() } else { facing_mirror() };
            mirror.frame(&mut engine, frame as f64 / 60.0, &camera, PRIMARY_VIEW).unwrap();
        }

        assert_eq!(
            engine.rendered_views(),
            vec![
                offscreen_view,
                PRIMARY_VIEW,
                offscreen_view,
                PRIMARY_VIEW,
                offscreen_view,
                PRIMARY_VIEW
            ]
        );
        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_reflected_camera_applied_to_engine() {
        let mut engine = MockEngine::default();
        let mut mirror = setup(&mut engine);

        let camera = facing_mirror();
        let outcome = mirror.frame(&mut engine, 0.0, &camera, PRIMARY_VIEW).unwrap();
        assert_eq!(outcome, FrameOutcome::Reflected);

        let pose = *mirror.offscreen().reflected_pose();
        assert!(pose.eye.abs_diff_eq(mirror.plane().mirror_point(camera.pose.eye), 1e-4));
        assert_eq!(
            engine.last_look_at(mirror.offscreen().camera()),
            Some((pose.eye, pose.eye + pose.forward, pose.up))
        );
        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_degenerate_first_frame_keeps_default_pose() {
        let mut engine = MockEngine::default();
        let mut mirror = setup(&mut engine);
        let look_ats_after_setup = engine.look_at_count();

        let outcome = mirror
            .frame(&mut engine, 0.0, &parallel_to_mirror(), PRIMARY_VIEW)
            .unwrap();

        assert_eq!(outcome, FrameOutcome::Held);
        assert_eq!(*mirror.offscreen().reflected_pose(), CameraPose::default());
        assert_eq!(mirror.offscreen().lens().focal_length_mm, DEFAULT_FOCAL_LENGTH_MM);
        assert_eq!(engine.look_at_count(), look_ats_after_setup);
        assert_eq!(mirror.stats().held, 1);
        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_degenerate_frame_holds_previous_pose_and_lens() {
        let mut engine = MockEngine::default();
        let mut mirror = setup(&mut engine);

        mirror.frame(&mut engine, 0.0, &facing_mirror(), PRIMARY_VIEW).unwrap();
        let held_pose = *mirror.offscreen().reflected_pose();
        let held_lens = *mirror.offscreen().lens();

        let mut zoomed = parallel_to_mirror();
        zoomed.focal_length_mm = 85.0;
        let outcome = mirror.frame(&mut engine, 1.0 / 60.0, &zoomed, PRIMARY_VIEW).unwrap();

        assert_eq!(outcome, FrameOutcome::Held);
        assert_eq!(*mirror.offscreen().reflected_pose(), held_pose);
        assert_eq!(*mirror.offscreen().lens(), held_lens);
        assert_eq!(mirror.stats(), FrameStats { frames: 2, held: 1 });
        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_lens_follows_primary_focal_length_with_fixed_aspect() {
        let mut engine = MockEngine::default();
        let mut config = MirrorConfig::default();
        config.offscreen.width = 2048;
        config.offscreen.height = 1024;
        let mut mirror = MirrorContext::setup(&mut engine, SCENE, &config).unwrap();

        let mut camera = facing_mirror();
        camera.focal_length_mm = 50.0;
        mirror.frame(&mut engine, 0.0, &camera, PRIMARY_VIEW).unwrap();

        let lens = engine.last_projection(mirror.offscreen().camera()).unwrap();
        assert_eq!(lens.focal_length_mm, 50.0);
        assert_eq!(lens.aspect, 2.0);
        assert_eq!((lens.near, lens.far), (0.1, 100.0));
        mirror.teardown(&mut engine);
    }

    #[test]
    fn test_teardown_releases_in_reverse_creation_order() {
        let mut engine = MockEngine::default();
        let mirror = setup(&mut engine);
        let entity = mirror.composite().entity();
        mirror.teardown(&mut engine);

        let created = engine.created();
        let destroyed = engine.destroyed();
        assert_eq!(created.len(), 7);
        assert_eq!(destroyed, created.iter().rev().copied().collect::<Vec<_>>());

        let removed_at = engine
            .events
            .iter()
            .position(|e| *e == Event::RemovedFromScene(SCENE, entity))
            .unwrap();
        let first_destroy = engine
            .events
            .iter()
            .position(|e| matches!(e, Event::Destroyed(_)))
            .unwrap();
        assert!(removed_at < first_destroy);
    }

    #[test]
    fn test_failed_setup_releases_partial_resources() {
        let mut engine = MockEngine::failing_on("render_target");
        let err = MirrorContext::setup(&mut engine, SCENE, &MirrorConfig::default()).unwrap_err();

        assert!(matches!(err, MirrorError::Setup { stage: "offscreen render target", .. }));
        let created = engine.created();
        assert_eq!(created.len(), 1);
        assert!(matches!(created[0], Resource::Texture(_)));
        assert_eq!(engine.destroyed(), created);
    }

    #[test]
    fn test_failed_material_releases_everything_before_it() {
        let mut engine = MockEngine::failing_on("material");
        let err = MirrorContext::setup(&mut engine, SCENE, &MirrorConfig::default()).unwrap_err();

        assert!(matches!(err, MirrorError::Setup { stage: "mirror material", .. }));
        let created = engine.created();
        assert_eq!(created.len(), 5);
        assert_eq!(engine.destroyed(), created.iter().rev().copied().collect::<Vec<_>>());
        assert!(engine.rendered_views().is_empty());
    }

    #[test]
    fn test_invalid_plane_allocates_nothing() {
        let mut engine = MockEngine::default();
        let mut config = MirrorConfig::default();
        config.plane.normal = [0.0, 0.0, 0.0];

        let err = MirrorContext::setup(&mut engine, SCENE, &config).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidPlane(_)));
        assert!(engine.events.is_empty());
    }

    #[test]
    fn test_submission_failure_surfaces_from_frame() {
        let mut engine = MockEngine::default();
        let mut mirror = setup(&mut engine);
        engine.fail_on = Some("render");

        let err = mirror
            .frame(&mut engine, 0.0, &facing_mirror(), PRIMARY_VIEW)
            .unwrap_err();
        assert!(matches!(err, MirrorError::Frame(_)));
        mirror.teardown(&mut engine);
    }
}
