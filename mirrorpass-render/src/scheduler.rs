//! Per-frame driver: reflect the primary camera, then submit the offscreen pass
//! ahead of the primary pass.

use crate::camera::PrimaryCamera;
use crate::engine::{RenderEngine, ViewHandle};
use crate::error::EngineError;
use crate::offscreen::OffscreenRenderPass;
use crate::plane::ReflectionPlane;
use crate::solver::MirrorCameraSolver;

/// What happened to the reflected camera this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Solved and applied.
    Reflected,
    /// Gaze parallel to the mirror; previous pose and projection kept.
    Held,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub held: u64,
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    solver: MirrorCameraSolver,
    stats: FrameStats,
}

impl FrameScheduler {
    pub fn new(solver: MirrorCameraSolver) -> Self {
        Self {
            solver,
            stats: FrameStats::default(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Re-derive the reflected camera from `primary`.
    pub fn update_reflection<E: RenderEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        primary: &PrimaryCamera,
        plane: &ReflectionPlane,
        offscreen: &mut OffscreenRenderPass,
    ) -> Result<FrameOutcome, EngineError> {
        self.stats.frames += 1;
        match self.solver.solve(&primary.pose, plane) {
            Some(solution) => {
                offscreen.update_camera(engine, solution.pose, primary.focal_length_mm)?;
                Ok(FrameOutcome::Reflected)
            }
            None => {
                self.stats.held += 1;
                log::debug!(
                    "Frame {}: gaze parallel to mirror, holding reflected camera at {}",
                    self.stats.frames,
                    offscreen.reflected_pose().eye
                );
                Ok(FrameOutcome::Held)
            }
        }
    }

    /// Offscreen pass first, primary pass second.
    pub fn submit<E: RenderEngine + ?Sized>(
        &self,
        engine: &mut E,
        offscreen: &OffscreenRenderPass,
        primary_view: ViewHandle,
    ) -> Result<(), EngineError> {
        offscreen.render(engine)?;
        engine.render_view(primary_view)
    }

    pub fn run_frame<E: RenderEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        primary: &PrimaryCamera,
        plane: &ReflectionPlane,
        offscreen: &mut OffscreenRenderPass,
        primary_view: ViewHandle,
    ) -> Result<FrameOutcome, EngineError> {
        let outcome = self.update_reflection(engine, primary, plane, offscreen)?;
        self.submit(engine, offscreen, primary_view)?;
        Ok(outcome)
    }
}
