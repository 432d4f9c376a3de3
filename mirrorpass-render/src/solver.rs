//! Reflected camera derivation.
//!
//! Mirrors the primary camera across the reflection plane:
//!
//! ```text
//!    I     N     R
//!     \    ^    /
//!      \   |   /
//!       \  |  /
//!        \ | /
//! =================
//! ```
//!
//! The gaze ray is intersected with the plane, gaze and up are reflected about
//! the normal, and the eye is placed behind the intersection point along the
//! reflected gaze at the same distance the real eye sits in front of it.

use glam::Vec3;

use crate::camera::CameraPose;
use crate::plane::ReflectionPlane;

/// Below this `|dot(forward, normal)|` the gaze is treated as parallel to the mirror.
pub const DEFAULT_PARALLEL_THRESHOLD: f32 = 1e-4;

/// Reflect `v` about the unit normal `n` (GLSL `reflect`).
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * n.dot(v) * n
}

/// Ray parameter `t` where `origin + t * dir` meets the plane, or `None` when the
/// ray runs (nearly) parallel to it.
pub fn intersect_plane(
    plane_point: Vec3,
    plane_normal: Vec3,
    origin: Vec3,
    dir: Vec3,
    parallel_threshold: f32,
) -> Option<f32> {
    let denom = dir.dot(plane_normal);
    if !denom.is_finite() || denom.abs() < parallel_threshold {
        return None;
    }
    let t = (plane_point - origin).dot(plane_normal) / denom;
    t.is_finite().then_some(t)
}

/// Result of a successful solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorSolution {
    /// Reflected camera pose.
    pub pose: CameraPose,
    /// Where the primary gaze meets the mirror plane.
    pub intersection: Vec3,
}

/// Stateless solver; the only knob is the parallel-gaze threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorCameraSolver {
    parallel_threshold: f32,
}

impl Default for MirrorCameraSolver {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_THRESHOLD)
    }
}

impl MirrorCameraSolver {
    pub fn new(parallel_threshold: f32) -> Self {
        Self { parallel_threshold }
    }

    pub fn parallel_threshold(&self) -> f32 {
        self.parallel_threshold
    }

    /// Reflect `camera` across `plane`. Returns `None` for a degenerate gaze.
    pub fn solve(&self, camera: &CameraPose, plane: &ReflectionPlane) -> Option<MirrorSolution> {
        let normal = plane.normal();
        let t = intersect_plane(
            plane.center(),
            normal,
            camera.eye,
            camera.forward,
            self.parallel_threshold,
        )?;

        let intersection = camera.eye + t * camera.forward;
        let forward = reflect(camera.forward, normal);
        let up = reflect(camera.up, normal);

        // Backed off along the reflected gaze by the unsigned eye-to-mirror distance.
        let eye = intersection - intersection.distance(camera.eye) * forward;

        let pose = CameraPose { eye, forward, up };
        if !pose.is_finite() || !intersection.is_finite() {
            return None;
        }
        Some(MirrorSolution { pose, intersection })
    }
}

/// Reflect `camera` across `plane` with the default threshold.
pub fn reflect_camera(camera: &CameraPose, plane: &ReflectionPlane) -> Option<CameraPose> {
    MirrorCameraSolver::default()
        .solve(camera, plane)
        .map(|solution| solution.pose)
}
