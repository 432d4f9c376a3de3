//! Camera pose and lens projection shared by the solver, the offscreen pass and
//! engine implementations.

use glam::{Mat4, Vec3};

/// Sensor height (mm) used to turn a focal length into a vertical field of view.
pub const SENSOR_HEIGHT_MM: f64 = 24.0;
/// Focal length the reflected camera uses until the first successful solve.
pub const DEFAULT_FOCAL_LENGTH_MM: f64 = 28.0;

/// Camera position and orientation.
///
/// `forward` and `up` are unit length and orthogonal to each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for CameraPose {
    /// At the origin, looking down -Z with +Y up.
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

impl CameraPose {
    /// Build a pose from a gaze direction and an approximate up vector.
    /// `up` is re-orthogonalized against `forward`.
    pub fn new(eye: Vec3, forward: Vec3, up: Vec3) -> Self {
        let forward = forward.try_normalize().unwrap_or(Vec3::NEG_Z);
        let up = (up - forward * up.dot(forward))
            .try_normalize()
            .unwrap_or_else(|| forward.any_orthonormal_vector());
        Self { eye, forward, up }
    }

    /// Pose looking from `eye` toward `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        Self::new(eye, target - eye, up)
    }

    /// Point one unit along the gaze; the look-at target for this pose.
    pub fn target(&self) -> Vec3 {
        self.eye + self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up)
    }

    /// Right-handed world-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn is_finite(&self) -> bool {
        self.eye.is_finite() && self.forward.is_finite() && self.up.is_finite()
    }
}

/// Physical-lens style perspective projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LensProjection {
    pub focal_length_mm: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl LensProjection {
    /// Vertical field of view in radians.
    pub fn vertical_fov(&self) -> f64 {
        2.0 * (SENSOR_HEIGHT_MM * 0.5 / self.focal_length_mm).atan()
    }

    /// Right-handed projection with a [0, 1] depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.vertical_fov() as f32,
            self.aspect as f32,
            self.near as f32,
            self.far as f32,
        )
    }
}

/// Snapshot of the application's main camera handed to the per-frame hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrimaryCamera {
    pub pose: CameraPose,
    pub focal_length_mm: f64,
}

impl PrimaryCamera {
    pub fn new(pose: CameraPose, focal_length_mm: f64) -> Self {
        Self {
            pose,
            focal_length_mm,
        }
    }
}
