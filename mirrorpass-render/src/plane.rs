//! Mirror surface geometry.

use glam::Vec3;

use crate::error::MirrorError;

/// Tolerance for the unit-normal and orthogonality checks.
pub const PLANE_TOLERANCE: f32 = 1e-4;

/// Flat mirror: center point, unit normal and two in-plane half extents.
///
/// Immutable once built. Both the reflected camera and the mirror quad are
/// derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReflectionPlane {
    center: Vec3,
    normal: Vec3,
    extent_u: Vec3,
    extent_v: Vec3,
}

impl ReflectionPlane {
    /// Build a mirror of the given half size facing along `normal`.
    ///
    /// `extent_u` is horizontal (`normal × +Y`, or `normal × +X` when the
    /// mirror faces straight up or down) and `extent_v = normal × extent_u`.
    pub fn new(
        center: Vec3,
        normal: Vec3,
        half_width: f32,
        half_height: f32,
    ) -> Result<Self, MirrorError> {
        let normal = normal
            .try_normalize()
            .ok_or_else(|| MirrorError::InvalidPlane(format!("normal {normal} has no direction")))?;
        if !(half_width.is_finite() && half_width > 0.0 && half_height.is_finite() && half_height > 0.0) {
            return Err(MirrorError::InvalidPlane(format!(
                "half extents must be positive, got {half_width} x {half_height}"
            )));
        }

        let reference = if normal.dot(Vec3::Y).abs() > 1.0 - PLANE_TOLERANCE {
            Vec3::X
        } else {
            Vec3::Y
        };
        let u = normal.cross(reference).normalize();
        let v = normal.cross(u);

        Self::from_parts(center, normal, u * half_width, v * half_height)
    }

    /// Build from explicit extents, validating the plane invariants.
    pub fn from_parts(
        center: Vec3,
        normal: Vec3,
        extent_u: Vec3,
        extent_v: Vec3,
    ) -> Result<Self, MirrorError> {
        if !(center.is_finite() && normal.is_finite() && extent_u.is_finite() && extent_v.is_finite()) {
            return Err(MirrorError::InvalidPlane("non-finite component".into()));
        }
        if (normal.length() - 1.0).abs() > PLANE_TOLERANCE {
            return Err(MirrorError::InvalidPlane(format!(
                "normal {normal} is not unit length"
            )));
        }

        let (len_u, len_v) = (extent_u.length(), extent_v.length());
        if len_u <= PLANE_TOLERANCE || len_v <= PLANE_TOLERANCE {
            return Err(MirrorError::InvalidPlane("degenerate extents".into()));
        }
        let orthogonal = normal.dot(extent_u).abs() <= PLANE_TOLERANCE * len_u
            && normal.dot(extent_v).abs() <= PLANE_TOLERANCE * len_v
            && extent_u.dot(extent_v).abs() <= PLANE_TOLERANCE * len_u * len_v;
        if !orthogonal {
            return Err(MirrorError::InvalidPlane(
                "extents must be orthogonal to the normal and to each other".into(),
            ));
        }

        Ok(Self {
            center,
            normal,
            extent_u,
            extent_v,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn extent_u(&self) -> Vec3 {
        self.extent_u
    }

    pub fn extent_v(&self) -> Vec3 {
        self.extent_v
    }

    /// Distance from the plane, positive on the side the normal points to.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.center).dot(self.normal)
    }

    /// Mirror image of `point` across the (infinite) plane.
    pub fn mirror_point(&self, point: Vec3) -> Vec3 {
        point - 2.0 * self.signed_distance(point) * self.normal
    }

    /// Quad corners in vertex order: `c-u-v`, `c+u-v`, `c-u+v`, `c+u+v`.
    pub fn corners(&self) -> [Vec3; 4] {
        let (c, u, v) = (self.center, self.extent_u, self.extent_v);
        [c - u - v, c + u - v, c - u + v, c + u + v]
    }
}
