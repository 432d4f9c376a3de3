//! Mirror configuration. Every field has a default, so an empty TOML document
//! (or no file at all) reproduces the stock mirror.

use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::engine::PixelFormat;
use crate::error::MirrorError;
use crate::plane::ReflectionPlane;
use crate::solver::DEFAULT_PARALLEL_THRESHOLD;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub offscreen: OffscreenConfig,
    pub projection: ProjectionConfig,
    pub plane: PlaneConfig,
    /// Gaze/normal dot product below which a frame is held.
    pub parallel_threshold: f32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            offscreen: OffscreenConfig::default(),
            projection: ProjectionConfig::default(),
            plane: PlaneConfig::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Offscreen reflection target. The resolution is fixed for the mirror's lifetime.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffscreenConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub clear_color: [f64; 4],
}

impl Default for OffscreenConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            format: PixelFormat::Rgba8,
            clear_color: [0.1, 0.2, 0.4, 1.0],
        }
    }
}

/// Near/far planes of the reflected camera.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    pub near: f64,
    pub far: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaneConfig {
    pub center: [f32; 3],
    /// Need not be normalized.
    pub normal: [f32; 3],
    pub half_width: f32,
    pub half_height: f32,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            center: [-2.0, 0.0, -5.0],
            normal: [1.0, 0.0, 2.0],
            half_width: 1.5,
            half_height: 1.5,
        }
    }
}

impl MirrorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, MirrorError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        let source = std::fs::read_to_string(path).map_err(|source| MirrorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!("Loaded mirror configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MirrorError> {
        let o = &self.offscreen;
        if o.width == 0 || o.height == 0 {
            return Err(MirrorError::InvalidConfig(format!(
                "offscreen resolution must be non-zero, got {}x{}",
                o.width, o.height
            )));
        }
        let p = &self.projection;
        if !(p.near.is_finite() && p.far.is_finite() && p.near > 0.0 && p.far > p.near) {
            return Err(MirrorError::InvalidConfig(format!(
                "projection needs 0 < near < far, got near={} far={}",
                p.near, p.far
            )));
        }
        if !(self.parallel_threshold.is_finite() && self.parallel_threshold > 0.0) {
            return Err(MirrorError::InvalidConfig(format!(
                "parallel_threshold must be positive, got {}",
                self.parallel_threshold
            )));
        }
        Ok(())
    }

    /// Mirror plane described by `self.plane`.
    pub fn reflection_plane(&self) -> Result<ReflectionPlane, MirrorError> {
        ReflectionPlane::new(
            Vec3::from_array(self.plane.center),
            Vec3::from_array(self.plane.normal),
            self.plane.half_width,
            self.plane.half_height,
        )
    }
}
