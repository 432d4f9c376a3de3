//! Demo scene: a lit cube in front of the mirror and the primary view that
//! looks at both.

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec3};
use mirrorpass_render::camera::{LensProjection, PrimaryCamera};
use mirrorpass_render::engine::{
    CameraHandle, EntityHandle, GeometryHandle, PixelFormat, RenderEngine, RenderTargetConfig,
    Resource, SceneHandle, TextureConfig, TextureHandle, TextureUsage, ViewConfig, ViewHandle,
    Viewport,
};
use mirrorpass_render::ledger::ResourceLedger;
use mirrorpass_wgpu::{SceneLighting, WgpuEngine};

/// Resting position of the demo object.
pub const OBJECT_ANCHOR: Vec3 = Vec3::new(0.0, 0.0, -4.0);
pub const OBJECT_COLOR: [f32; 4] = [0.8, 1.0, 1.0, 1.0];

pub struct CubeMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// Axis-aligned cube with flat per-face normals and counter-clockwise outward winding.
pub fn cube_mesh(half_extent: f32) -> CubeMesh {
    let mut mesh = CubeMesh {
        positions: Vec::with_capacity(24),
        normals: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };
    let faces = [
        (Vec3::X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y),
    ];
    for (normal, u) in faces {
        // u x v == normal, so (-u-v, u-v, u+v, -u+v) runs counter-clockwise seen from outside.
        let v = normal.cross(u);
        let base = mesh.positions.len() as u32;
        for corner in [-u - v, u - v, u + v, -u + v] {
            mesh.positions.push(((normal + corner) * half_extent).to_array());
            mesh.normals.push(normal.to_array());
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Slides along Z by `0.5 + sin(t)` and spins about Y.
pub fn object_transform(t: f64) -> Mat4 {
    let slide = Mat4::from_translation(Vec3::new(0.0, 0.0, (0.5 + t.sin()) as f32));
    Mat4::from_translation(OBJECT_ANCHOR) * slide * Mat4::from_rotation_y(t as f32)
}

/// Rotate `eye` about the vertical axis through `target` by `angle` radians.
pub fn orbit_eye(eye: Vec3, target: Vec3, angle: f32) -> Vec3 {
    target + Quat::from_rotation_y(angle) * (eye - target)
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Warm sun shining down and away from the viewer.
pub fn demo_lighting() -> SceneLighting {
    SceneLighting {
        sun_direction: Vec3::new(0.7, -1.0, -0.8),
        sun_color: Vec3::new(srgb_to_linear(0.98), srgb_to_linear(0.92), srgb_to_linear(0.89)),
        sun_intensity: 1.2,
        ambient: Vec3::splat(0.15),
    }
}

/// The spinning cube.
pub struct DemoObject {
    pub geometry: GeometryHandle,
    pub entity: EntityHandle,
}

impl DemoObject {
    pub fn new(engine: &mut WgpuEngine, scene: SceneHandle) -> Result<Self> {
        let cube = cube_mesh(0.6);
        let geometry = engine
            .upload_mesh("Demo Cube", &cube.positions, &cube.normals, &cube.indices)
            .context("failed to upload the demo cube")?;
        let entity = engine.create_lit_renderable(geometry, OBJECT_COLOR, true)?;
        engine.add_to_scene(scene, entity)?;
        engine.set_transform(entity, object_transform(0.0))?;
        Ok(Self { geometry, entity })
    }

    pub fn animate(&self, engine: &mut WgpuEngine, now: f64) -> Result<()> {
        engine.set_transform(self.entity, object_transform(now))?;
        Ok(())
    }

    pub fn release(self, engine: &mut WgpuEngine, scene: SceneHandle) {
        engine.remove_from_scene(scene, self.entity);
        engine.destroy(Resource::Entity(self.entity));
        engine.destroy(Resource::Geometry(self.geometry));
    }
}

/// Application-owned view that the mirror frame hook submits after the
/// offscreen pass.
pub struct PrimaryView {
    pub color: TextureHandle,
    pub camera: CameraHandle,
    pub view: ViewHandle,
    width: u32,
    height: u32,
}

impl PrimaryView {
    pub fn new<E: RenderEngine>(
        engine: &mut E,
        ledger: &mut ResourceLedger,
        scene: SceneHandle,
        (width, height): (u32, u32),
        clear_color: [f64; 4],
    ) -> Result<Self> {
        let color = ledger.track(engine.create_texture(&TextureConfig {
            label: "Primary Color",
            width,
            height,
            levels: 1,
            format: PixelFormat::Rgba8,
            usage: TextureUsage {
                color_attachment: true,
                sampleable: false,
            },
        })?);
        let target = ledger.track(engine.create_render_target(&RenderTargetConfig {
            label: "Primary Target",
            color,
            with_depth: true,
        })?);
        let camera = ledger.track(engine.create_camera()?);
        let view = ledger.track(engine.create_view(&ViewConfig {
            label: "Primary View",
            scene,
            camera,
            target,
            viewport: Viewport::full(width, height),
            clear_color,
        })?);
        Ok(Self {
            color,
            camera,
            view,
            width,
            height,
        })
    }

    /// Apply `primary`'s pose and lens to the view camera.
    pub fn aim<E: RenderEngine>(
        &self,
        engine: &mut E,
        primary: &PrimaryCamera,
        near: f64,
        far: f64,
    ) -> Result<()> {
        let pose = &primary.pose;
        engine.set_camera_look_at(self.camera, pose.eye, pose.target(), pose.up)?;
        engine.set_camera_projection(
            self.camera,
            &LensProjection {
                focal_length_mm: primary.focal_length_mm,
                aspect: self.width as f64 / self.height as f64,
                near,
                far,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_faces_wind_outward() {
        let mesh = cube_mesh(1.0);
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(mesh.positions[i as usize]));
            let face_normal = (b - a).cross(c - a).normalize();
            let expected = Vec3::from_array(mesh.normals[tri[0] as usize]);
            assert!(face_normal.abs_diff_eq(expected, 1e-5), "{face_normal} vs {expected}");
        }
    }

    #[test]
    fn test_cube_vertices_on_surface() {
        let mesh = cube_mesh(0.5);
        for p in &mesh.positions {
            let max = p.iter().fold(0.0f32, |m, c| m.max(c.abs()));
            assert!((max - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_object_transform_slides_and_spins() {
        let at_rest = object_transform(0.0);
        assert!(at_rest
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -3.5), 1e-6));

        let quarter = std::f64::consts::FRAC_PI_2;
        let m = object_transform(quarter);
        assert!(m
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -2.5), 1e-5));
        // Quarter turn about Y maps +X to -Z.
        assert!(m.transform_vector3(Vec3::X).abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_orbit_keeps_height_and_radius() {
        let target = Vec3::new(-1.0, 0.0, -4.5);
        let eye = Vec3::new(0.0, 0.5, 4.0);
        let half_turn = orbit_eye(eye, target, std::f32::consts::PI);
        assert!(half_turn.abs_diff_eq(Vec3::new(-2.0, 0.5, -13.0), 1e-4), "{half_turn}");
        assert!(orbit_eye(eye, target, 0.0).abs_diff_eq(eye, 1e-6));
    }

    #[test]
    fn test_sun_color_is_linearized() {
        let light = demo_lighting();
        assert!(light.sun_color.x < 0.98 && light.sun_color.x > 0.9);
        assert!(light.sun_color.z < light.sun_color.x);
        assert_eq!(srgb_to_linear(1.0), 1.0);
    }
}
