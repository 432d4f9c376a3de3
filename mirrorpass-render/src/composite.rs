//! The visible mirror: a quad spanning the reflection plane whose material
//! samples the offscreen texture.

use mirrorpass_gpu_shared::vertex::QuadVertex;

use crate::engine::{
    Aabb, EntityHandle, GeometryConfig, GeometryHandle, MaterialConfig, MaterialHandle,
    RenderEngine, RenderableConfig, SamplerConfig, SceneHandle, TextureHandle,
};
use crate::error::MirrorError;
use crate::ledger::ResourceLedger;
use crate::plane::ReflectionPlane;

/// Two triangles over the vertices of [`quad_vertices`].
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 3, 2, 1];

/// Quad vertices at `center ± extent_u ± extent_v` with uv corners (0,0)..(1,1).
pub fn quad_vertices(plane: &ReflectionPlane) -> [QuadVertex; 4] {
    const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let corners = plane.corners();
    std::array::from_fn(|i| QuadVertex {
        position: corners[i].to_array(),
        uv: UVS[i],
    })
}

#[derive(Debug)]
pub struct CompositeSurface {
    vertices: [QuadVertex; 4],
    geometry: GeometryHandle,
    material: MaterialHandle,
    entity: EntityHandle,
}

impl CompositeSurface {
    /// Build the quad once from `plane`, bind `texture` with linear filtering and
    /// add the result to `scene`.
    pub fn new<E: RenderEngine + ?Sized>(
        engine: &mut E,
        ledger: &mut ResourceLedger,
        scene: SceneHandle,
        plane: &ReflectionPlane,
        texture: TextureHandle,
    ) -> Result<Self, MirrorError> {
        let vertices = quad_vertices(plane);

        let geometry = engine
            .create_geometry(&GeometryConfig {
                label: "Mirror Quad",
                vertices: &vertices,
                indices: &QUAD_INDICES,
            })
            .map_err(MirrorError::setup("mirror quad geometry"))?;
        ledger.track(geometry);

        let material = engine
            .create_material(&MaterialConfig {
                label: "Mirror Material",
                texture,
                sampler: SamplerConfig::LINEAR,
            })
            .map_err(MirrorError::setup("mirror material"))?;
        ledger.track(material);

        // Flat proxy: never culled, no shadows.
        let entity = engine
            .create_renderable(&RenderableConfig {
                label: "Mirror Quad",
                geometry,
                material,
                bounds: Aabb::from_points(&plane.corners()),
                culling: false,
                cast_shadows: false,
                receive_shadows: false,
            })
            .map_err(MirrorError::setup("mirror renderable"))?;
        ledger.track(entity);

        engine
            .add_to_scene(scene, entity)
            .map_err(MirrorError::setup("mirror scene entry"))?;

        Ok(Self {
            vertices,
            geometry,
            material,
            entity,
        })
    }

    pub fn vertices(&self) -> &[QuadVertex; 4] {
        &self.vertices
    }

    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    /// Take the quad out of `scene`. Its resources are released by the ledger.
    pub fn detach<E: RenderEngine + ?Sized>(&self, engine: &mut E, scene: SceneHandle) {
        engine.remove_from_scene(scene, self.entity);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_quad_vertices_span_plane() {
        let center = Vec3::new(-2.0, 0.0, -5.0);
        let normal = Vec3::new(1.0, 0.0, 2.0).normalize();
        let u = normal.cross(Vec3::Y).normalize();
        let v = normal.cross(u);
        let (u, v) = (u * 1.5, v * 1.5);
        let plane = ReflectionPlane::from_parts(center, normal, u, v).unwrap();

        let vertices = quad_vertices(&plane);
        let expected = [center - u - v, center + u - v, center - u + v, center + u + v];
        for (vertex, position) in vertices.iter().zip(expected) {
            assert_eq!(vertex.position, position.to_array());
        }
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
        assert_eq!(vertices[1].uv, [1.0, 0.0]);
        assert_eq!(vertices[2].uv, [0.0, 1.0]);
        assert_eq!(vertices[3].uv, [1.0, 1.0]);
    }

    #[test]
    fn test_quad_indices_cover_both_triangles() {
        let mut seen = [0usize; 4];
        for i in QUAD_INDICES {
            seen[i as usize] += 1;
        }
        // The shared diagonal (1, 2) appears in both triangles.
        assert_eq!(seen, [1, 2, 2, 1]);
    }
}
