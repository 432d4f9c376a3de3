//! Narrow interface to the rendering engine.
//!
//! The mirror core never touches GPU objects directly. It asks the engine for
//! opaque handles through configuration structs and hands those handles back
//! when configuring cameras, submitting views and releasing resources.

use glam::{Mat4, Vec3};
use mirrorpass_gpu_shared::vertex::QuadVertex;
use serde::Deserialize;

use crate::camera::LensProjection;
use crate::error::EngineError;

macro_rules! define_handles {
    ($($(#[$meta:meta])* $name:ident => $variant:ident,)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);

            impl From<$name> for Resource {
                fn from(handle: $name) -> Self {
                    Resource::$variant(handle)
                }
            }
        )*

        /// Any engine-owned object the core can release.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Resource {
            $($variant($name),)*
        }

        impl Resource {
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Resource::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

define_handles! {
    /// Color (or depth) texture.
    TextureHandle => Texture,
    /// Render destination wrapping a color texture.
    RenderTargetHandle => RenderTarget,
    CameraHandle => Camera,
    /// Scene + camera + target triple that can be submitted for rendering.
    ViewHandle => View,
    /// Vertex and index buffers.
    GeometryHandle => Geometry,
    MaterialHandle => Material,
    /// Drawable entity that can be placed in a scene.
    EntityHandle => Entity,
}

/// Scene container owned by the application. The core only references it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneHandle(pub u64);

/// Texel format of an engine texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 16-bit float RGBA.
    Rgba16Float,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUsage {
    pub color_attachment: bool,
    pub sampleable: bool,
}

impl TextureUsage {
    /// Rendered into by one pass and sampled by another.
    pub const RENDER_AND_SAMPLE: Self = Self {
        color_attachment: true,
        sampleable: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureConfig {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub levels: u32,
    pub format: PixelFormat,
    pub usage: TextureUsage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargetConfig {
    pub label: &'static str,
    pub color: TextureHandle,
    pub with_depth: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
    pub label: &'static str,
    pub scene: SceneHandle,
    pub camera: CameraHandle,
    pub target: RenderTargetHandle,
    pub viewport: Viewport,
    pub clear_color: [f64; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerConfig {
    pub const LINEAR: Self = Self {
        min_filter: FilterMode::Linear,
        mag_filter: FilterMode::Linear,
    };
}

/// Unlit material sampling a single texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialConfig {
    pub label: &'static str,
    pub texture: TextureHandle,
    pub sampler: SamplerConfig,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryConfig<'a> {
    pub label: &'static str,
    pub vertices: &'a [QuadVertex],
    pub indices: &'a [u16],
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box enclosing `points`. An empty slice yields a box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            };
        };
        rest.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |b, p| Self {
                min: b.min.min(*p),
                max: b.max.max(*p),
            },
        )
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// World-space box enclosing this box after `transform`.
    pub fn transformed(&self, transform: Mat4) -> Self {
        let corners = self.corners().map(|c| transform.transform_point3(c));
        Self::from_points(&corners)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderableConfig {
    pub label: &'static str,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub bounds: Aabb,
    pub culling: bool,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

/// Operations the mirror core needs from the rendering engine.
///
/// Creation failures are fatal for the caller; the core never retries.
/// `render_view` submissions execute in call order, and a texture written by one
/// submission is visible to sampling in every later submission.
pub trait RenderEngine {
    fn create_texture(&mut self, config: &TextureConfig) -> Result<TextureHandle, EngineError>;
    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig,
    ) -> Result<RenderTargetHandle, EngineError>;
    fn create_camera(&mut self) -> Result<CameraHandle, EngineError>;
    fn create_view(&mut self, config: &ViewConfig) -> Result<ViewHandle, EngineError>;
    fn create_geometry(&mut self, config: &GeometryConfig<'_>) -> Result<GeometryHandle, EngineError>;
    fn create_material(&mut self, config: &MaterialConfig) -> Result<MaterialHandle, EngineError>;
    fn create_renderable(&mut self, config: &RenderableConfig) -> Result<EntityHandle, EngineError>;

    fn add_to_scene(&mut self, scene: SceneHandle, entity: EntityHandle) -> Result<(), EngineError>;
    fn remove_from_scene(&mut self, scene: SceneHandle, entity: EntityHandle);

    fn set_camera_look_at(
        &mut self,
        camera: CameraHandle,
        eye: Vec3,
        target: Vec3,
        up: Vec3,
    ) -> Result<(), EngineError>;
    fn set_camera_projection(
        &mut self,
        camera: CameraHandle,
        lens: &LensProjection,
    ) -> Result<(), EngineError>;

    /// Render `view`'s scene from its camera into its target.
    fn render_view(&mut self, view: ViewHandle) -> Result<(), EngineError>;

    fn destroy(&mut self, resource: Resource);
}
