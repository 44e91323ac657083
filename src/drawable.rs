//! Sprites and polygons: plain descriptions of a single draw.

use glam::Vec2;

use crate::object::Handle;
use crate::shader::Shader;
use crate::texture::Texture;
use crate::types::{Color, Rect};
use crate::vertex_array::VertexArray;

/// Everything a draw needs, with objects still given as handles.
///
/// Both [`Sprite`] and [`Polygon`] resolve to this; a draw whose texture
/// or vertex array handle resolves to nothing is skipped.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    /// Texture sampled on slot 0, `None` for a flat-color draw.
    pub texture: Option<Handle<Texture>>,
    /// Geometry, `None` for the default unit quad.
    pub vertex_array: Option<Handle<VertexArray>>,
    /// Program, `None` for the matching default shader.
    pub shader: Option<Handle<Shader>>,
    /// Bottom-left corner before rotation.
    pub position: Vec2,
    /// Size, absolute or relative to the sampled texture pixels.
    pub size: Vec2,
    /// Whether [`size`](Self::size) is absolute.
    pub absolute_size: bool,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    /// Rotation pivot as a fraction of the drawn size.
    pub rotation_center: Vec2,
    /// Normalized part of the texture to sample.
    pub source: Rect,
    /// Tint or fill color.
    pub color: Color,
}

/// A textured quad.
///
/// By default the size is relative: `(1, 1)` draws the source rectangle at
/// one coordinate unit per texture pixel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    /// The texture; a sprite without one is not drawn.
    pub texture: Option<Handle<Texture>>,
    /// Bottom-left corner before rotation.
    pub position: Vec2,
    /// Size, absolute or relative to the sampled texture pixels.
    pub size: Vec2,
    /// Whether [`size`](Self::size) is absolute.
    pub absolute_size: bool,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    /// Rotation pivot as a fraction of the drawn size.
    pub rotation_center: Vec2,
    /// Normalized part of the texture to sample.
    pub source: Rect,
    /// Tint.
    pub color: Color,
    /// Program overriding the default textured shader.
    pub shader: Option<Handle<Shader>>,
}

impl Sprite {
    /// A sprite showing all of `texture` at its pixel size.
    pub fn new(texture: Handle<Texture>) -> Self {
        Self {
            texture: Some(texture),
            ..Self::default()
        }
    }

    /// Move the sprite.
    #[must_use]
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Use an absolute size.
    #[must_use]
    pub fn sized(mut self, size: Vec2) -> Self {
        self.size = size;
        self.absolute_size = true;
        self
    }

    /// Sample only `source` of the texture.
    #[must_use]
    pub fn with_source(mut self, source: Rect) -> Self {
        self.source = source;
        self
    }

    /// The draw this sprite resolves to.
    pub fn params(&self) -> DrawParams {
        DrawParams {
            texture: self.texture,
            vertex_array: None,
            shader: self.shader,
            position: self.position,
            size: self.size,
            absolute_size: self.absolute_size,
            rotation: self.rotation,
            rotation_center: self.rotation_center,
            source: self.source,
            color: self.color,
        }
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            texture: None,
            position: Vec2::ZERO,
            size: Vec2::ONE,
            absolute_size: false,
            rotation: 0.0,
            rotation_center: Vec2::ZERO,
            source: Rect::UNIT,
            color: Color::WHITE,
            shader: None,
        }
    }
}

/// A mesh drawn in a flat color, or textured when a texture is set.
///
/// The size always scales the mesh coordinates directly. A polygon created
/// by [`RenderContext::create_polygon`](crate::RenderContext::create_polygon)
/// owns its vertex array and hands it back to
/// [`RenderContext::release_polygon`](crate::RenderContext::release_polygon)
/// for destruction; one built with [`Polygon::new`] shares it.
#[derive(Debug, PartialEq)]
pub struct Polygon {
    /// The mesh; a polygon without one is not drawn.
    pub vertex_array: Option<Handle<VertexArray>>,
    /// Optional texture.
    pub texture: Option<Handle<Texture>>,
    /// Mesh origin position.
    pub position: Vec2,
    /// Scale of the mesh coordinates.
    pub size: Vec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    /// Rotation pivot as a fraction of `size`.
    pub rotation_center: Vec2,
    /// Normalized part of the texture to sample.
    pub source: Rect,
    /// Fill color or tint.
    pub color: Color,
    /// Program overriding the default shader.
    pub shader: Option<Handle<Shader>>,
    owns_vertex_array: bool,
}

impl Polygon {
    /// A polygon drawing a shared vertex array.
    pub fn new(vertex_array: Handle<VertexArray>) -> Self {
        Self::with_ownership(Some(vertex_array), false)
    }

    pub(crate) fn with_ownership(vertex_array: Option<Handle<VertexArray>>, owned: bool) -> Self {
        Self {
            vertex_array,
            texture: None,
            position: Vec2::ZERO,
            size: Vec2::ONE,
            rotation: 0.0,
            rotation_center: Vec2::ZERO,
            source: Rect::UNIT,
            color: Color::WHITE,
            shader: None,
            owns_vertex_array: owned,
        }
    }

    /// Whether the vertex array is destroyed together with the polygon.
    pub fn owns_vertex_array(&self) -> bool {
        self.owns_vertex_array
    }

    /// Move the polygon.
    #[must_use]
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Fill color.
    #[must_use]
    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// The draw this polygon resolves to.
    pub fn params(&self) -> DrawParams {
        DrawParams {
            texture: self.texture,
            vertex_array: self.vertex_array,
            shader: self.shader,
            position: self.position,
            size: self.size,
            absolute_size: true,
            rotation: self.rotation,
            rotation_center: self.rotation_center,
            source: self.source,
            color: self.color,
        }
    }
}
