//! Small value types shared by the GPU objects.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

/// A vertex position, laid out for direct upload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in model space; the unit quad spans `[0, 1]²`.
    pub position: [f32; 2],
}

impl Vertex {
    /// Create a vertex at `(x, y)`.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

impl From<Vec2> for Vertex {
    fn from(value: Vec2) -> Self {
        Self {
            position: value.to_array(),
        }
    }
}

/// An 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 0xFF);
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    /// Color from all four channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xFF)
    }

    /// Every channel, alpha included, set to `value`.
    pub const fn splat(value: u8) -> Self {
        Self::rgba(value, value, value, value)
    }

    /// Normalized `[0, 1]` channels, as uploaded to `u_color`.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            f32::from(self.r),
            f32::from(self.g),
            f32::from(self.b),
            f32::from(self.a),
        ) / 255.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// An axis-aligned rectangle given by its bottom-left corner and size.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect<T = f32> {
    /// Left edge.
    pub x: T,
    /// Bottom edge (GL convention) or top edge for window-space data.
    pub y: T,
    /// Horizontal extent.
    pub width: T,
    /// Vertical extent.
    pub height: T,
}

impl<T> Rect<T> {
    /// Rectangle from position and size.
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Rect<f32> {
    /// The unit rectangle `(0, 0, 1, 1)`.
    pub const UNIT: Rect<f32> = Rect::new(0.0, 0.0, 1.0, 1.0);

    /// Bottom-left corner.
    pub fn position(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Width and height.
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// `(x, y, width, height)` packed for `u_texture_source`.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.width, self.height)
    }

    /// Map a rectangle given in normalized `[0, 1]` units of `self` into
    /// the space `self` lives in.
    pub fn sub_rect(self, normalized: Rect<f32>) -> Rect<f32> {
        Rect::new(
            self.x + normalized.x * self.width,
            self.y + normalized.y * self.height,
            normalized.width * self.width,
            normalized.height * self.height,
        )
    }
}

impl Rect<i32> {
    /// Convert to floating point.
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f32(self) -> Rect<f32> {
        Rect::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_normalizes_channels() {
        let c = Color::rgba(255, 0, 51, 102).to_vec4();
        assert!((c.x - 1.0).abs() < f32::EPSILON);
        assert!(c.y.abs() < f32::EPSILON);
        assert!((c.z - 0.2).abs() < 1e-6);
        assert!((c.w - 0.4).abs() < 1e-6);
    }

    #[test]
    fn sub_rect_scales_and_offsets() {
        let outer = Rect::new(10.0, 20.0, 100.0, 50.0);
        let inner = outer.sub_rect(Rect::new(0.5, 0.0, 0.5, 1.0));
        assert_eq!(inner, Rect::new(60.0, 20.0, 50.0, 50.0));
        assert_eq!(outer.sub_rect(Rect::UNIT), outer);
    }
}
