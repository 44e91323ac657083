//! Projection, model and unprojection math for render targets.
//!
//! Everything here is pure so the coordinate round trips can be tested
//! without a GL context.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::types::Rect;

/// The logical coordinate space of a render target plus its pan and zoom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct View {
    /// Extent of the logical coordinate space; `(0, 0)` is the bottom-left
    /// corner and `coordinate_scale` the top-right one.
    pub coordinate_scale: Vec2,
    /// Pan, in logical units.
    pub offset: Vec2,
    /// Zoom factor around [`scale_center`](Self::scale_center).
    pub scale: f32,
    /// Fixed point of the zoom, in logical units.
    pub scale_center: Vec2,
}

impl View {
    /// An unpanned, unzoomed view over `coordinate_scale`, zooming around
    /// its middle.
    pub fn new(coordinate_scale: Vec2) -> Self {
        Self {
            coordinate_scale,
            offset: Vec2::ZERO,
            scale: 1.0,
            scale_center: coordinate_scale * 0.5,
        }
    }

    /// Logical coordinates to clip space.
    pub fn projection(&self) -> Mat4 {
        let ortho = Mat4::orthographic_rh_gl(0.0, self.coordinate_scale.x, 0.0, self.coordinate_scale.y, -1.0, 1.0);
        let center = self.scale_center.extend(0.0);
        ortho
            * Mat4::from_translation(center)
            * Mat4::from_scale(Vec3::new(self.scale, self.scale, 1.0))
            * Mat4::from_translation(-center)
            * Mat4::from_translation(-self.offset.extend(0.0))
    }
}

/// Placement of a unit-sized mesh in a target's coordinate space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    /// Bottom-left corner before rotation.
    pub position: Vec2,
    /// Final extent of the unit mesh.
    pub size: Vec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    /// Rotation pivot as a fraction of `size`.
    pub rotation_center: Vec2,
}

impl Placement {
    /// Unit mesh to target coordinates.
    ///
    /// `T(position) · [T(pivot) · R · T(-pivot)] · S(size)` with
    /// `pivot = rotation_center * size`; the rotation block is skipped for a
    /// zero rotation.
    pub fn model(&self) -> Mat4 {
        let mut model = Mat4::from_translation(self.position.extend(0.0));
        if self.rotation != 0.0 {
            let pivot = (self.rotation_center * self.size).extend(0.0);
            model = model
                * Mat4::from_translation(pivot)
                * Mat4::from_rotation_z(self.rotation)
                * Mat4::from_translation(-pivot);
        }
        model * Mat4::from_scale(self.size.extend(1.0))
    }
}

/// The drawn size of a textured draw.
///
/// Absolute sizes are used as-is; otherwise `size` scales the pixel size of
/// the sampled part of the texture.
pub fn sprite_size(size: Vec2, absolute: bool, texture_size: Vec2, source: Rect) -> Vec2 {
    if absolute {
        size
    } else {
        size * texture_size * source.size()
    }
}

/// World point to window coordinates (GL convention, origin bottom-left)
/// inside `viewport`.
pub fn project(world: Vec2, projection: &Mat4, viewport: Rect) -> Vec2 {
    let clip = *projection * Vec4::new(world.x, world.y, 0.0, 1.0);
    let ndc = clip.truncate().truncate() / clip.w;
    viewport.position() + (ndc + Vec2::ONE) * 0.5 * viewport.size()
}

/// Window coordinates (GL convention) inside `viewport` back to the world
/// point `projection` maps there.
///
/// Returns `None` when the projection is not invertible or the viewport is
/// empty.
pub fn unproject(window: Vec2, projection: &Mat4, viewport: Rect) -> Option<Vec2> {
    if viewport.width == 0.0 || viewport.height == 0.0 || projection.determinant() == 0.0 {
        return None;
    }
    let ndc = (window - viewport.position()) / viewport.size() * 2.0 - Vec2::ONE;
    let world = projection.inverse() * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
    Some(world.truncate().truncate() / world.w)
}

/// Flip a window y coordinate between top-left and bottom-left origins.
pub fn flip_y(point: Vec2, window_height: f32) -> Vec2 {
    Vec2::new(point.x, window_height - point.y)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-3
    }

    #[test]
    fn plain_view_maps_corners_to_clip_corners() {
        let view = View::new(Vec2::new(160.0, 144.0));
        let p = view.projection();
        let bl = p * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let tr = p * Vec4::new(160.0, 144.0, 0.0, 1.0);
        assert!(close(bl.truncate().truncate(), Vec2::new(-1.0, -1.0)));
        assert!(close(tr.truncate().truncate(), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn offset_pans_the_view() {
        let mut view = View::new(Vec2::new(100.0, 100.0));
        view.offset = Vec2::new(50.0, 0.0);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let window = project(Vec2::new(50.0, 0.0), &view.projection(), viewport);
        assert!(close(window, Vec2::ZERO));
    }

    #[test]
    fn zoom_keeps_the_center_fixed() {
        let mut view = View::new(Vec2::new(100.0, 100.0));
        view.scale = 2.0;
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let p = view.projection();
        assert!(close(project(Vec2::new(50.0, 50.0), &p, viewport), Vec2::new(50.0, 50.0)));
        assert!(close(project(Vec2::new(75.0, 50.0), &p, viewport), Vec2::new(100.0, 50.0)));
    }

    #[test]
    fn unrotated_model_scales_then_translates() {
        let model = Placement {
            position: Vec2::new(10.0, 20.0),
            size: Vec2::new(4.0, 8.0),
            rotation: 0.0,
            rotation_center: Vec2::splat(0.5),
        }
        .model();
        let corner = model * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert!(close(corner.truncate().truncate(), Vec2::new(14.0, 28.0)));
    }

    #[test]
    fn rotation_turns_around_the_pivot() {
        let model = Placement {
            position: Vec2::ZERO,
            size: Vec2::new(2.0, 2.0),
            rotation: FRAC_PI_2,
            rotation_center: Vec2::splat(0.5),
        }
        .model();
        // The pivot (1, 1) is fixed; the origin corner moves to (2, 0).
        let pivot = model * Vec4::new(0.5, 0.5, 0.0, 1.0);
        let origin = model * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(close(pivot.truncate().truncate(), Vec2::new(1.0, 1.0)));
        assert!(close(origin.truncate().truncate(), Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn relative_sprite_size_uses_the_source_pixels() {
        let source = Rect::new(0.0, 0.0, 0.5, 0.25);
        let size = sprite_size(Vec2::splat(2.0), false, Vec2::new(64.0, 64.0), source);
        assert_eq!(size, Vec2::new(64.0, 32.0));
        assert_eq!(sprite_size(Vec2::splat(2.0), true, Vec2::new(64.0, 64.0), source), Vec2::splat(2.0));
    }

    #[test]
    fn unproject_inverts_project_with_letterbox_pan_and_zoom() {
        let mut view = View::new(Vec2::new(160.0, 144.0));
        view.offset = Vec2::new(-12.5, 30.0);
        view.scale = 1.75;
        view.scale_center = Vec2::new(40.0, 90.0);
        let projection = view.projection();
        let viewport = Rect::new(53.0, 0.0, 533.0, 480.0);

        for world in [Vec2::ZERO, Vec2::new(80.0, 72.0), Vec2::new(-3.0, 200.0), Vec2::new(159.0, 1.0)] {
            let window = project(world, &projection, viewport);
            let back = unproject(window, &projection, viewport).unwrap();
            assert!(close(back, world), "{world} -> {window} -> {back}");
        }
    }

    #[test]
    fn unproject_rejects_empty_viewports() {
        let projection = View::new(Vec2::ONE).projection();
        assert!(unproject(Vec2::ZERO, &projection, Rect::new(0.0, 0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn flip_y_is_an_involution() {
        let p = Vec2::new(3.0, 10.0);
        assert_eq!(flip_y(p, 480.0), Vec2::new(3.0, 470.0));
        assert_eq!(flip_y(flip_y(p, 480.0), 480.0), p);
    }
}
