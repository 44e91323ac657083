//! Where the display canvas lands inside the window.

use glam::UVec2;

use crate::types::Rect;

/// Window size and the view rectangle derived from it.
///
/// With the aspect lock on, the view is the largest centered rectangle of
/// the preferred aspect ratio (letterboxing or pillarboxing the rest).
/// Without it the view fills the window and the preferred ratio follows the
/// window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewLayout {
    /// Preferred aspect ratio as a width and height pair, kept exact.
    preferred: UVec2,
    keep_aspect_ratio: bool,
    window_size: UVec2,
    view: Rect<i32>,
}

impl ViewLayout {
    /// Layout for a window of `window_size` showing content of
    /// `resolution`.
    pub fn new(window_size: UVec2, resolution: UVec2, keep_aspect_ratio: bool) -> Self {
        let preferred = if resolution.x == 0 || resolution.y == 0 {
            UVec2::ONE
        } else {
            resolution
        };
        let mut layout = Self {
            preferred,
            keep_aspect_ratio,
            window_size: UVec2::ZERO,
            view: Rect::default(),
        };
        layout.resize(window_size.x, window_size.y);
        layout
    }

    /// Recompute the view for a new window size.
    ///
    /// A zero-sized window (minimized) keeps the previous layout and returns
    /// `false`.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.window_size = UVec2::new(width, height);

        if !self.keep_aspect_ratio {
            self.preferred = self.window_size;
            self.view = Rect::new(0, 0, to_i32(width.into()), to_i32(height.into()));
            return true;
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (rw, rh) = (u64::from(self.preferred.x), u64::from(self.preferred.y));
        self.view = if w * rh > h * rw {
            let view_width = h * rw / rh;
            Rect::new(to_i32((w - view_width) / 2), 0, to_i32(view_width), to_i32(h))
        } else {
            let view_height = w * rh / rw;
            Rect::new(0, to_i32((h - view_height) / 2), to_i32(w), to_i32(view_height))
        };
        true
    }

    /// The view rectangle, GL convention (origin bottom-left).
    pub fn view_rect(&self) -> Rect<i32> {
        self.view
    }

    /// Current window size.
    pub fn window_size(&self) -> UVec2 {
        self.window_size
    }

    /// Preferred width / height ratio.
    pub fn preferred_ratio(&self) -> f64 {
        f64::from(self.preferred.x) / f64::from(self.preferred.y)
    }

    /// Whether the aspect lock is on.
    pub fn keeps_aspect_ratio(&self) -> bool {
        self.keep_aspect_ratio
    }

    /// Toggle the aspect lock and relayout.
    pub fn set_keep_aspect_ratio(&mut self, keep: bool) {
        self.keep_aspect_ratio = keep;
        self.resize(self.window_size.x, self.window_size.y);
    }
}

fn to_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_window_is_pillarboxed() {
        let layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
        assert_eq!(layout.view_rect(), Rect::new(53, 0, 533, 480));
    }

    #[test]
    fn tall_window_is_letterboxed() {
        let layout = ViewLayout::new(UVec2::new(400, 600), UVec2::new(200, 100), true);
        assert_eq!(layout.view_rect(), Rect::new(0, 200, 400, 200));
    }

    #[test]
    fn matching_ratio_fills_the_window() {
        let layout = ViewLayout::new(UVec2::new(320, 288), UVec2::new(160, 144), true);
        assert_eq!(layout.view_rect(), Rect::new(0, 0, 320, 288));
    }

    #[test]
    fn exact_ratio_leaves_no_bars() {
        let layout = ViewLayout::new(UVec2::new(35, 15), UVec2::new(7, 3), true);
        assert_eq!(layout.view_rect(), Rect::new(0, 0, 35, 15));
        let layout = ViewLayout::new(UVec2::new(1920, 1080), UVec2::new(16, 9), true);
        assert_eq!(layout.view_rect(), Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn minimized_window_keeps_the_previous_layout() {
        let mut layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
        let before = layout;
        assert!(!layout.resize(0, 0));
        assert!(!layout.resize(640, 0));
        assert_eq!(layout, before);
    }

    #[test]
    fn unlocked_view_fills_and_adopts_the_window_ratio() {
        let mut layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), false);
        assert_eq!(layout.view_rect(), Rect::new(0, 0, 640, 480));
        layout.resize(800, 200);
        assert_eq!(layout.view_rect(), Rect::new(0, 0, 800, 200));
        assert!((layout.preferred_ratio() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn locking_again_uses_the_adopted_ratio() {
        let mut layout = ViewLayout::new(UVec2::new(800, 200), UVec2::new(1, 1), false);
        layout.set_keep_aspect_ratio(true);
        layout.resize(800, 400);
        assert_eq!(layout.view_rect(), Rect::new(0, 100, 800, 200));
    }

    #[test]
    fn view_is_always_centered_and_inside_the_window() {
        for (w, h) in [(641, 480), (1920, 1080), (333, 999), (1, 1000), (1000, 1)] {
            let layout = ViewLayout::new(UVec2::new(w, h), UVec2::new(160, 144), true);
            let v = layout.view_rect();
            assert!(v.x >= 0 && v.y >= 0);
            assert!(v.x + v.width <= w as i32 && v.y + v.height <= h as i32);
            assert!((w as i32 - v.width - 2 * v.x).abs() <= 1);
            assert!((h as i32 - v.height - 2 * v.y).abs() <= 1);
        }
    }
}
