#![allow(clippy::unwrap_used)]

use canvas_gl::glam::{UVec2, Vec2};
use canvas_gl::transform::{flip_y, project, unproject, View};
use canvas_gl::{Rect, ViewLayout};

const EPS: f32 = 1e-3;

fn close(a: Vec2, b: Vec2) -> bool {
    (a - b).abs().max_element() < EPS
}

/// The viewport a full-window canvas is shown in, as floats.
fn viewport(layout: &ViewLayout) -> Rect {
    layout.view_rect().as_f32().sub_rect(Rect::UNIT)
}

#[test]
fn pillarboxed_canvas_corners_land_on_the_view_edges() {
    let layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
    assert_eq!(layout.view_rect(), Rect::new(53, 0, 533, 480));

    let projection = View::new(Vec2::new(160.0, 144.0)).projection();
    let vp = viewport(&layout);
    assert!(close(project(Vec2::ZERO, &projection, vp), Vec2::new(53.0, 0.0)));
    assert!(close(project(Vec2::new(160.0, 144.0), &projection, vp), Vec2::new(586.0, 480.0)));
    assert!(close(project(Vec2::new(80.0, 72.0), &projection, vp), Vec2::new(319.5, 240.0)));
}

#[test]
fn mouse_in_the_window_center_is_the_canvas_center() {
    let layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
    let projection = View::new(Vec2::new(160.0, 144.0)).projection();
    let mouse = flip_y(Vec2::new(319.5, 240.0), 480.0);
    let world = unproject(mouse, &projection, viewport(&layout)).unwrap();
    assert!(close(world, Vec2::new(80.0, 72.0)));
}

#[test]
fn clicks_on_the_bars_fall_outside_the_canvas() {
    let layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
    let projection = View::new(Vec2::new(160.0, 144.0)).projection();
    let world = unproject(Vec2::new(10.0, 240.0), &projection, viewport(&layout)).unwrap();
    assert!(world.x < 0.0);
}

#[test]
fn round_trip_with_pan_zoom_and_letterbox() {
    let layout = ViewLayout::new(UVec2::new(1000, 1000), UVec2::new(320, 180), true);
    let mut view = View::new(Vec2::new(16.0, 9.0));
    view.offset = Vec2::new(-3.0, 1.5);
    view.scale = 2.5;
    view.scale_center = Vec2::new(4.0, 2.0);
    let projection = view.projection();
    let vp = viewport(&layout);

    for x in [-5.0, 0.0, 3.25, 8.0, 16.0] {
        for y in [-1.0, 0.0, 4.5, 9.0] {
            let world = Vec2::new(x, y);
            let window = flip_y(project(world, &projection, vp), 1000.0);
            let back = unproject(flip_y(window, 1000.0), &projection, vp).unwrap();
            assert!(close(back, world), "{world} came back as {back}");
        }
    }
}

#[test]
fn partial_display_space_round_trips() {
    let layout = ViewLayout::new(UVec2::new(800, 600), UVec2::new(800, 600), true);
    let display_space = Rect::new(0.5, 0.0, 0.5, 0.5);
    let vp = layout.view_rect().as_f32().sub_rect(display_space);
    assert_eq!(vp, Rect::new(400.0, 0.0, 400.0, 300.0));

    let projection = View::new(Vec2::new(100.0, 100.0)).projection();
    let world = Vec2::new(25.0, 75.0);
    let back = unproject(project(world, &projection, vp), &projection, vp).unwrap();
    assert!(close(back, world));
}

#[test]
fn minimized_window_keeps_the_mapping() {
    let mut layout = ViewLayout::new(UVec2::new(640, 480), UVec2::new(160, 144), true);
    let before = layout.view_rect();
    layout.resize(0, 0);
    assert_eq!(layout.view_rect(), before);
    assert!(unproject(Vec2::ZERO, &View::new(Vec2::ONE).projection(), viewport(&layout)).is_some());
}

#[test]
fn empty_viewport_cannot_be_unprojected() {
    let projection = View::new(Vec2::new(10.0, 10.0)).projection();
    assert!(unproject(Vec2::ZERO, &projection, Rect::new(0.0, 0.0, 0.0, 10.0)).is_none());
}
