//! The native window, its GL context and the display canvas.

use std::cell::RefCell;
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{UVec2, Vec2};
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::drawable::{Polygon, Sprite};
use crate::error::{Error, Result};
use crate::input::InputManager;
use crate::object::Handle;
use crate::shader::Shader;
use crate::timer::Timer;
use crate::types::{Color, Rect};
use crate::viewport::ViewLayout;

/// Pixels per line for touchpads that report scrolling in pixels.
const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

static WINDOW_OPEN: AtomicBool = AtomicBool::new(false);

thread_local! {
    /// Event loop of the last closed window. winit creates one per process.
    static PARKED_EVENT_LOOP: RefCell<Option<EventLoop<()>>> = const { RefCell::new(None) };
}

/// The thread's event loop, parked again when dropped.
struct PumpedLoop(ManuallyDrop<EventLoop<()>>);

impl PumpedLoop {
    fn take() -> Result<Self> {
        let event_loop = match PARKED_EVENT_LOOP.with_borrow_mut(Option::take) {
            Some(event_loop) => {
                log::debug!("reusing the event loop of a closed window");
                event_loop
            }
            None => EventLoop::new().map_err(|err| Error::WindowCreation(err.to_string()))?,
        };
        Ok(Self(ManuallyDrop::new(event_loop)))
    }
}

impl Drop for PumpedLoop {
    fn drop(&mut self) {
        // SAFETY: the loop is taken exactly once, here, and never touched after.
        let event_loop = unsafe { ManuallyDrop::take(&mut self.0) };
        PARKED_EVENT_LOOP.with_borrow_mut(|slot| *slot = Some(event_loop));
    }
}

/// Settings for [`Window::new`].
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Title bar text.
    pub title: String,
    /// Initial window size in physical pixels.
    pub size: UVec2,
    /// Display canvas resolution. Defaults to `size`.
    pub resolution: Option<UVec2>,
    /// Display canvas coordinate space. Defaults to the resolution.
    pub coordinate_scale: Option<Vec2>,
    /// Letterbox the canvas to its aspect ratio.
    pub keep_aspect_ratio: bool,
    /// Wait for vertical sync on buffer swaps.
    pub vsync: bool,
    /// Color the display canvas is cleared to each frame.
    pub clear_color: Color,
}

impl WindowConfig {
    /// A config with the given title and default everything else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the window size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = UVec2::new(width, height);
        self
    }

    /// Set the canvas resolution.
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some(UVec2::new(width, height));
        self
    }

    /// Set the canvas coordinate space.
    #[must_use]
    pub fn with_coordinate_scale(mut self, coordinate_scale: Vec2) -> Self {
        self.coordinate_scale = Some(coordinate_scale);
        self
    }

    /// Toggle letterboxing.
    #[must_use]
    pub fn with_keep_aspect_ratio(mut self, keep: bool) -> Self {
        self.keep_aspect_ratio = keep;
        self
    }

    /// Toggle vsync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the canvas clear color.
    #[must_use]
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    fn resolution(&self) -> UVec2 {
        self.resolution.unwrap_or(self.size)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("canvas-gl"),
            size: UVec2::new(640, 480),
            resolution: None,
            coordinate_scale: None,
            keep_aspect_ratio: true,
            vsync: true,
            clear_color: Color::BLACK,
        }
    }
}

/// Holds the process-wide window flag until dropped.
struct SingleWindow;

impl SingleWindow {
    fn acquire() -> Result<Self> {
        if WINDOW_OPEN.swap(true, Ordering::AcqRel) {
            log::warn!("a window is already open");
            return Err(Error::WindowAlreadyOpen);
        }
        Ok(Self)
    }
}

impl Drop for SingleWindow {
    fn drop(&mut self) {
        WINDOW_OPEN.store(false, Ordering::Release);
    }
}

/// Collects the events of one [`Window::update`].
struct EventSink<'a> {
    window_id: WindowId,
    input: &'a mut InputManager,
    resized: Option<PhysicalSize<u32>>,
    close_requested: bool,
}

impl ApplicationHandler for EventSink<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        self.handle(window_id, event);
    }
}

impl EventSink<'_> {
    fn handle(&mut self, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Resized(size) => self.resized = Some(size),
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.input.handle_key(code, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.input.handle_mouse_button(button, state),
            WindowEvent::CursorMoved { position, .. } => {
                self.input.handle_cursor_moved(to_vec2(position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y),
                    MouseScrollDelta::PixelDelta(pixels) => to_vec2(pixels.x, pixels.y) / PIXELS_PER_SCROLL_LINE,
                };
                self.input.handle_scroll(lines);
            }
            _ => {}
        }
    }
}

#[expect(clippy::cast_possible_truncation)]
fn to_vec2(x: f64, y: f64) -> Vec2 {
    Vec2::new(x as f32, y as f32)
}

/// A window showing one display canvas.
///
/// Everything is drawn into the canvas at its fixed resolution; at the end
/// of the frame the canvas is scaled into the window, letterboxed when the
/// aspect lock is on. Only one window can be open at a time. Once it is
/// dropped another may be opened on the same thread, which takes over the
/// closed window's event loop.
///
/// ```no_run
/// use canvas_gl::{Sprite, TextureData, Window, WindowConfig};
///
/// # fn main() -> canvas_gl::Result<()> {
/// let mut window = Window::new(&WindowConfig::new("demo").with_resolution(160, 144))?;
/// let pixel = TextureData::new(vec![255; 4], 1, 1, 4)?;
/// let ship = window.context_mut().create_texture("ship", pixel)?;
/// while !window.should_close() {
///     window.update();
///     window.begin_frame();
///     window.draw_sprite(&Sprite::new(ship));
///     window.end_frame();
/// }
/// # Ok(())
/// # }
/// ```
pub struct Window {
    context: RenderContext,
    canvas: Handle<Canvas>,
    layout: ViewLayout,
    input: InputManager,
    timer: Timer,
    in_frame: bool,
    should_close: bool,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: winit::window::Window,
    event_loop: PumpedLoop,
    _single: SingleWindow,
}

impl Window {
    /// Open the window, create an OpenGL 3.3 core context and the display
    /// canvas.
    ///
    /// # Errors
    ///
    /// [`Error::WindowAlreadyOpen`], [`Error::WindowCreation`],
    /// [`Error::ContextCreation`], [`Error::UnsupportedGlVersion`] or a
    /// failure to allocate the canvas. Opening a window on a different
    /// thread than an earlier one fails with [`Error::WindowCreation`],
    /// since winit allows a single event loop per process.
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let single = SingleWindow::acquire()?;

        let event_loop = PumpedLoop::take()?;
        let attributes = winit::window::Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.size.x.max(1), config.size.y.max(1)));
        #[allow(deprecated)]
        let window = event_loop
            .0
            .create_window(attributes)
            .map_err(|err| Error::WindowCreation(err.to_string()))?;

        let (gl_surface, gl_context, gl) = create_gl_context(&window, config.vsync)?;
        check_gl_version(&gl)?;
        log::info!(
            "OpenGL {} ({})",
            // SAFETY: the context was made current above.
            unsafe { gl.get_parameter_string(glow::VERSION) },
            unsafe { gl.get_parameter_string(glow::RENDERER) },
        );

        // SAFETY: the context is current on this thread and outlives
        // `context`, which is dropped first.
        let mut context = unsafe { RenderContext::new(Arc::new(gl))? };
        let canvas = context.create_canvas(config.resolution(), config.coordinate_scale)?;
        if let Some(canvas) = context.get_mut(canvas) {
            canvas.target_mut().set_clear_color(config.clear_color);
        }

        let size = window.inner_size();
        let layout = ViewLayout::new(
            UVec2::new(size.width, size.height),
            config.resolution(),
            config.keep_aspect_ratio,
        );

        Ok(Self {
            context,
            canvas,
            layout,
            input: InputManager::new(),
            timer: Timer::new(),
            in_frame: false,
            should_close: false,
            gl_surface,
            gl_context,
            window,
            event_loop,
            _single: single,
        })
    }

    /// Process pending OS events and advance one frame.
    ///
    /// Returns the seconds elapsed since the previous call.
    pub fn update(&mut self) -> f32 {
        let mut sink = EventSink {
            window_id: self.window.id(),
            input: &mut self.input,
            resized: None,
            close_requested: false,
        };
        let status = self.event_loop.0.pump_app_events(Some(Duration::ZERO), &mut sink);
        let (resized, close_requested) = (sink.resized, sink.close_requested);

        if close_requested || matches!(status, PumpStatus::Exit(_)) {
            self.should_close = true;
        }
        if let Some(size) = resized {
            self.resize(size);
        }

        let delta = self.timer.tick();
        self.input.update(delta);
        delta
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if !self.layout.resize(size.width, size.height) {
            return;
        }
        if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            self.gl_surface.resize(&self.gl_context, width, height);
        }
        log::debug!("window resized to {}x{}, view {:?}", size.width, size.height, self.layout.view_rect());
    }

    /// Start a frame by clearing the display canvas.
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            log::warn!("begin_frame called twice without end_frame");
            return;
        }
        self.in_frame = true;
        self.context.clear(self.canvas.as_render_texture());
    }

    /// Finish a frame: show the canvas and swap buffers.
    pub fn end_frame(&mut self) {
        if !self.in_frame {
            log::warn!("end_frame called without begin_frame");
            return;
        }
        self.in_frame = false;
        self.context
            .display(self.canvas, self.layout.view_rect(), self.layout.window_size());
        if let Err(err) = self.gl_surface.swap_buffers(&self.gl_context) {
            log::error!("failed to swap buffers: {err}");
        }
    }

    /// Draw a sprite onto the display canvas.
    pub fn draw_sprite(&self, sprite: &Sprite) {
        self.context.draw_sprite(self.canvas.as_render_texture(), sprite);
    }

    /// Draw a polygon onto the display canvas.
    pub fn draw_polygon(&self, polygon: &Polygon) {
        self.context.draw_polygon(self.canvas.as_render_texture(), polygon);
    }

    /// Draw another canvas onto the display canvas.
    pub fn draw_canvas(&self, canvas: Handle<Canvas>) {
        self.context.draw_canvas(self.canvas.as_render_texture(), canvas);
    }

    /// Whether the user asked to close the window.
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Request (or cancel a request) to close.
    pub fn set_should_close(&mut self, should_close: bool) {
        self.should_close = should_close;
    }

    /// Keyboard and mouse state.
    pub fn input(&self) -> &InputManager {
        &self.input
    }

    /// Mutable input state, for watching keys.
    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    /// Frame timing.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// The render context.
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Mutable render context, for creating and destroying objects.
    pub fn context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }

    /// The display canvas.
    pub fn canvas(&self) -> Handle<Canvas> {
        self.canvas
    }

    /// Where the canvas is shown, GL window coordinates.
    pub fn view_rect(&self) -> Rect<i32> {
        self.layout.view_rect()
    }

    /// The window and view layout.
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    /// Toggle letterboxing.
    pub fn set_keep_aspect_ratio(&mut self, keep: bool) {
        self.layout.set_keep_aspect_ratio(keep);
    }

    /// The underlying winit window.
    pub fn native(&self) -> &winit::window::Window {
        &self.window
    }

    /// The cursor in canvas coordinates, pan and zoom included.
    ///
    /// `None` while the view is empty.
    #[expect(clippy::cast_precision_loss)]
    pub fn mouse_position(&self) -> Option<Vec2> {
        let canvas = self.context.get(self.canvas)?;
        canvas.unproject(
            self.input.mouse_position(),
            self.layout.view_rect(),
            self.layout.window_size().y as f32,
        )
    }

    /// Canvas pan.
    pub fn offset(&self) -> Vec2 {
        self.with_canvas(|canvas| canvas.target().offset()).unwrap_or(Vec2::ZERO)
    }

    /// Set the canvas pan.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.with_canvas_mut(|canvas| canvas.target_mut().set_offset(offset));
    }

    /// Pan the canvas by `delta`.
    pub fn add_offset(&mut self, delta: Vec2) {
        self.with_canvas_mut(|canvas| canvas.target_mut().add_offset(delta));
    }

    /// Canvas zoom.
    pub fn scale(&self) -> f32 {
        self.with_canvas(|canvas| canvas.target().scale()).unwrap_or(1.0)
    }

    /// Set the canvas zoom.
    pub fn set_scale(&mut self, scale: f32) {
        self.with_canvas_mut(|canvas| canvas.target_mut().set_scale(scale));
    }

    /// Point the canvas zooms around.
    pub fn scale_center(&self) -> Vec2 {
        self.with_canvas(|canvas| canvas.target().scale_center()).unwrap_or(Vec2::ZERO)
    }

    /// Set the point the canvas zooms around.
    pub fn set_scale_center(&mut self, scale_center: Vec2) {
        self.with_canvas_mut(|canvas| canvas.target_mut().set_scale_center(scale_center));
    }

    /// Canvas clear color.
    pub fn clear_color(&self) -> Color {
        self.with_canvas(|canvas| canvas.target().clear_color()).unwrap_or(Color::BLACK)
    }

    /// Set the canvas clear color.
    pub fn set_clear_color(&mut self, color: Color) {
        self.with_canvas_mut(|canvas| canvas.target_mut().set_clear_color(color));
    }

    /// Show the canvas through `shader` (`None` for the default).
    pub fn set_display_shader(&mut self, shader: Option<Handle<Shader>>, owned: bool) {
        self.context.set_display_shader(self.canvas, shader, owned);
    }

    fn with_canvas<R>(&self, f: impl FnOnce(&Canvas) -> R) -> Option<R> {
        self.context.get(self.canvas).map(f)
    }

    fn with_canvas_mut(&mut self, f: impl FnOnce(&mut Canvas)) {
        if let Some(canvas) = self.context.get_mut(self.canvas) {
            f(canvas);
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let released = self.context.tear_down();
        log::debug!("window closed, released {released} GPU objects");
    }
}

fn create_gl_context(
    window: &winit::window::Window,
    vsync: bool,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext, glow::Context)> {
    let context_error = |err: &dyn std::fmt::Display| Error::ContextCreation(err.to_string());

    let display_handle = window.display_handle().map_err(|err| context_error(&err))?.as_raw();
    let window_handle = window.window_handle().map_err(|err| context_error(&err))?.as_raw();

    #[cfg(target_os = "windows")]
    let preference = DisplayApiPreference::Wgl(Some(window_handle));
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(all(unix, not(target_os = "macos")))]
    let preference = DisplayApiPreference::Egl;

    // SAFETY: the handles come from a live window that outlives the display.
    let display = unsafe { Display::new(display_handle, preference) }.map_err(|err| context_error(&err))?;

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .compatible_with_native_window(window_handle)
        .build();
    // SAFETY: as above.
    let config = unsafe { display.find_configs(template) }
        .map_err(|err| context_error(&err))?
        .next()
        .ok_or_else(|| Error::ContextCreation(String::from("no suitable GL config")))?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        window_handle,
        NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
        NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
    );
    // SAFETY: as above.
    let surface =
        unsafe { display.create_window_surface(&config, &surface_attributes) }.map_err(|err| context_error(&err))?;

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .with_profile(GlProfile::Core)
        .build(Some(window_handle));
    // SAFETY: as above.
    let context = unsafe { display.create_context(&config, &context_attributes) }
        .and_then(|context| context.make_current(&surface))
        .map_err(|err| context_error(&err))?;

    let interval = if vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(err) = surface.set_swap_interval(&context, interval) {
        log::warn!("failed to set swap interval: {err}");
    }

    // SAFETY: the context is current and the loader belongs to its display.
    let gl = unsafe { glow::Context::from_loader_function_cstr(|name: &CStr| display.get_proc_address(name)) };
    Ok((surface, context, gl))
}

fn check_gl_version(gl: &glow::Context) -> Result<()> {
    let version = gl.version();
    if version.is_embedded || (version.major, version.minor) < (3, 3) {
        log::error!("OpenGL {}.{} is too old", version.major, version.minor);
        return Err(Error::UnsupportedGlVersion {
            major: version.major,
            minor: version.minor,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = WindowConfig::default();
        assert!(config.keep_aspect_ratio);
        assert!(config.vsync);
        assert_eq!(config.resolution(), config.size);
        assert_eq!(config.clear_color, Color::BLACK);
    }

    #[test]
    fn builder_overrides() {
        let config = WindowConfig::new("game")
            .with_size(1280, 720)
            .with_resolution(320, 180)
            .with_coordinate_scale(Vec2::new(16.0, 9.0))
            .with_keep_aspect_ratio(false)
            .with_vsync(false);
        assert_eq!(config.title, "game");
        assert_eq!(config.resolution(), UVec2::new(320, 180));
        assert_eq!(config.coordinate_scale, Some(Vec2::new(16.0, 9.0)));
        assert!(!config.keep_aspect_ratio);
        assert!(!config.vsync);
    }

    #[test]
    fn only_one_window_flag_at_a_time() {
        let first = SingleWindow::acquire().unwrap();
        assert!(matches!(SingleWindow::acquire(), Err(Error::WindowAlreadyOpen)));
        drop(first);
        let again = SingleWindow::acquire();
        assert!(again.is_ok());
    }

    #[test]
    fn events_of_a_closed_window_are_ignored() {
        let mut input = InputManager::new();
        let mut sink = EventSink {
            window_id: WindowId::from(2_u64),
            input: &mut input,
            resized: None,
            close_requested: false,
        };
        sink.handle(WindowId::from(1_u64), WindowEvent::CloseRequested);
        sink.handle(WindowId::from(1_u64), WindowEvent::Resized(PhysicalSize::new(10, 10)));
        assert!(!sink.close_requested);
        assert_eq!(sink.resized, None);

        sink.handle(WindowId::from(2_u64), WindowEvent::Resized(PhysicalSize::new(640, 480)));
        sink.handle(WindowId::from(2_u64), WindowEvent::CloseRequested);
        assert!(sink.close_requested);
        assert_eq!(sink.resized, Some(PhysicalSize::new(640, 480)));
    }
}
