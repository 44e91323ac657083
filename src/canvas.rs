//! Canvases: render targets that know how to composite themselves onto the
//! window or onto another target.

use glam::{Mat4, UVec2, Vec2};

use crate::device::RenderDevice;
use crate::error::Result;
use crate::object::Handle;
use crate::render_texture::{DrawCommand, RenderTexture};
use crate::shader::Shader;
use crate::transform::{self, Placement};
use crate::types::{Color, Rect};
use crate::vertex_array::VertexArray;

/// A [`RenderTexture`] plus the shader and screen region it is displayed
/// with.
///
/// `display_space` is the part of the destination the canvas covers, in
/// normalized `[0, 1]` units: `(0, 0, 1, 1)` fills it. Without an explicit
/// display shader the canvas is shown with the library's default textured
/// shader.
pub struct Canvas {
    target: RenderTexture,
    display_shader: Option<Handle<Shader>>,
    owns_display_shader: bool,
    display_space: Rect,
}

impl Canvas {
    /// A canvas of `resolution` pixels over `coordinate_scale` (the
    /// resolution when `None`), covering its whole destination.
    ///
    /// # Errors
    ///
    /// See [`RenderTexture::new`].
    pub fn new(resolution: UVec2, coordinate_scale: Option<Vec2>) -> Result<Self> {
        Ok(Self {
            target: RenderTexture::new(resolution, coordinate_scale)?,
            display_shader: None,
            owns_display_shader: false,
            display_space: Rect::UNIT,
        })
    }

    /// Restrict the canvas to part of its destination.
    #[must_use]
    pub fn with_display_space(mut self, display_space: Rect) -> Self {
        self.display_space = display_space;
        self
    }

    /// The render target.
    pub fn target(&self) -> &RenderTexture {
        &self.target
    }

    /// Mutable access to the render target (pan, zoom, clear color).
    pub fn target_mut(&mut self) -> &mut RenderTexture {
        &mut self.target
    }

    /// Normalized region of the destination the canvas covers.
    pub fn display_space(&self) -> Rect {
        self.display_space
    }

    /// Change the covered region.
    pub fn set_display_space(&mut self, display_space: Rect) {
        self.display_space = display_space;
    }

    /// The explicit display shader, `None` meaning the default one.
    pub fn display_shader(&self) -> Option<Handle<Shader>> {
        self.display_shader
    }

    /// Whether the display shader is destroyed together with the canvas.
    pub fn owns_display_shader(&self) -> bool {
        self.owns_display_shader
    }

    /// Swap the display shader.
    ///
    /// Returns the previous shader if the canvas owned it; the caller is
    /// responsible for destroying it.
    pub(crate) fn replace_display_shader(
        &mut self,
        shader: Option<Handle<Shader>>,
        owned: bool,
    ) -> Option<Handle<Shader>> {
        let previous = self.display_shader.filter(|_| self.owns_display_shader);
        self.display_shader = shader;
        self.owns_display_shader = owned && shader.is_some();
        previous.filter(|previous| Some(*previous) != shader)
    }

    /// Draw this canvas's texture onto `destination`, covering
    /// `display_space` of the destination's coordinate space.
    pub fn draw_onto(
        &self,
        device: &RenderDevice,
        destination: &RenderTexture,
        shader: &Shader,
        quad: &VertexArray,
    ) {
        let model = self.placement_in(destination.coordinate_scale()).model();
        destination.draw(device, &self.command(shader, quad, model));
    }

    /// Where the canvas lands in a destination whose coordinate space is
    /// `coordinate_scale`.
    pub fn placement_in(&self, coordinate_scale: Vec2) -> Placement {
        Placement {
            position: self.display_space.position() * coordinate_scale,
            size: self.display_space.size() * coordinate_scale,
            rotation: 0.0,
            rotation_center: Vec2::ZERO,
        }
    }

    /// Composite onto the window.
    ///
    /// Clears the whole `window_size` framebuffer black, restricts the
    /// viewport to `view_rect` and draws the canvas into its display space
    /// within it.
    pub fn display(
        &self,
        device: &RenderDevice,
        view_rect: Rect<i32>,
        window_size: UVec2,
        shader: &Shader,
        quad: &VertexArray,
    ) {
        device.bind_framebuffer(None);
        #[expect(clippy::cast_possible_wrap)]
        device.viewport(Rect::new(0, 0, window_size.x as i32, window_size.y as i32));
        device.clear(Color::BLACK);
        device.viewport(view_rect);

        let projection = Mat4::orthographic_rh_gl(0.0, 1.0, 0.0, 1.0, -1.0, 1.0);
        let model = Placement {
            position: self.display_space.position(),
            size: self.display_space.size(),
            rotation: 0.0,
            rotation_center: Vec2::ZERO,
        }
        .model();
        self.command(shader, quad, model).submit(device, &projection);
    }

    /// Map a window position (pixels, top-left origin) to this canvas's
    /// coordinate space, pan and zoom included.
    ///
    /// `view_rect` is the letterboxed viewport the canvas is displayed in.
    /// Returns `None` for an empty view.
    pub fn unproject(&self, window_point: Vec2, view_rect: Rect<i32>, window_height: f32) -> Option<Vec2> {
        let viewport = view_rect.as_f32().sub_rect(self.display_space);
        let point = transform::flip_y(window_point, window_height);
        transform::unproject(point, &self.target.projection(), viewport)
    }

    /// The inverse of [`unproject`](Self::unproject).
    pub fn project(&self, world: Vec2, view_rect: Rect<i32>, window_height: f32) -> Vec2 {
        let viewport = view_rect.as_f32().sub_rect(self.display_space);
        let point = transform::project(world, &self.target.projection(), viewport);
        transform::flip_y(point, window_height)
    }

    fn command<'a>(&self, shader: &'a Shader, quad: &'a VertexArray, model: Mat4) -> DrawCommand<'a> {
        DrawCommand {
            shader,
            vertex_array: quad,
            texture: self.target.texture().raw(),
            model,
            source: Rect::UNIT,
            color: Color::WHITE,
        }
    }
}
