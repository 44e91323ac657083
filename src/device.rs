//! The GL context paired with its binding cache.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use glow::HasContext;

use crate::state::ContextState;
use crate::types::{Color, Rect};

/// An OpenGL context plus the [`ContextState`] that filters its binds.
///
/// Every GPU object allocates, binds and deletes through this type. It is
/// neither `Send` nor `Sync`: the GL context is current on exactly one
/// thread.
pub struct RenderDevice {
    gl: Arc<glow::Context>,
    state: RefCell<ContextState>,
    _not_send: PhantomData<*const ()>,
}

impl RenderDevice {
    /// Wrap a loaded GL context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread and must stay current, on
    /// this thread only, for as long as the device (and anything created
    /// through it) is alive.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            state: RefCell::new(ContextState::new()),
            _not_send: PhantomData,
        }
    }

    /// The raw glow context.
    ///
    /// GL calls made through it bypass the binding cache; call
    /// [`invalidate`](Self::invalidate) afterwards if they change bindings.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Forget every cached binding.
    pub fn invalidate(&self) {
        self.state.borrow_mut().invalidate();
    }

    /// Bind `texture` to texture unit `unit`.
    pub fn bind_texture(&self, unit: u32, texture: Option<glow::Texture>) {
        let mut state = self.state.borrow_mut();
        // SAFETY: the context is current on this thread (see `new`).
        unsafe {
            if state.active_texture(unit) {
                self.gl.active_texture(glow::TEXTURE0 + unit);
            }
            if state.texture_2d(texture) {
                self.gl.bind_texture(glow::TEXTURE_2D, texture);
            }
        }
    }

    /// Bind `framebuffer`, `None` being the window's framebuffer.
    pub fn bind_framebuffer(&self, framebuffer: Option<glow::Framebuffer>) {
        if self.state.borrow_mut().framebuffer(framebuffer) {
            // SAFETY: the context is current on this thread (see `new`).
            unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
        }
    }

    /// Bind a vertex array object.
    pub fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        if self.state.borrow_mut().vertex_array(vertex_array) {
            // SAFETY: the context is current on this thread (see `new`).
            unsafe { self.gl.bind_vertex_array(vertex_array) };
        }
    }

    /// Make `program` current.
    pub fn use_program(&self, program: Option<glow::Program>) {
        if self.state.borrow_mut().program(program) {
            // SAFETY: the context is current on this thread (see `new`).
            unsafe { self.gl.use_program(program) };
        }
    }

    /// Set the GL viewport.
    pub fn viewport(&self, rect: Rect<i32>) {
        // SAFETY: the context is current on this thread (see `new`).
        unsafe { self.gl.viewport(rect.x, rect.y, rect.width, rect.height) };
    }

    /// Clear the color buffer of the bound framebuffer.
    pub fn clear(&self, color: Color) {
        let c = color.to_vec4();
        // SAFETY: the context is current on this thread (see `new`).
        unsafe {
            self.gl.clear_color(c.x, c.y, c.z, c.w);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Enable straight-alpha blending, the mode every draw assumes.
    pub(crate) fn enable_alpha_blending(&self) {
        // SAFETY: the context is current on this thread (see `new`).
        unsafe {
            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }
    }

    pub(crate) fn delete_texture(&self, texture: glow::Texture) {
        self.state.borrow_mut().forget_texture(texture);
        // SAFETY: the context is current on this thread (see `new`).
        unsafe { self.gl.delete_texture(texture) };
    }

    pub(crate) fn delete_framebuffer(&self, framebuffer: glow::Framebuffer) {
        self.state.borrow_mut().forget_framebuffer(framebuffer);
        // SAFETY: the context is current on this thread (see `new`).
        unsafe { self.gl.delete_framebuffer(framebuffer) };
    }

    pub(crate) fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        self.state.borrow_mut().forget_vertex_array(vertex_array);
        // SAFETY: the context is current on this thread (see `new`).
        unsafe { self.gl.delete_vertex_array(vertex_array) };
    }

    pub(crate) fn delete_program(&self, program: glow::Program) {
        self.state.borrow_mut().forget_program(program);
        // SAFETY: the context is current on this thread (see `new`).
        unsafe { self.gl.delete_program(program) };
    }
}
