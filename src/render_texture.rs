//! Off-screen render targets: a framebuffer with a backing texture and a
//! pannable, zoomable logical coordinate space.

use glam::{Mat4, UVec2, Vec2};
use glow::HasContext;

use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::shader::Shader;
use crate::texture::{gl_size, Texture};
use crate::transform::View;
use crate::types::{Color, Rect};
use crate::vertex_array::VertexArray;

/// Sampler uniform every textured draw binds on slot 0.
pub const TEXTURE_UNIFORM: &str = "u_texture0";

const TEXTURE_SLOT: u32 = 0;

/// One fully resolved draw: every object it needs is borrowed and every
/// matrix but the projection is computed.
pub struct DrawCommand<'a> {
    /// Program to draw with.
    pub shader: &'a Shader,
    /// Geometry.
    pub vertex_array: &'a VertexArray,
    /// Texture bound to [`TEXTURE_UNIFORM`], if the draw is textured.
    pub texture: Option<glow::Texture>,
    /// Mesh to target coordinates.
    pub model: Mat4,
    /// Normalized source rectangle of the texture.
    pub source: Rect,
    /// Tint, or the fill color of untextured draws.
    pub color: Color,
}

impl DrawCommand<'_> {
    /// Upload the uniforms and draw with `projection`.
    ///
    /// Does nothing if the shader failed to compile.
    pub fn submit(&self, device: &RenderDevice, projection: &Mat4) {
        let shader = self.shader;
        if !shader.is_valid() {
            return;
        }
        shader.set_mat4(device, "u_projection", projection);
        shader.set_mat4(device, "u_model", &self.model);
        shader.set_vec4(device, "u_texture_source", self.source.to_vec4());
        shader.set_vec4(device, "u_color", self.color.to_vec4());
        if let Some(texture) = self.texture {
            if let Err(err) = shader.set_sampler(device, TEXTURE_UNIFORM, TEXTURE_SLOT, Some(texture)) {
                log::warn!("textured draw skipped: {err}");
                return;
            }
        }
        if shader.setup_for_draw(device) {
            self.vertex_array.draw(device);
        }
    }
}

/// A framebuffer drawing into its own texture.
///
/// The target has two sizes: its `resolution` in pixels and its logical
/// `coordinate_scale`, the extent of the space draws are positioned in.
/// Pan ([`offset`](Self::offset)) and zoom ([`scale`](Self::scale) around
/// [`scale_center`](Self::scale_center)) apply on top of that.
pub struct RenderTexture {
    resolution: UVec2,
    texture: Texture,
    framebuffer: Option<glow::Framebuffer>,
    view: View,
    clear_color: Color,
}

impl RenderTexture {
    /// A target of `resolution` pixels whose coordinate space is
    /// `coordinate_scale`, or the resolution itself when `None`.
    ///
    /// # Errors
    ///
    /// Never fails for the RGBA backing texture; the `Result` mirrors
    /// [`Texture::empty`].
    pub fn new(resolution: UVec2, coordinate_scale: Option<Vec2>) -> Result<Self> {
        let coordinate_scale = coordinate_scale.unwrap_or(resolution.as_vec2());
        Ok(Self {
            resolution,
            texture: Texture::empty(resolution, 4)?,
            framebuffer: None,
            view: View::new(coordinate_scale),
            clear_color: Color::TRANSPARENT,
        })
    }

    /// Size in pixels.
    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// The backing texture.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// The GL framebuffer name, `None` until allocated.
    pub fn raw_framebuffer(&self) -> Option<glow::Framebuffer> {
        self.framebuffer
    }

    /// Coordinate space, pan and zoom.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Extent of the logical coordinate space.
    pub fn coordinate_scale(&self) -> Vec2 {
        self.view.coordinate_scale
    }

    /// Change the logical coordinate space.
    pub fn set_coordinate_scale(&mut self, coordinate_scale: Vec2) {
        self.view.coordinate_scale = coordinate_scale;
    }

    /// Pan.
    pub fn offset(&self) -> Vec2 {
        self.view.offset
    }

    /// Set the pan.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.view.offset = offset;
    }

    /// Pan further by `delta`.
    pub fn add_offset(&mut self, delta: Vec2) {
        self.view.offset += delta;
    }

    /// Zoom factor.
    pub fn scale(&self) -> f32 {
        self.view.scale
    }

    /// Set the zoom factor.
    pub fn set_scale(&mut self, scale: f32) {
        self.view.scale = scale;
    }

    /// Fixed point of the zoom, in logical units.
    pub fn scale_center(&self) -> Vec2 {
        self.view.scale_center
    }

    /// Move the fixed point of the zoom.
    pub fn set_scale_center(&mut self, scale_center: Vec2) {
        self.view.scale_center = scale_center;
    }

    /// Color used by [`clear`](Self::clear).
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Change the clear color.
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Logical coordinates to clip space, pan and zoom included.
    pub fn projection(&self) -> Mat4 {
        self.view.projection()
    }

    /// Direct subsequent draws at this target.
    pub fn bind(&self, device: &RenderDevice) {
        device.bind_framebuffer(self.framebuffer);
        #[expect(clippy::cast_possible_wrap)]
        device.viewport(Rect::new(0, 0, self.resolution.x as i32, self.resolution.y as i32));
    }

    /// Fill the target with its clear color.
    pub fn clear(&self, device: &RenderDevice) {
        if self.framebuffer.is_none() {
            return;
        }
        self.bind(device);
        device.clear(self.clear_color);
    }

    /// Run `command` against this target.
    pub fn draw(&self, device: &RenderDevice, command: &DrawCommand<'_>) {
        if self.framebuffer.is_none() {
            return;
        }
        self.bind(device);
        command.submit(device, &self.projection());
    }

    pub(crate) fn allocate(&mut self, device: &RenderDevice) -> Result<()> {
        gl_size(self.resolution.x)?;
        gl_size(self.resolution.y)?;
        self.texture.allocate(device)?;

        // SAFETY: the device's context is current on this thread.
        let framebuffer = match unsafe { device.gl().create_framebuffer() } {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                self.texture.release(device);
                return Err(Error::Allocation(err));
            }
        };
        device.bind_framebuffer(Some(framebuffer));
        // SAFETY: as above, with `framebuffer` bound.
        let status = unsafe {
            device.gl().framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                self.texture.raw(),
                0,
            );
            device.gl().check_framebuffer_status(glow::FRAMEBUFFER)
        };
        device.bind_framebuffer(None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            device.delete_framebuffer(framebuffer);
            self.texture.release(device);
            return Err(Error::Allocation(format!("framebuffer incomplete (status {status:#x})")));
        }
        self.framebuffer = Some(framebuffer);
        Ok(())
    }

    pub(crate) fn release(&mut self, device: &RenderDevice) {
        if let Some(framebuffer) = self.framebuffer.take() {
            device.delete_framebuffer(framebuffer);
        }
        self.texture.release(device);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_scale_defaults_to_resolution() {
        let target = RenderTexture::new(UVec2::new(160, 144), None).unwrap();
        assert_eq!(target.coordinate_scale(), Vec2::new(160.0, 144.0));
        assert_eq!(target.scale(), 1.0);
        assert_eq!(target.scale_center(), Vec2::new(80.0, 72.0));
        assert_eq!(target.texture().size(), UVec2::new(160, 144));
    }

    #[test]
    fn pan_accumulates() {
        let mut target = RenderTexture::new(UVec2::new(10, 10), Some(Vec2::ONE)).unwrap();
        target.set_offset(Vec2::new(1.0, 2.0));
        target.add_offset(Vec2::new(0.5, -1.0));
        assert_eq!(target.offset(), Vec2::new(1.5, 1.0));
    }

    #[test]
    fn projection_follows_the_view() {
        let mut target = RenderTexture::new(UVec2::new(10, 10), Some(Vec2::new(2.0, 2.0))).unwrap();
        target.set_scale(3.0);
        target.set_scale_center(Vec2::ZERO);
        assert_eq!(target.projection(), target.view().projection());
        let mut view = View::new(Vec2::new(2.0, 2.0));
        view.scale = 3.0;
        view.scale_center = Vec2::ZERO;
        assert_eq!(target.projection(), view.projection());
    }

    #[test]
    fn draw_texture_slot_is_assignable() {
        use crate::shader::SamplerSlots;

        let texture = glow::NativeTexture(std::num::NonZeroU32::new(9).unwrap());
        let mut slots = SamplerSlots::default();
        slots.assign(TEXTURE_SLOT, Some(texture)).unwrap();
        assert_eq!(slots.get(TEXTURE_SLOT), Some(texture));
    }

    #[test]
    fn unallocated_target_has_no_framebuffer() {
        let target = RenderTexture::new(UVec2::new(4, 4), None).unwrap();
        assert!(target.raw_framebuffer().is_none());
        assert!(target.texture().raw().is_none());
        assert_eq!(target.clear_color(), Color::TRANSPARENT);
    }
}
