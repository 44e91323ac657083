//! GLSL programs, their uniform protocol and the default shader sources.
//!
//! All shaders target GLSL 3.30 core. Vertex attribute 0 is the position and
//! attribute 1 the texture coordinate, matching
//! [`VertexArray`](crate::VertexArray).

use std::cell::RefCell;
use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};
use glow::HasContext;

use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::render_texture::RenderTexture;
use crate::state::TEXTURE_UNITS;
use crate::texture::Texture;

/// Number of sampler slots a shader can bind; valid slots are `0..32`.
#[expect(clippy::cast_possible_truncation)]
pub const MAX_TEXTURE_SLOTS: u32 = TEXTURE_UNITS as u32;

/// Vertex shader shared by the default programs.
///
/// # Uniforms
///
/// | Name               | Type   | Description                            |
/// |--------------------|--------|----------------------------------------|
/// | `u_projection`     | `mat4` | Target coordinate space to clip space  |
/// | `u_model`          | `mat4` | Unit quad / mesh to target coordinates |
/// | `u_texture_source` | `vec4` | Normalized source rectangle `(x, y, w, h)` |
pub const DEFAULT_VERTEX_SRC: &str = r"#version 330 core

layout (location = 0) in vec2 a_position;
layout (location = 1) in vec2 a_tex_coord;

uniform mat4 u_projection;
uniform mat4 u_model;
uniform vec4 u_texture_source;

out vec2 v_tex_coord;

void main() {
    gl_Position = u_projection * u_model * vec4(a_position, 0.0, 1.0);
    v_tex_coord = u_texture_source.xy + a_tex_coord * u_texture_source.zw;
}
";

/// Fragment shader of the default textured program: the texture on unit
/// `u_texture0`, tinted by `u_color`.
pub const TEXTURED_FRAGMENT_SRC: &str = r"#version 330 core

in vec2 v_tex_coord;

uniform sampler2D u_texture0;
uniform vec4 u_color;

out vec4 frag_color;

void main() {
    frag_color = texture(u_texture0, v_tex_coord) * u_color;
}
";

/// Fragment shader of the default colored program: a flat `u_color`.
pub const COLORED_FRAGMENT_SRC: &str = r"#version 330 core

uniform vec4 u_color;

out vec4 frag_color;

void main() {
    frag_color = u_color;
}
";

/// Compile and link a program from vertex and fragment source.
///
/// The stage objects are deleted once linking is done, successful or not, so
/// only the program handle needs cleaning up.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns the driver's info log if a stage fails to compile or the program
/// fails to link.
unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, String> {
    let vs = unsafe { compile_stage(gl, glow::VERTEX_SHADER, vertex_src) }?;
    let fs = match unsafe { compile_stage(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(err) => {
            unsafe { gl.delete_shader(vs) };
            return Err(err);
        }
    };

    unsafe {
        let program = match gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(err);
            }
        };
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(format!("program link error: {log}"));
        }

        Ok(program)
    }
}

/// Compile a single shader stage.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_stage(gl: &glow::Context, stage: u32, source: &str) -> Result<glow::Shader, String> {
    unsafe {
        let shader = gl.create_shader(stage)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            let stage = if stage == glow::VERTEX_SHADER {
                "vertex"
            } else {
                "fragment"
            };
            return Err(format!("{stage} shader compile error: {log}"));
        }

        Ok(shader)
    }
}

/// Textures assigned to sampler slots, rebound every time the program is
/// prepared for a draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerSlots {
    slots: [Option<glow::Texture>; TEXTURE_UNITS],
}

impl SamplerSlots {
    /// Put `texture` in `slot`.
    ///
    /// # Errors
    ///
    /// [`Error::TextureSlotOutOfRange`] if `slot >= MAX_TEXTURE_SLOTS`; the
    /// slots are left untouched.
    pub fn assign(&mut self, slot: u32, texture: Option<glow::Texture>) -> Result<()> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(Error::TextureSlotOutOfRange(slot))?;
        *entry = texture;
        Ok(())
    }

    /// The texture in `slot`, if any.
    pub fn get(&self, slot: u32) -> Option<glow::Texture> {
        self.slots.get(slot as usize).copied().flatten()
    }

    /// Occupied slots in ascending order.
    #[expect(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (u32, glow::Texture)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, texture)| texture.map(|texture| (slot as u32, texture)))
    }

    /// Empty every slot holding `texture`.
    pub fn remove(&mut self, texture: glow::Texture) {
        for slot in &mut self.slots {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots = [None; TEXTURE_UNITS];
    }
}

/// A linked vertex + fragment program.
///
/// A shader whose sources fail to compile or link is still linked into the
/// chain but has no program; [`is_valid`](Self::is_valid) reports `false`,
/// uniform setters do nothing and draws using it are skipped.
///
/// Uniform locations are looked up once per name and cached, including
/// misses, so a missing uniform is warned about only once.
pub struct Shader {
    vertex_src: String,
    fragment_src: String,
    program: Option<glow::Program>,
    uniforms: RefCell<HashMap<String, Option<glow::UniformLocation>>>,
    samplers: RefCell<SamplerSlots>,
}

impl Shader {
    /// A shader built from GLSL source, compiled when it is linked.
    pub fn new(vertex_src: impl Into<String>, fragment_src: impl Into<String>) -> Self {
        Self {
            vertex_src: vertex_src.into(),
            fragment_src: fragment_src.into(),
            program: None,
            uniforms: RefCell::default(),
            samplers: RefCell::default(),
        }
    }

    /// The default textured program.
    pub fn textured() -> Self {
        Self::new(DEFAULT_VERTEX_SRC, TEXTURED_FRAGMENT_SRC)
    }

    /// The default flat-color program.
    pub fn colored() -> Self {
        Self::new(DEFAULT_VERTEX_SRC, COLORED_FRAGMENT_SRC)
    }

    /// Whether the program compiled and linked.
    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    /// The GL program name.
    pub fn raw(&self) -> Option<glow::Program> {
        self.program
    }

    /// Vertex stage source.
    pub fn vertex_source(&self) -> &str {
        &self.vertex_src
    }

    /// Fragment stage source.
    pub fn fragment_source(&self) -> &str {
        &self.fragment_src
    }

    /// Make the program current.
    pub fn bind(&self, device: &RenderDevice) {
        device.use_program(self.program);
    }

    /// Set an `int` uniform.
    pub fn set_i32(&self, device: &RenderDevice, name: &str, value: i32) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_1_i32(Some(location), value) };
        });
    }

    /// Set a `float` uniform.
    pub fn set_f32(&self, device: &RenderDevice, name: &str, value: f32) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_1_f32(Some(location), value) };
        });
    }

    /// Set a `vec2` uniform.
    pub fn set_vec2(&self, device: &RenderDevice, name: &str, value: Vec2) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_2_f32(Some(location), value.x, value.y) };
        });
    }

    /// Set a `vec3` uniform.
    pub fn set_vec3(&self, device: &RenderDevice, name: &str, value: Vec3) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_3_f32(Some(location), value.x, value.y, value.z) };
        });
    }

    /// Set a `vec4` uniform.
    pub fn set_vec4(&self, device: &RenderDevice, name: &str, value: Vec4) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_4_f32(Some(location), value.x, value.y, value.z, value.w) };
        });
    }

    /// Set a `mat4` uniform (column major).
    pub fn set_mat4(&self, device: &RenderDevice, name: &str, value: &Mat4) {
        self.with_location(device, name, |gl, location| {
            // SAFETY: the program is current (see `with_location`).
            unsafe { gl.uniform_matrix_4_f32_slice(Some(location), false, &value.to_cols_array()) };
        });
    }

    /// Bind `texture` to sampler slot `slot` and point the sampler uniform
    /// `name` at it.
    ///
    /// # Errors
    ///
    /// [`Error::TextureSlotOutOfRange`] (also logged) if `slot` is 32 or
    /// more. Nothing is bound in that case.
    pub fn set_texture(&self, device: &RenderDevice, name: &str, slot: u32, texture: &Texture) -> Result<()> {
        self.set_sampler(device, name, slot, texture.raw())
    }

    /// Like [`set_texture`](Self::set_texture) with the backing texture of a
    /// render target.
    ///
    /// # Errors
    ///
    /// See [`set_texture`](Self::set_texture).
    pub fn set_render_texture(
        &self,
        device: &RenderDevice,
        name: &str,
        slot: u32,
        target: &RenderTexture,
    ) -> Result<()> {
        self.set_sampler(device, name, slot, target.texture().raw())
    }

    /// The texture currently assigned to `slot`.
    pub fn texture_in_slot(&self, slot: u32) -> Option<glow::Texture> {
        self.samplers.borrow().get(slot)
    }

    /// Make the program current and rebind every sampler slot.
    ///
    /// Returns `false` for an invalid shader, in which case the caller must
    /// skip the draw.
    pub fn setup_for_draw(&self, device: &RenderDevice) -> bool {
        if self.program.is_none() {
            return false;
        }
        self.bind(device);
        for (slot, texture) in self.samplers.borrow().iter() {
            device.bind_texture(slot, Some(texture));
        }
        true
    }

    pub(crate) fn set_sampler(
        &self,
        device: &RenderDevice,
        name: &str,
        slot: u32,
        texture: Option<glow::Texture>,
    ) -> Result<()> {
        if let Err(err) = self.samplers.borrow_mut().assign(slot, texture) {
            log::warn!("{err}");
            return Err(err);
        }
        if self.program.is_none() {
            return Ok(());
        }
        self.bind(device);
        device.bind_texture(slot, texture);
        #[expect(clippy::cast_possible_wrap)]
        self.set_i32(device, name, slot as i32);
        Ok(())
    }

    /// Forget `texture` wherever it is assigned, so a deleted texture name
    /// is never rebound.
    pub(crate) fn forget_texture(&self, texture: glow::Texture) {
        self.samplers.borrow_mut().remove(texture);
    }

    pub(crate) fn allocate(&mut self, device: &RenderDevice) -> Result<()> {
        // SAFETY: the device's context is current on this thread.
        match unsafe { compile_program(device.gl(), &self.vertex_src, &self.fragment_src) } {
            Ok(program) => self.program = Some(program),
            Err(err) => {
                log::error!("{err}");
                self.program = None;
            }
        }
        Ok(())
    }

    pub(crate) fn release(&mut self, device: &RenderDevice) {
        if let Some(program) = self.program.take() {
            device.delete_program(program);
        }
        self.uniforms.borrow_mut().clear();
        self.samplers.borrow_mut().clear();
    }

    /// Bind the program and run `f` with the location of `name`, if the
    /// shader is valid and the uniform exists.
    fn with_location(
        &self,
        device: &RenderDevice,
        name: &str,
        f: impl FnOnce(&glow::Context, &glow::UniformLocation),
    ) {
        let Some(program) = self.program else {
            return;
        };
        self.bind(device);

        let mut uniforms = self.uniforms.borrow_mut();
        let location = uniforms.entry(name.to_owned()).or_insert_with(|| {
            // SAFETY: the device's context is current on this thread.
            let location = unsafe { device.gl().get_uniform_location(program, name) };
            if location.is_none() {
                log::warn!("cannot find uniform location for `{name}`");
            }
            location
        });
        if let Some(location) = location {
            f(device.gl(), location);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn texture(id: u32) -> glow::Texture {
        glow::NativeTexture(NonZeroU32::new(id).unwrap())
    }

    #[test]
    fn slots_up_to_thirty_one_are_accepted() {
        let mut slots = SamplerSlots::default();
        slots.assign(0, Some(texture(1))).unwrap();
        slots.assign(31, Some(texture(2))).unwrap();
        assert_eq!(slots.get(31), Some(texture(2)));
        assert_eq!(slots.iter().collect::<Vec<_>>(), vec![(0, texture(1)), (31, texture(2))]);
    }

    #[test]
    fn slot_thirty_two_is_rejected_and_nothing_changes() {
        let mut slots = SamplerSlots::default();
        slots.assign(3, Some(texture(4))).unwrap();
        let before = slots.clone();
        assert!(matches!(
            slots.assign(MAX_TEXTURE_SLOTS, Some(texture(5))),
            Err(Error::TextureSlotOutOfRange(32))
        ));
        assert_eq!(slots, before);
    }

    #[test]
    fn removing_a_texture_clears_every_slot_holding_it() {
        let mut slots = SamplerSlots::default();
        slots.assign(0, Some(texture(7))).unwrap();
        slots.assign(5, Some(texture(7))).unwrap();
        slots.assign(6, Some(texture(8))).unwrap();
        slots.remove(texture(7));
        assert_eq!(slots.iter().collect::<Vec<_>>(), vec![(6, texture(8))]);
    }

    #[test]
    fn unlinked_shader_is_invalid() {
        let shader = Shader::textured();
        assert!(!shader.is_valid());
        assert!(shader.raw().is_none());
        assert!(shader.vertex_source().starts_with("#version 330 core"));
    }

    #[test]
    fn default_sources_declare_the_uniform_protocol() {
        for name in ["u_projection", "u_model", "u_texture_source"] {
            assert!(DEFAULT_VERTEX_SRC.contains(name));
        }
        assert!(TEXTURED_FRAGMENT_SRC.contains("u_texture0"));
        assert!(TEXTURED_FRAGMENT_SRC.contains("u_color"));
        assert!(COLORED_FRAGMENT_SRC.contains("u_color"));
    }

    #[test]
    fn out_of_range_error_names_the_last_valid_slot() {
        let message = Error::TextureSlotOutOfRange(40).to_string();
        assert_eq!(message, "texture slot 40 is over the limit of 31");
    }
}
