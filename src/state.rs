//! Last-known GL binding state, used to skip redundant bind calls.
//!
//! The cache only sees binds that go through it. A raw GL call that changes a
//! binding behind its back leaves the cache wrong until the next cached bind
//! of that binding point, or until [`ContextState::invalidate`] is called.
//! Callers that mix in their own GL code must invalidate afterwards.

/// Number of texture units the cache tracks (and the shader slot limit).
pub const TEXTURE_UNITS: usize = 32;

/// Cached value of a single binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<T> {
    /// Nothing is known; the next bind always reaches GL.
    Unknown,
    /// The value last passed to GL (`None` is the zero object).
    Bound(Option<T>),
}

impl<T: PartialEq + Copy> Binding<T> {
    /// Record `value` and report whether the GL call is needed.
    pub fn update(&mut self, value: Option<T>) -> bool {
        if *self == Binding::Bound(value) {
            return false;
        }
        *self = Binding::Bound(value);
        true
    }

    /// Reset to the zero object if `value` is currently bound.
    ///
    /// GL does the same when a bound object is deleted.
    pub fn forget(&mut self, value: T) {
        if *self == Binding::Bound(Some(value)) {
            *self = Binding::Bound(None);
        }
    }
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Binding::Unknown
    }
}

/// Cached bindings for one GL context.
#[derive(Debug, Clone)]
pub struct ContextState {
    active_unit: Option<u32>,
    textures: [Binding<glow::Texture>; TEXTURE_UNITS],
    framebuffer: Binding<glow::Framebuffer>,
    vertex_array: Binding<glow::VertexArray>,
    program: Binding<glow::Program>,
}

impl ContextState {
    /// A cache that knows nothing.
    pub fn new() -> Self {
        Self {
            active_unit: None,
            textures: [Binding::Unknown; TEXTURE_UNITS],
            framebuffer: Binding::Unknown,
            vertex_array: Binding::Unknown,
            program: Binding::Unknown,
        }
    }

    /// Forget every cached binding.
    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    /// Select the active texture unit. Returns whether GL must be called.
    pub fn active_texture(&mut self, unit: u32) -> bool {
        if self.active_unit == Some(unit) {
            return false;
        }
        self.active_unit = Some(unit);
        true
    }

    /// Bind a 2D texture on the active unit. Returns whether GL must be
    /// called.
    ///
    /// With no known active unit the call always goes through and nothing
    /// is recorded.
    pub fn texture_2d(&mut self, texture: Option<glow::Texture>) -> bool {
        let Some(slot) = self
            .active_unit
            .and_then(|unit| self.textures.get_mut(unit as usize))
        else {
            return true;
        };
        slot.update(texture)
    }

    /// Bind a framebuffer (`None` is the window's default framebuffer).
    pub fn framebuffer(&mut self, framebuffer: Option<glow::Framebuffer>) -> bool {
        self.framebuffer.update(framebuffer)
    }

    /// Bind a vertex array object.
    pub fn vertex_array(&mut self, vertex_array: Option<glow::VertexArray>) -> bool {
        self.vertex_array.update(vertex_array)
    }

    /// Make a program current.
    pub fn program(&mut self, program: Option<glow::Program>) -> bool {
        self.program.update(program)
    }

    /// The texture recorded on `unit`, if known.
    pub fn texture_on_unit(&self, unit: u32) -> Binding<glow::Texture> {
        self.textures
            .get(unit as usize)
            .copied()
            .unwrap_or(Binding::Unknown)
    }

    pub(crate) fn forget_texture(&mut self, texture: glow::Texture) {
        for slot in &mut self.textures {
            slot.forget(texture);
        }
    }

    pub(crate) fn forget_framebuffer(&mut self, framebuffer: glow::Framebuffer) {
        self.framebuffer.forget(framebuffer);
    }

    pub(crate) fn forget_vertex_array(&mut self, vertex_array: glow::VertexArray) {
        self.vertex_array.forget(vertex_array);
    }

    pub(crate) fn forget_program(&mut self, program: glow::Program) {
        // A deleted program stays in use until another one is made current,
        // so the binding is no longer known rather than zero.
        if self.program == Binding::Bound(Some(program)) {
            self.program = Binding::Unknown;
        }
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::new()
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

    fn framebuffer(id: u32) -> glow::Framebuffer {
        glow::NativeFramebuffer(NonZeroU32::new(id).unwrap())
    }

    #[test]
    fn first_bind_always_reaches_gl() {
        let mut binding = Binding::<u32>::Unknown;
        assert!(binding.update(None));
        let mut binding = Binding::<u32>::Unknown;
        assert!(binding.update(Some(4)));
    }

    #[test]
    fn repeated_bind_is_skipped() {
        let mut state = ContextState::new();
        assert!(state.framebuffer(Some(framebuffer(1))));
        assert!(!state.framebuffer(Some(framebuffer(1))));
        assert!(state.framebuffer(None));
        assert!(!state.framebuffer(None));
        assert!(state.framebuffer(Some(framebuffer(1))));
    }

    #[test]
    fn textures_are_cached_per_unit() {
        let mut state = ContextState::new();
        assert!(state.active_texture(0));
        assert!(state.texture_2d(Some(texture(5))));
        assert!(!state.texture_2d(Some(texture(5))));

        assert!(state.active_texture(1));
        assert!(!state.active_texture(1));
        // Same texture on a different unit still needs a bind.
        assert!(state.texture_2d(Some(texture(5))));

        assert_eq!(state.texture_on_unit(0), Binding::Bound(Some(texture(5))));
        assert_eq!(state.texture_on_unit(2), Binding::Unknown);
    }

    #[test]
    fn texture_bind_without_known_unit_is_not_recorded() {
        let mut state = ContextState::new();
        assert!(state.texture_2d(Some(texture(1))));
        assert!(state.texture_2d(Some(texture(1))));
    }

    #[test]
    fn invalidate_forces_the_next_bind() {
        let mut state = ContextState::new();
        state.active_texture(0);
        state.texture_2d(Some(texture(2)));
        state.program(None);
        state.invalidate();
        assert!(state.active_texture(0));
        assert!(state.texture_2d(Some(texture(2))));
        assert!(state.program(None));
    }

    #[test]
    fn deleting_a_bound_texture_resets_every_unit_holding_it() {
        let mut state = ContextState::new();
        for unit in 0..3 {
            state.active_texture(unit);
            state.texture_2d(Some(texture(9)));
        }
        state.forget_texture(texture(9));
        for unit in 0..3 {
            assert_eq!(state.texture_on_unit(unit), Binding::Bound(None));
        }
    }

    #[test]
    fn out_of_range_unit_is_never_cached() {
        let mut state = ContextState::new();
        state.active_texture(TEXTURE_UNITS as u32);
        assert!(state.texture_2d(Some(texture(1))));
        assert!(state.texture_2d(Some(texture(1))));
    }
}
