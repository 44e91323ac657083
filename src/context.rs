//! [`RenderContext`]: the device, the object chain and the library, plus
//! draw dispatch.

use std::sync::Arc;

use glam::{UVec2, Vec2};

use crate::canvas::Canvas;
use crate::chain::ObjectChain;
use crate::device::RenderDevice;
use crate::drawable::{DrawParams, Polygon, Sprite};
use crate::error::{Error, Result};
use crate::library::{ObjectLibrary, DEFAULT_COLORED_SHADER, DEFAULT_TEXTURED_SHADER, DEFAULT_VERTEX_ARRAY};
use crate::object::{GlObject, GpuObject, Handle, ObjectKey, Resource};
use crate::render_texture::{DrawCommand, RenderTexture};
use crate::shader::Shader;
use crate::texture::{Texture, TextureData};
use crate::transform::{self, Placement};
use crate::types::Rect;
use crate::vertex_array::VertexArray;

/// Handles of the default library entries.
#[derive(Debug, Copy, Clone)]
struct Defaults {
    textured_shader: Handle<Shader>,
    colored_shader: Handle<Shader>,
    quad: Handle<VertexArray>,
}

/// Owner of every GPU object created through one GL context.
///
/// Objects are created through the context, referred to by [`Handle`]s and
/// released either explicitly ([`destroy`](Self::destroy),
/// [`delete_object`](Self::delete_object)) or all at once by
/// [`tear_down`](Self::tear_down), which also runs on drop.
///
/// # Drawing
///
/// [`draw_sprite`](Self::draw_sprite) and
/// [`draw_polygon`](Self::draw_polygon) render into any render target
/// (canvases included, see [`Handle::as_render_texture`]). A draw whose
/// texture or vertex array is missing or destroyed does nothing. Without an
/// explicit shader, textured draws use the default textured shader and flat
/// draws the default colored shader.
pub struct RenderContext {
    device: RenderDevice,
    objects: ObjectChain<GlObject>,
    library: ObjectLibrary,
    defaults: Defaults,
}

impl RenderContext {
    /// Wrap a loaded GL context, initialize the object chain and create the
    /// default library entries.
    ///
    /// # Safety
    ///
    /// Same contract as [`RenderDevice::new`]. The context must also still
    /// be current when the `RenderContext` is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if a default object could not be created.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self> {
        // SAFETY: forwarded to the caller.
        let device = unsafe { RenderDevice::new(gl) };
        device.enable_alpha_blending();

        let mut objects = ObjectChain::new();
        objects.initialize();
        let mut library = ObjectLibrary::new();

        let defaults = match Self::create_defaults(&device, &mut objects, &mut library) {
            Ok(defaults) => defaults,
            Err(err) => {
                objects.tear_down(&device);
                return Err(err);
            }
        };

        Ok(Self {
            device,
            objects,
            library,
            defaults,
        })
    }

    fn create_defaults(
        device: &RenderDevice,
        objects: &mut ObjectChain<GlObject>,
        library: &mut ObjectLibrary,
    ) -> Result<Defaults> {
        let mut create = |name: &str, object: GlObject| -> Result<ObjectKey> {
            let kind = object.kind();
            let key = library.create(objects, device, name, kind, || Ok(object))?;
            library.mark_default(name);
            Ok(key)
        };
        let textured_shader = create(DEFAULT_TEXTURED_SHADER, Shader::textured().into_object())?;
        let colored_shader = create(DEFAULT_COLORED_SHADER, Shader::colored().into_object())?;
        let quad = create(DEFAULT_VERTEX_ARRAY, VertexArray::unit_quad().into_object())?;
        Ok(Defaults {
            textured_shader: Handle::from_key(textured_shader),
            colored_shader: Handle::from_key(colored_shader),
            quad: Handle::from_key(quad),
        })
    }

    /// The device every object allocates through.
    pub fn device(&self) -> &RenderDevice {
        &self.device
    }

    /// The object chain.
    pub fn objects(&self) -> &ObjectChain<GlObject> {
        &self.objects
    }

    /// The named object library.
    pub fn library(&self) -> &ObjectLibrary {
        &self.library
    }

    /// The default textured shader.
    pub fn default_textured_shader(&self) -> Handle<Shader> {
        self.defaults.textured_shader
    }

    /// The default flat-color shader.
    pub fn default_colored_shader(&self) -> Handle<Shader> {
        self.defaults.colored_shader
    }

    /// The default unit quad.
    pub fn default_vertex_array(&self) -> Handle<VertexArray> {
        self.defaults.quad
    }

    /// Link an unnamed object.
    ///
    /// # Errors
    ///
    /// Allocation failures and [`Error::ChainNotInitialized`] after
    /// [`tear_down`](Self::tear_down).
    pub fn create<T: Resource>(&mut self, object: T) -> Result<Handle<T>> {
        self.objects
            .link(&self.device, object.into_object())
            .map(Handle::from_key)
    }

    /// Link an unnamed canvas.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_canvas(&mut self, resolution: UVec2, coordinate_scale: Option<Vec2>) -> Result<Handle<Canvas>> {
        self.create(Canvas::new(resolution, coordinate_scale)?)
    }

    /// Link `vertex_array` and wrap it in a polygon that owns it.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_polygon(&mut self, vertex_array: VertexArray) -> Result<Polygon> {
        let handle = self.create(vertex_array)?;
        Ok(Polygon::with_ownership(Some(handle), true))
    }

    /// Dispose of a polygon, destroying its vertex array if it owns it.
    pub fn release_polygon(&mut self, polygon: Polygon) {
        if let (true, Some(vertex_array)) = (polygon.owns_vertex_array(), polygon.vertex_array) {
            self.destroy(vertex_array);
        }
    }

    /// Borrow a live object.
    pub fn get<T: Resource>(&self, handle: Handle<T>) -> Option<&T> {
        self.objects.get(handle.key()).and_then(T::from_object)
    }

    /// Mutably borrow a live object.
    pub fn get_mut<T: Resource>(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.objects.get_mut(handle.key()).and_then(T::from_object_mut)
    }

    /// Release an object that is not registered in the library.
    ///
    /// A canvas that owns its display shader takes the shader with it.
    /// Returns `false` for stale handles and for library objects (logged;
    /// use [`delete_object`](Self::delete_object) for those).
    pub fn destroy<T>(&mut self, handle: Handle<T>) -> bool {
        if !destroyable_by_handle(&self.library, handle.key()) {
            return false;
        }
        self.destroy_key(handle.key())
    }

    fn destroy_key(&mut self, key: ObjectKey) -> bool {
        let Some(cleanup) = self.objects.get(key).map(Cleanup::for_object) else {
            return false;
        };
        if self.objects.unlink(&self.device, key).is_none() {
            return false;
        }
        if let Some(texture) = cleanup.texture {
            for object in self.objects.keys().filter_map(|key| self.objects.get(key)) {
                if let GlObject::Shader(shader) = object {
                    shader.forget_texture(texture);
                }
            }
        }
        if let Some(shader) = cleanup.owned_shader {
            self.destroy(shader);
        }
        true
    }

    /// Create (or reuse) the shader registered as `name`.
    ///
    /// A shader whose sources fail to compile is still registered but
    /// invalid; draws with it are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::WrongKind`] if `name` holds something else, or an
    /// allocation failure.
    pub fn create_shader(&mut self, name: &str, vertex_src: &str, fragment_src: &str) -> Result<Handle<Shader>> {
        self.create_named(name, || Ok(Shader::new(vertex_src, fragment_src)))
    }

    /// Create (or reuse) the texture registered as `name`.
    ///
    /// # Errors
    ///
    /// See [`create_shader`](Self::create_shader).
    pub fn create_texture(&mut self, name: &str, data: TextureData) -> Result<Handle<Texture>> {
        self.create_named(name, || Ok(Texture::from_data(data)))
    }

    /// Create (or reuse) an uninitialized texture registered as `name`.
    ///
    /// # Errors
    ///
    /// See [`create_shader`](Self::create_shader), plus
    /// [`Error::UnsupportedChannels`].
    pub fn create_empty_texture(&mut self, name: &str, size: UVec2, channels: u8) -> Result<Handle<Texture>> {
        self.create_named(name, || Texture::empty(size, channels))
    }

    /// Create (or reuse) the render target registered as `name`.
    ///
    /// A canvas registered under `name` satisfies the request.
    ///
    /// # Errors
    ///
    /// See [`create_shader`](Self::create_shader).
    pub fn create_render_texture(
        &mut self,
        name: &str,
        resolution: UVec2,
        coordinate_scale: Option<Vec2>,
    ) -> Result<Handle<RenderTexture>> {
        self.create_named(name, || RenderTexture::new(resolution, coordinate_scale))
    }

    /// Create (or reuse) the canvas registered as `name`.
    ///
    /// # Errors
    ///
    /// See [`create_shader`](Self::create_shader).
    pub fn create_named_canvas(
        &mut self,
        name: &str,
        resolution: UVec2,
        coordinate_scale: Option<Vec2>,
    ) -> Result<Handle<Canvas>> {
        self.create_named(name, || Canvas::new(resolution, coordinate_scale))
    }

    /// Register `vertex_array` as `name`, or return the array already
    /// registered there (dropping `vertex_array`).
    ///
    /// # Errors
    ///
    /// See [`create_shader`](Self::create_shader).
    pub fn create_vertex_array(&mut self, name: &str, vertex_array: VertexArray) -> Result<Handle<VertexArray>> {
        self.create_named(name, || Ok(vertex_array))
    }

    fn create_named<T: Resource>(&mut self, name: &str, make: impl FnOnce() -> Result<T>) -> Result<Handle<T>> {
        self.library
            .create(&mut self.objects, &self.device, name, T::KIND, || make().map(T::into_object))
            .map(Handle::from_key)
    }

    /// Look up a library entry.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] or [`Error::WrongKind`], both logged.
    pub fn find<T: Resource>(&self, name: &str) -> Result<Handle<T>> {
        self.library.find(&self.objects, name, T::KIND).map(Handle::from_key)
    }

    /// Destroy the library entry `name`.
    ///
    /// Returns `false` (logged) for unknown names and default entries.
    pub fn delete_object(&mut self, name: &str) -> bool {
        let Some(key) = self.library.remove(name) else {
            return false;
        };
        self.destroy_key(key)
    }

    /// Re-upload a vertex array after editing it through
    /// [`get_mut`](Self::get_mut).
    ///
    /// # Errors
    ///
    /// [`Error::StaleHandle`] or an allocation failure.
    pub fn upload_vertex_array(&mut self, handle: Handle<VertexArray>) -> Result<()> {
        let vertex_array = self
            .objects
            .get_mut(handle.key())
            .and_then(VertexArray::from_object_mut)
            .ok_or(Error::StaleHandle)?;
        vertex_array.upload(&self.device)
    }

    /// Replace the contents of a texture.
    ///
    /// # Errors
    ///
    /// [`Error::StaleHandle`] or an allocation failure.
    pub fn update_texture(&mut self, handle: Handle<Texture>, data: TextureData) -> Result<()> {
        let texture = self
            .objects
            .get_mut(handle.key())
            .and_then(Texture::from_object_mut)
            .ok_or(Error::StaleHandle)?;
        texture.update(&self.device, data)
    }

    /// Display `canvas` with `shader` instead of the default textured
    /// shader (`None` restores the default).
    ///
    /// An `owned` shader is destroyed with the canvas or when it is
    /// replaced. Library shaders are never owned.
    pub fn set_display_shader(&mut self, canvas: Handle<Canvas>, shader: Option<Handle<Shader>>, owned: bool) {
        let owned = match shader {
            Some(shader) if owned && self.library.contains_key(shader.key()) => {
                log::warn!("library shaders cannot be owned by a canvas");
                false
            }
            _ => owned,
        };
        let Some(canvas) = self.get_mut(canvas) else {
            return;
        };
        if let Some(previous) = canvas.replace_display_shader(shader, owned) {
            self.destroy(previous);
        }
    }

    /// Fill a render target with its clear color.
    pub fn clear(&self, target: Handle<RenderTexture>) {
        if let Some(target) = self.get(target) {
            target.clear(&self.device);
        }
    }

    /// Draw a sprite into `target`.
    pub fn draw_sprite(&self, target: Handle<RenderTexture>, sprite: &Sprite) {
        if sprite.texture.is_none() {
            return;
        }
        self.draw(target, &sprite.params());
    }

    /// Draw a polygon into `target`.
    pub fn draw_polygon(&self, target: Handle<RenderTexture>, polygon: &Polygon) {
        if polygon.vertex_array.is_none() {
            return;
        }
        self.draw(target, &polygon.params());
    }

    /// The draw both sprites and polygons resolve to.
    pub fn draw(&self, target: Handle<RenderTexture>, params: &DrawParams) {
        let Some(target) = self.get(target) else {
            return;
        };
        let Some(selection) = select_draw_objects(params, &self.defaults, |key| self.objects.contains(key)) else {
            return;
        };
        let (Some(shader), Some(vertex_array)) = (self.get(selection.shader), self.get(selection.vertex_array)) else {
            return;
        };
        let texture = match selection.texture {
            Some(handle) => match self.get(handle) {
                Some(texture) => Some(texture),
                None => return,
            },
            None => None,
        };

        let size = match texture {
            Some(texture) => transform::sprite_size(
                params.size,
                params.absolute_size,
                texture.size().as_vec2(),
                params.source,
            ),
            None => params.size,
        };
        let model = Placement {
            position: params.position,
            size,
            rotation: params.rotation,
            rotation_center: params.rotation_center,
        }
        .model();

        target.draw(
            &self.device,
            &DrawCommand {
                shader,
                vertex_array,
                texture: texture.and_then(Texture::raw),
                model,
                source: params.source,
                color: params.color,
            },
        );
    }

    /// Draw `canvas` into `target`, covering the canvas's display space.
    pub fn draw_canvas(&self, target: Handle<RenderTexture>, canvas: Handle<Canvas>) {
        if target.key() == canvas.key() {
            log::warn!("a canvas cannot be drawn onto itself");
            return;
        }
        let (Some(destination), Some(source)) = (self.get(target), self.get(canvas)) else {
            return;
        };
        let Some((shader, quad)) = self.display_resources(source) else {
            return;
        };
        source.draw_onto(&self.device, destination, shader, quad);
    }

    /// Composite `canvas` onto the window framebuffer inside `view_rect`.
    pub fn display(&self, canvas: Handle<Canvas>, view_rect: Rect<i32>, window_size: UVec2) {
        let Some(canvas) = self.get(canvas) else {
            return;
        };
        let Some((shader, quad)) = self.display_resources(canvas) else {
            return;
        };
        canvas.display(&self.device, view_rect, window_size, shader, quad);
    }

    fn display_resources(&self, canvas: &Canvas) -> Option<(&Shader, &VertexArray)> {
        let shader = canvas
            .display_shader()
            .and_then(|handle| self.get(handle))
            .or_else(|| self.get(self.defaults.textured_shader))?;
        let quad = self.get(self.defaults.quad)?;
        Some((shader, quad))
    }

    /// Release every object and forget every library entry.
    ///
    /// Returns the number of objects released. The context accepts no new
    /// objects afterwards.
    pub fn tear_down(&mut self) -> usize {
        if !self.objects.is_initialized() {
            return 0;
        }
        self.library.clear();
        self.objects.tear_down(&self.device)
    }
}

/// The objects one draw resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct DrawSelection {
    shader: Handle<Shader>,
    vertex_array: Handle<VertexArray>,
    texture: Option<Handle<Texture>>,
}

/// Pick the shader, geometry and texture of a draw.
///
/// A texture or vertex array that is not `live` cancels the draw. A shader
/// that is not live is replaced by the default matching the draw: textured
/// or flat.
fn select_draw_objects(
    params: &DrawParams,
    defaults: &Defaults,
    live: impl Fn(ObjectKey) -> bool,
) -> Option<DrawSelection> {
    let vertex_array = params.vertex_array.unwrap_or(defaults.quad);
    if !live(vertex_array.key()) {
        return None;
    }
    if let Some(texture) = params.texture {
        if !live(texture.key()) {
            return None;
        }
    }
    let fallback = if params.texture.is_some() {
        defaults.textured_shader
    } else {
        defaults.colored_shader
    };
    let shader = params
        .shader
        .filter(|shader| live(shader.key()))
        .unwrap_or(fallback);
    live(shader.key()).then_some(DrawSelection {
        shader,
        vertex_array,
        texture: params.texture,
    })
}

/// Library objects are deleted by name only.
fn destroyable_by_handle(library: &ObjectLibrary, key: ObjectKey) -> bool {
    match library.name_of(key) {
        Some(name) => {
            log::warn!("object `{name}` belongs to the library and is not destroyed by handle");
            false
        }
        None => true,
    }
}

/// Work left after an object is unlinked.
#[derive(Debug, Default, PartialEq, Eq)]
struct Cleanup {
    /// Texture to clear from every shader's sampler slots.
    texture: Option<glow::Texture>,
    /// Display shader owned by a destroyed canvas.
    owned_shader: Option<Handle<Shader>>,
}

impl Cleanup {
    fn for_object(object: &GlObject) -> Self {
        match object {
            GlObject::Canvas(canvas) => Self {
                texture: canvas.target().texture().raw(),
                owned_shader: canvas.display_shader().filter(|_| canvas.owns_display_shader()),
            },
            GlObject::RenderTexture(target) => Self {
                texture: target.texture().raw(),
                owned_shader: None,
            },
            GlObject::Texture(texture) => Self {
                texture: texture.raw(),
                owned_shader: None,
            },
            GlObject::Shader(_) | GlObject::VertexArray(_) => Self::default(),
        }
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.tear_down();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::chain::tests::{Dummy, Journal};
    use crate::object::ObjectKind;

    struct Keys {
        slots: SlotMap<ObjectKey, ()>,
        defaults: Defaults,
    }

    impl Keys {
        fn new() -> Self {
            let mut slots = SlotMap::with_key();
            let defaults = Defaults {
                textured_shader: Handle::from_key(slots.insert(())),
                colored_shader: Handle::from_key(slots.insert(())),
                quad: Handle::from_key(slots.insert(())),
            };
            Self { slots, defaults }
        }

        fn live<T>(&mut self) -> Handle<T> {
            Handle::from_key(self.slots.insert(()))
        }

        fn stale<T>(&mut self) -> Handle<T> {
            let key = self.slots.insert(());
            self.slots.remove(key);
            Handle::from_key(key)
        }

        fn select(&self, params: &DrawParams) -> Option<DrawSelection> {
            select_draw_objects(params, &self.defaults, |key| self.slots.contains_key(key))
        }
    }

    #[test]
    fn sprite_uses_the_default_quad_and_textured_shader() {
        let mut keys = Keys::new();
        let texture = keys.live();
        let selection = keys.select(&Sprite::new(texture).params()).unwrap();
        assert_eq!(selection.shader, keys.defaults.textured_shader);
        assert_eq!(selection.vertex_array, keys.defaults.quad);
        assert_eq!(selection.texture, Some(texture));
    }

    #[test]
    fn flat_polygon_uses_the_colored_shader() {
        let mut keys = Keys::new();
        let mesh = keys.live();
        let selection = keys.select(&Polygon::new(mesh).params()).unwrap();
        assert_eq!(selection.shader, keys.defaults.colored_shader);
        assert_eq!(selection.vertex_array, mesh);
        assert_eq!(selection.texture, None);
    }

    #[test]
    fn explicit_shader_wins() {
        let mut keys = Keys::new();
        let shader = keys.live();
        let mut params = Sprite::new(keys.live()).params();
        params.shader = Some(shader);
        assert_eq!(keys.select(&params).unwrap().shader, shader);

        let mut params = Polygon::new(keys.live()).params();
        params.shader = Some(shader);
        assert_eq!(keys.select(&params).unwrap().shader, shader);
    }

    #[test]
    fn destroyed_explicit_shader_falls_back_to_the_default() {
        let mut keys = Keys::new();
        let mut params = Sprite::new(keys.live()).params();
        params.shader = Some(keys.stale());
        assert_eq!(keys.select(&params).unwrap().shader, keys.defaults.textured_shader);
    }

    #[test]
    fn destroyed_texture_or_geometry_skips_the_draw() {
        let mut keys = Keys::new();
        let sprite = Sprite::new(keys.stale());
        let polygon = Polygon::new(keys.stale());
        assert!(keys.select(&sprite.params()).is_none());
        assert!(keys.select(&polygon.params()).is_none());

        let mut params = Sprite::new(keys.live()).params();
        params.vertex_array = Some(keys.stale());
        assert!(keys.select(&params).is_none());
    }

    #[test]
    fn missing_default_shader_skips_the_draw() {
        let mut keys = Keys::new();
        let texture = keys.live();
        keys.slots.remove(keys.defaults.textured_shader.key());
        assert!(keys.select(&Sprite::new(texture).params()).is_none());
    }

    #[test]
    fn library_objects_are_not_destroyed_by_handle() {
        let journal = Journal::default();
        let mut chain = ObjectChain::new();
        chain.initialize();
        let mut library = ObjectLibrary::new();
        let named = library
            .create(&mut chain, &journal, "quad", ObjectKind::VertexArray, || {
                Ok(Dummy::of_kind(1, ObjectKind::VertexArray))
            })
            .unwrap();
        let unnamed = chain.link(&journal, Dummy::new(2)).unwrap();

        assert!(!destroyable_by_handle(&library, named));
        assert!(destroyable_by_handle(&library, unnamed));
        assert!(library.delete(&mut chain, &journal, "quad"));
        assert!(destroyable_by_handle(&library, named));
        chain.tear_down(&journal);
    }

    #[test]
    fn canvas_takes_only_an_owned_display_shader_with_it() {
        let mut keys = Keys::new();
        let shader: Handle<Shader> = keys.live();

        let mut owning = Canvas::new(UVec2::new(8, 8), None).unwrap();
        owning.replace_display_shader(Some(shader), true);
        let cleanup = Cleanup::for_object(&GlObject::Canvas(owning));
        assert_eq!(cleanup.owned_shader, Some(shader));

        let mut sharing = Canvas::new(UVec2::new(8, 8), None).unwrap();
        sharing.replace_display_shader(Some(shader), false);
        assert_eq!(Cleanup::for_object(&GlObject::Canvas(sharing)).owned_shader, None);
    }

    #[test]
    fn replacing_an_owned_display_shader_hands_it_back() {
        let mut keys = Keys::new();
        let (first, second): (Handle<Shader>, Handle<Shader>) = (keys.live(), keys.live());
        let mut canvas = Canvas::new(UVec2::new(8, 8), None).unwrap();
        canvas.replace_display_shader(Some(first), true);
        assert_eq!(canvas.replace_display_shader(Some(second), false), Some(first));
        assert_eq!(canvas.replace_display_shader(None, false), None);
    }

    #[test]
    fn shaders_and_meshes_need_no_cleanup() {
        assert_eq!(Cleanup::for_object(&GlObject::Shader(Shader::colored())), Cleanup::default());
        assert_eq!(
            Cleanup::for_object(&GlObject::VertexArray(VertexArray::unit_quad())),
            Cleanup::default()
        );
    }
}
