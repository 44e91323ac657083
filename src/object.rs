//! GPU object kinds, typed handles and the lifecycle trait implemented by
//! everything the [`ObjectChain`](crate::ObjectChain) tracks.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::canvas::Canvas;
use crate::device::RenderDevice;
use crate::error::Result;
use crate::render_texture::RenderTexture;
use crate::shader::Shader;
use crate::texture::Texture;
use crate::vertex_array::VertexArray;

slotmap::new_key_type! {
    /// Stable identifier of an object linked into a chain.
    pub struct ObjectKey;
}

/// The closed set of GPU object kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A 2D texture.
    Texture,
    /// A linked vertex + fragment program.
    Shader,
    /// Vertex, texture coordinate and index buffers.
    VertexArray,
    /// A framebuffer with a backing texture.
    RenderTexture,
    /// A render texture that also knows how to display itself.
    Canvas,
}

impl ObjectKind {
    /// Whether an object of this kind can be used where `requested` is
    /// expected.
    ///
    /// Every kind satisfies itself; a canvas additionally satisfies
    /// [`ObjectKind::RenderTexture`].
    pub fn satisfies(self, requested: ObjectKind) -> bool {
        self == requested || (self == ObjectKind::Canvas && requested == ObjectKind::RenderTexture)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Texture => "texture",
            ObjectKind::Shader => "shader",
            ObjectKind::VertexArray => "vertex array",
            ObjectKind::RenderTexture => "render texture",
            ObjectKind::Canvas => "canvas",
        };
        f.write_str(name)
    }
}

/// An object that owns GPU-side data.
///
/// The chain calls [`allocate`](Self::allocate) exactly once when the object
/// is linked and [`release`](Self::release) exactly once when it is unlinked
/// or the chain is torn down.
pub trait GpuObject {
    /// Whatever the object needs to create and delete its GPU handles.
    type Device: ?Sized;

    /// The kind tag used for type-checked library lookups.
    fn kind(&self) -> ObjectKind;

    /// Create the GPU handles and upload any pending data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`](crate::Error::Allocation) if a handle
    /// could not be created. The object is not linked in that case.
    fn allocate(&mut self, device: &Self::Device) -> Result<()>;

    /// Delete the GPU handles.
    fn release(&mut self, device: &Self::Device);
}

/// Every GPU object the framework creates.
pub enum GlObject {
    /// See [`Texture`].
    Texture(Texture),
    /// See [`Shader`].
    Shader(Shader),
    /// See [`VertexArray`].
    VertexArray(VertexArray),
    /// See [`RenderTexture`].
    RenderTexture(RenderTexture),
    /// See [`Canvas`].
    Canvas(Canvas),
}

impl GpuObject for GlObject {
    type Device = RenderDevice;

    fn kind(&self) -> ObjectKind {
        match self {
            GlObject::Texture(_) => ObjectKind::Texture,
            GlObject::Shader(_) => ObjectKind::Shader,
            GlObject::VertexArray(_) => ObjectKind::VertexArray,
            GlObject::RenderTexture(_) => ObjectKind::RenderTexture,
            GlObject::Canvas(_) => ObjectKind::Canvas,
        }
    }

    fn allocate(&mut self, device: &RenderDevice) -> Result<()> {
        match self {
            GlObject::Texture(texture) => texture.allocate(device),
            GlObject::Shader(shader) => shader.allocate(device),
            GlObject::VertexArray(vertex_array) => vertex_array.allocate(device),
            GlObject::RenderTexture(target) => target.allocate(device),
            GlObject::Canvas(canvas) => canvas.target_mut().allocate(device),
        }
    }

    fn release(&mut self, device: &RenderDevice) {
        match self {
            GlObject::Texture(texture) => texture.release(device),
            GlObject::Shader(shader) => shader.release(device),
            GlObject::VertexArray(vertex_array) => vertex_array.release(device),
            GlObject::RenderTexture(target) => target.release(device),
            GlObject::Canvas(canvas) => canvas.target_mut().release(device),
        }
    }
}

/// A concrete object type that can be stored in and recovered from a
/// [`GlObject`].
pub trait Resource: Sized + 'static {
    /// The kind requested when looking this type up by name.
    const KIND: ObjectKind;

    /// Borrow the object as `Self` if its kind satisfies [`Self::KIND`].
    fn from_object(object: &GlObject) -> Option<&Self>;

    /// Mutable counterpart of [`from_object`](Self::from_object).
    fn from_object_mut(object: &mut GlObject) -> Option<&mut Self>;

    /// Wrap `self` for storage in the chain.
    fn into_object(self) -> GlObject;
}

macro_rules! impl_resource {
    ($ty:ident) => {
        impl Resource for $ty {
            const KIND: ObjectKind = ObjectKind::$ty;

            fn from_object(object: &GlObject) -> Option<&Self> {
                match object {
                    GlObject::$ty(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_object_mut(object: &mut GlObject) -> Option<&mut Self> {
                match object {
                    GlObject::$ty(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_object(self) -> GlObject {
                GlObject::$ty(self)
            }
        }
    };
}

impl_resource!(Texture);
impl_resource!(Shader);
impl_resource!(VertexArray);
impl_resource!(Canvas);

impl Resource for RenderTexture {
    const KIND: ObjectKind = ObjectKind::RenderTexture;

    fn from_object(object: &GlObject) -> Option<&Self> {
        match object {
            GlObject::RenderTexture(target) => Some(target),
            GlObject::Canvas(canvas) => Some(canvas.target()),
            _ => None,
        }
    }

    fn from_object_mut(object: &mut GlObject) -> Option<&mut Self> {
        match object {
            GlObject::RenderTexture(target) => Some(target),
            GlObject::Canvas(canvas) => Some(canvas.target_mut()),
            _ => None,
        }
    }

    fn into_object(self) -> GlObject {
        GlObject::RenderTexture(self)
    }
}

/// A typed reference to an object linked into a
/// [`RenderContext`](crate::RenderContext).
///
/// Handles are plain keys: copying one does not share ownership, and a
/// handle to a destroyed object simply resolves to nothing.
pub struct Handle<T> {
    key: ObjectKey,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn from_key(key: ObjectKey) -> Self {
        Self {
            key,
            marker: PhantomData,
        }
    }

    /// The untyped chain key.
    pub fn key(self) -> ObjectKey {
        self.key
    }
}

impl Handle<Canvas> {
    /// View the canvas through its render texture capability.
    pub fn as_render_texture(self) -> Handle<RenderTexture> {
        Handle::from_key(self.key)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.key).finish()
    }
}
