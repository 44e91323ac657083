//! Error type shared by every fallible operation in the crate.

use crate::object::ObjectKind;

/// Errors reported by the framework.
///
/// Misuse (duplicate names, lookups of the wrong kind, out-of-range texture
/// slots) is logged at the call site *and* returned, so callers can either
/// ignore the value and rely on the log or branch on it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [`Window`](crate::Window) already exists in this process.
    #[error("a window is already open in this process")]
    WindowAlreadyOpen,

    /// The native window or the event loop could not be created.
    #[error("failed to create window: {0}")]
    WindowCreation(String),

    /// The OpenGL display, context or surface could not be created.
    #[error("failed to create OpenGL context: {0}")]
    ContextCreation(String),

    /// The driver exposes an OpenGL version older than 3.3.
    #[error("OpenGL {major}.{minor} is not supported, 3.3 or newer is required")]
    UnsupportedGlVersion {
        /// Reported major version.
        major: u32,
        /// Reported minor version.
        minor: u32,
    },

    /// The object chain was used before `initialize` or after `tear_down`.
    #[error("object chain is not initialized")]
    ChainNotInitialized,

    /// A `glCreate*` call failed.
    #[error("GPU allocation failed: {0}")]
    Allocation(String),

    /// A handle refers to an object that is no longer linked.
    #[error("handle refers to an object that is no longer alive")]
    StaleHandle,

    /// No library entry is bound to the given name.
    #[error("object `{0}` could not be found in the library")]
    NotFound(String),

    /// A library entry exists but is of an incompatible kind.
    #[error("object `{name}` is a {found}, not a {requested}")]
    WrongKind {
        /// Library name that was looked up.
        name: String,
        /// Kind stored under that name.
        found: ObjectKind,
        /// Kind the caller asked for.
        requested: ObjectKind,
    },

    /// A sampler was bound to a texture unit at or above
    /// [`MAX_TEXTURE_SLOTS`](crate::MAX_TEXTURE_SLOTS).
    #[error("texture slot {0} is over the limit of {max}", max = crate::shader::MAX_TEXTURE_SLOTS - 1)]
    TextureSlotOutOfRange(u32),

    /// Pixel data with a channel count other than 1, 3 or 4.
    #[error("unsupported number of channels: {0}")]
    UnsupportedChannels(u8),

    /// Pixel buffer length does not match `width * height * channels`.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelDataSize {
        /// Bytes required by the declared dimensions.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// Encoded image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
