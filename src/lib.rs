//! A small 2D rendering framework on OpenGL 3.3 via [glow].
//!
//! Application code draws into a [`Canvas`] of fixed resolution and a
//! coordinate space of its choosing; once per frame the canvas is scaled into
//! the [`Window`], letterboxed to keep its aspect ratio. Mouse positions map
//! back through the same transforms, pan and zoom included.
//!
//! Every GPU object (textures, shaders, vertex arrays, render targets) is
//! created through a [`RenderContext`], referred to by a typed [`Handle`]
//! and released at the latest when the context is dropped. Objects created
//! by name are also registered in the [`ObjectLibrary`] and can be looked up
//! again from anywhere that has the context.
//!
//! # Overview
//!
//! - [`Window`] opens the native window and GL context, pumps events into
//!   an [`InputManager`] and owns the display canvas.
//! - [`Sprite`] draws a textured quad, [`Polygon`] a flat-colored mesh
//!   (tessellated with [lyon] by [`VertexArray::from_path`]).
//! - [`RenderTexture`] and [`Canvas`] are off-screen targets; canvases can
//!   be drawn onto other targets or onto the window.
//!
//! # Safety
//!
//! [`RenderContext::new`] is `unsafe`: the caller promises a current GL
//! context that outlives it. [`Window`] upholds this itself.
//!
//! [glow]: https://docs.rs/glow
//! [lyon]: https://docs.rs/lyon

mod canvas;
mod chain;
mod context;
mod device;
mod drawable;
mod error;
mod input;
mod library;
mod logging;
mod object;
mod render_texture;
mod shader;
mod state;
mod texture;
mod timer;
pub mod transform;
mod types;
mod vertex_array;
mod viewport;
mod window;

pub use canvas::Canvas;
pub use chain::ObjectChain;
pub use context::RenderContext;
pub use device::RenderDevice;
pub use drawable::{DrawParams, Polygon, Sprite};
pub use error::{Error, Result};
pub use input::InputManager;
pub use library::{ObjectLibrary, DEFAULT_COLORED_SHADER, DEFAULT_TEXTURED_SHADER, DEFAULT_VERTEX_ARRAY};
pub use logging::{init_logging, LoggingConfig};
pub use object::{GlObject, GpuObject, Handle, ObjectKey, ObjectKind, Resource};
pub use render_texture::{DrawCommand, RenderTexture, TEXTURE_UNIFORM};
pub use shader::{
    SamplerSlots, Shader, COLORED_FRAGMENT_SRC, DEFAULT_VERTEX_SRC, MAX_TEXTURE_SLOTS, TEXTURED_FRAGMENT_SRC,
};
pub use state::{Binding, ContextState, TEXTURE_UNITS};
pub use texture::{Texture, TextureData, TextureFilter};
pub use timer::Timer;
pub use types::{Color, Rect, Vertex};
pub use vertex_array::{DrawCall, VertexArray, POSITION_ATTRIBUTE, TEX_COORD_ATTRIBUTE};
pub use viewport::ViewLayout;
pub use window::{Window, WindowConfig};

pub use glam;
pub use lyon;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
