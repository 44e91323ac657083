//! 2D textures and the decoded pixel data they are created from.

use glam::UVec2;
use glow::{HasContext, PixelUnpackData};

use crate::device::RenderDevice;
use crate::error::{Error, Result};

/// GL internal format for every texture, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

/// Convert a `u32` dimension to the `i32` GL wants.
pub(crate) fn gl_size(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Allocation(format!("dimension {value} exceeds i32::MAX")))
}

/// The GL pixel format for a channel count.
fn pixel_format(channels: u8) -> Result<u32> {
    match channels {
        1 => Ok(glow::RED),
        3 => Ok(glow::RGB),
        4 => Ok(glow::RGBA),
        other => Err(Error::UnsupportedChannels(other)),
    }
}

/// Decoded pixels ready for upload.
///
/// Rows are stored bottom row first, which is what GL samples at `v = 0`.
/// Images decoded top row first (the usual file order) are flipped when
/// built with `flip_vertically = true`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureData {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl TextureData {
    /// Wrap a raw pixel buffer.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedChannels`] unless `channels` is 1, 3 or 4, and
    /// [`Error::PixelDataSize`] if the buffer length does not match.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        pixel_format(channels)?;
        let expected = width as usize * height as usize * usize::from(channels);
        if pixels.len() != expected {
            return Err(Error::PixelDataSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            channels,
        })
    }

    /// Convert a decoded image to RGBA.
    pub fn from_image(image: &image::DynamicImage, flip_vertically: bool) -> Self {
        let rgba = if flip_vertically {
            image.flipv().to_rgba8()
        } else {
            image.to_rgba8()
        };
        let (width, height) = rgba.dimensions();
        Self {
            pixels: rgba.into_raw(),
            width,
            height,
            channels: 4,
        }
    }

    /// Decode PNG or JPEG bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Image`] if the bytes cannot be decoded.
    pub fn from_memory(bytes: &[u8], flip_vertically: bool) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image, flip_vertically))
    }

    /// Reverse the row order in place.
    pub fn flip_vertically(&mut self) {
        let stride = self.width as usize * usize::from(self.channels);
        if stride == 0 {
            return;
        }
        let rows = self.pixels.len() / stride;
        for row in 0..rows / 2 {
            let (top, bottom) = self.pixels.split_at_mut((rows - row - 1) * stride);
            top[row * stride..(row + 1) * stride].swap_with_slice(&mut bottom[..stride]);
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// The raw bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Sampling filter for minification and magnification.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TextureFilter {
    /// Pixel-exact sampling, the default for 2D sprites.
    #[default]
    Nearest,
    /// Bilinear sampling.
    Linear,
}

impl TextureFilter {
    #[expect(clippy::cast_possible_wrap)]
    fn gl_value(self) -> i32 {
        match self {
            TextureFilter::Nearest => glow::NEAREST as i32,
            TextureFilter::Linear => glow::LINEAR as i32,
        }
    }
}

/// A 2D texture.
///
/// Pixel data handed to the constructor is kept on the CPU only until the
/// texture is linked; allocation uploads it and drops the copy.
pub struct Texture {
    size: UVec2,
    channels: u8,
    filter: TextureFilter,
    pending: Option<Vec<u8>>,
    raw: Option<glow::Texture>,
}

impl Texture {
    /// A texture initialized from decoded pixels.
    pub fn from_data(data: TextureData) -> Self {
        Self {
            size: UVec2::new(data.width, data.height),
            channels: data.channels,
            filter: TextureFilter::default(),
            pending: Some(data.pixels),
            raw: None,
        }
    }

    /// A texture with undefined contents, e.g. a render target.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedChannels`] unless `channels` is 1, 3 or 4.
    pub fn empty(size: UVec2, channels: u8) -> Result<Self> {
        pixel_format(channels)?;
        Ok(Self {
            size,
            channels,
            filter: TextureFilter::default(),
            pending: None,
            raw: None,
        })
    }

    /// Use `filter` instead of nearest sampling.
    #[must_use]
    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Size in pixels.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.x
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.y
    }

    /// Bytes per pixel of the source data.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Sampling filter.
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    /// The GL texture name, `None` until allocated.
    pub fn raw(&self) -> Option<glow::Texture> {
        self.raw
    }

    /// Replace the contents (and size) with `data`.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Allocation`] for oversized data. Does nothing on
    /// a texture that is not allocated.
    pub fn update(&mut self, device: &RenderDevice, data: TextureData) -> Result<()> {
        self.size = UVec2::new(data.width, data.height);
        self.channels = data.channels;
        match self.raw {
            Some(texture) => self.upload(device, texture, Some(&data.pixels)),
            None => {
                self.pending = Some(data.pixels);
                Ok(())
            }
        }
    }

    pub(crate) fn allocate(&mut self, device: &RenderDevice) -> Result<()> {
        // SAFETY: the device's context is current on this thread.
        let texture = unsafe { device.gl().create_texture() }.map_err(Error::Allocation)?;
        let pixels = self.pending.take();
        if let Err(err) = self.upload(device, texture, pixels.as_deref()) {
            device.delete_texture(texture);
            return Err(err);
        }
        self.raw = Some(texture);
        Ok(())
    }

    pub(crate) fn release(&mut self, device: &RenderDevice) {
        if let Some(texture) = self.raw.take() {
            device.delete_texture(texture);
        }
    }

    fn upload(&self, device: &RenderDevice, texture: glow::Texture, pixels: Option<&[u8]>) -> Result<()> {
        let format = pixel_format(self.channels)?;
        let width = gl_size(self.size.x)?;
        let height = gl_size(self.size.y)?;
        let gl = device.gl();

        device.bind_texture(0, Some(texture));
        // SAFETY: the device's context is current on this thread and the
        // texture was just bound to unit 0.
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, self.filter.gl_value());
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, self.filter.gl_value());
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            // RGB and single channel rows are not 4-byte aligned in general.
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGBA8_INTERNAL_FORMAT,
                width,
                height,
                0,
                format,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(pixels),
            );
        }
        Ok(())
    }
}
