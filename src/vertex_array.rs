//! Vertex arrays: positions, optional texture coordinates and optional
//! indices, with the GL buffers created lazily.

use glam::Vec2;
use glow::HasContext;
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers};

use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::types::Vertex;

/// Attribute location of the position in every shader.
pub const POSITION_ATTRIBUTE: u32 = 0;
/// Attribute location of the texture coordinate in every shader.
pub const TEX_COORD_ATTRIBUTE: u32 = 1;

/// The GL draw a vertex array resolves to, as triangles.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawCall {
    /// `glDrawArrays` over this many vertices.
    Arrays {
        /// Vertex count.
        count: i32,
    },
    /// `glDrawElements` over this many `u32` indices.
    Elements {
        /// Index count.
        count: i32,
    },
}

/// GL names owned by an allocated vertex array.
#[derive(Debug, Default)]
struct Buffers {
    vao: Option<glow::VertexArray>,
    positions: Option<glow::Buffer>,
    tex_coords: Option<glow::Buffer>,
    indices: Option<glow::Buffer>,
}

/// Triangle geometry.
///
/// Data is edited on the CPU and sent to the GPU by
/// [`upload`](Self::upload); linking uploads whatever was added before.
/// The position buffer exists from allocation on, while the texture
/// coordinate and index buffers are only created by the first upload that
/// has data for them.
///
/// Adding an index makes the array indexed for the rest of its life, even
/// if it is later cleared.
#[derive(Debug, Default)]
pub struct VertexArray {
    vertices: Vec<Vertex>,
    tex_coords: Vec<Vertex>,
    indices: Vec<u32>,
    indexed: bool,
    uploaded: Option<DrawCall>,
    buffers: Buffers,
}

impl VertexArray {
    /// An empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `[0, 1]²` quad every sprite is drawn with, texture coordinates
    /// equal to positions.
    pub fn unit_quad() -> Self {
        let corners = [
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
            Vertex::new(1.0, 1.0),
        ];
        let mut quad = Self::new();
        quad.add_vertices(corners);
        quad.add_tex_coords(corners);
        quad.add_indices([0, 1, 2, 2, 1, 3]);
        quad
    }

    /// Fill-tessellate `path` into an indexed mesh.
    ///
    /// Returns `None` if tessellation fails or yields no geometry.
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut geometry: VertexBuffers<Vertex, u32> = VertexBuffers::new();
        let mut tessellator = FillTessellator::new();

        let result = tessellator.tessellate_path(
            path,
            &FillOptions::tolerance(0.01).with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| Vertex {
                position: vertex.position().to_array(),
            }),
        );

        match result {
            Ok(()) if !geometry.indices.is_empty() => {
                let mut mesh = Self::new();
                mesh.add_vertices(geometry.vertices);
                mesh.add_indices(geometry.indices);
                Some(mesh)
            }
            Ok(()) => None,
            Err(err) => {
                log::warn!("failed to tessellate path: {err:?}");
                None
            }
        }
    }

    /// Tessellate the closed polygon through `points`.
    pub fn from_polygon(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut builder = Path::builder();
        builder.begin(point(first.x, first.y));
        for p in rest {
            builder.line_to(point(p.x, p.y));
        }
        builder.close();
        Self::from_path(&builder.build())
    }

    /// Append one vertex.
    pub fn add_vertex(&mut self, vertex: impl Into<Vertex>) {
        self.vertices.push(vertex.into());
    }

    /// Append vertices.
    pub fn add_vertices<V: Into<Vertex>>(&mut self, vertices: impl IntoIterator<Item = V>) {
        self.vertices.extend(vertices.into_iter().map(Into::into));
    }

    /// Append one texture coordinate.
    pub fn add_tex_coord(&mut self, coord: impl Into<Vertex>) {
        self.tex_coords.push(coord.into());
    }

    /// Append texture coordinates.
    pub fn add_tex_coords<V: Into<Vertex>>(&mut self, coords: impl IntoIterator<Item = V>) {
        self.tex_coords.extend(coords.into_iter().map(Into::into));
    }

    /// Append one index, making the array indexed.
    pub fn add_index(&mut self, index: u32) {
        self.indexed = true;
        self.indices.push(index);
    }

    /// Append indices. An empty iterator leaves the indexed flag alone.
    pub fn add_indices(&mut self, indices: impl IntoIterator<Item = u32>) {
        for index in indices {
            self.add_index(index);
        }
    }

    /// Drop all CPU-side data. The indexed flag and the GPU contents stay
    /// until the next [`upload`](Self::upload).
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.tex_coords.clear();
        self.indices.clear();
    }

    /// Positions.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Texture coordinates.
    pub fn tex_coords(&self) -> &[Vertex] {
        &self.tex_coords
    }

    /// Indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Whether an index was ever added.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether the GL vertex array object exists.
    pub fn is_allocated(&self) -> bool {
        self.buffers.vao.is_some()
    }

    /// Whether there is one texture coordinate per vertex.
    ///
    /// Texture coordinates are only uploaded when this holds; a mismatch is
    /// logged and the attribute left disabled.
    pub fn tex_coords_match(&self) -> bool {
        if self.tex_coords.is_empty() {
            return false;
        }
        if self.tex_coords.len() != self.vertices.len() {
            log::warn!(
                "vertex array has {} texture coordinates for {} vertices, ignoring them",
                self.tex_coords.len(),
                self.vertices.len()
            );
            return false;
        }
        true
    }

    /// The draw the current CPU data resolves to, `None` if there is nothing
    /// to draw.
    pub fn draw_call(&self) -> Option<DrawCall> {
        let len = if self.indexed {
            self.indices.len()
        } else {
            self.vertices.len()
        };
        if len == 0 {
            return None;
        }
        let count = i32::try_from(len).unwrap_or(i32::MAX);
        Some(if self.indexed {
            DrawCall::Elements { count }
        } else {
            DrawCall::Arrays { count }
        })
    }

    /// Send the CPU data to the GPU, creating missing buffers.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if a buffer could not be created. Does nothing
    /// before the array is linked.
    pub fn upload(&mut self, device: &RenderDevice) -> Result<()> {
        let Some(vao) = self.buffers.vao else {
            return Ok(());
        };
        let gl = device.gl();
        device.bind_vertex_array(Some(vao));

        let positions = Self::buffer(gl, &mut self.buffers.positions)?;
        // SAFETY: the device's context is current on this thread and `vao` is
        // bound, so the attribute setup is recorded in it.
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(positions));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&self.vertices),
                glow::STATIC_DRAW,
            );
            gl.vertex_attrib_pointer_f32(POSITION_ATTRIBUTE, 2, glow::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(POSITION_ATTRIBUTE);
        }

        if self.tex_coords_match() {
            let tex_coords = Self::buffer(gl, &mut self.buffers.tex_coords)?;
            // SAFETY: as above.
            unsafe {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(tex_coords));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&self.tex_coords),
                    glow::STATIC_DRAW,
                );
                gl.vertex_attrib_pointer_f32(TEX_COORD_ATTRIBUTE, 2, glow::FLOAT, false, 0, 0);
                gl.enable_vertex_attrib_array(TEX_COORD_ATTRIBUTE);
            }
        } else {
            // SAFETY: as above.
            unsafe { gl.disable_vertex_attrib_array(TEX_COORD_ATTRIBUTE) };
        }

        if self.indexed {
            let indices = Self::buffer(gl, &mut self.buffers.indices)?;
            // SAFETY: as above; the element binding is part of `vao`.
            unsafe {
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices));
                gl.buffer_data_u8_slice(
                    glow::ELEMENT_ARRAY_BUFFER,
                    bytemuck::cast_slice(&self.indices),
                    glow::STATIC_DRAW,
                );
            }
        }

        // SAFETY: as above.
        unsafe { gl.bind_buffer(glow::ARRAY_BUFFER, None) };
        self.uploaded = self.draw_call();
        Ok(())
    }

    /// Draw the uploaded triangles with whatever program is current.
    pub fn draw(&self, device: &RenderDevice) {
        let (Some(vao), Some(call)) = (self.buffers.vao, self.uploaded) else {
            return;
        };
        device.bind_vertex_array(Some(vao));
        // SAFETY: the device's context is current on this thread and the
        // counts were validated against the uploaded buffers.
        unsafe {
            match call {
                DrawCall::Arrays { count } => device.gl().draw_arrays(glow::TRIANGLES, 0, count),
                DrawCall::Elements { count } => {
                    device
                        .gl()
                        .draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0);
                }
            }
        }
    }

    pub(crate) fn allocate(&mut self, device: &RenderDevice) -> Result<()> {
        let gl = device.gl();
        // SAFETY: the device's context is current on this thread.
        let vao = unsafe { gl.create_vertex_array() }.map_err(Error::Allocation)?;
        self.buffers.vao = Some(vao);
        if let Err(err) = Self::buffer(gl, &mut self.buffers.positions).and_then(|_| self.upload(device)) {
            self.release(device);
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn release(&mut self, device: &RenderDevice) {
        let buffers = std::mem::take(&mut self.buffers);
        if let Some(vao) = buffers.vao {
            device.delete_vertex_array(vao);
        }
        for buffer in [buffers.positions, buffers.tex_coords, buffers.indices]
            .into_iter()
            .flatten()
        {
            // SAFETY: the device's context is current on this thread.
            unsafe { device.gl().delete_buffer(buffer) };
        }
        self.uploaded = None;
    }

    fn buffer(gl: &glow::Context, slot: &mut Option<glow::Buffer>) -> Result<glow::Buffer> {
        if let Some(buffer) = *slot {
            return Ok(buffer);
        }
        // SAFETY: the device's context is current on this thread.
        let buffer = unsafe { gl.create_buffer() }.map_err(Error::Allocation)?;
        *slot = Some(buffer);
        Ok(buffer)
    }
}
