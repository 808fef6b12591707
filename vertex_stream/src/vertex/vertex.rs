/// Vertex record types and their attribute layouts

use std::mem::{offset_of, size_of};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex layout tag
///
/// Identifies which attribute configuration a buffer needs on the device.
/// Fixed when the buffer is created and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// `TexturedVertex`: 4-component position, fog depth, color, one UV set
    Textured,
    /// `LitVertex`: 3-component position, color, one UV set
    Lit,
    /// `MultiLayerVertex`: 3-component position, color, three UV sets
    MultiLayer,
}

impl VertexLayout {
    /// Attribute offset table for this layout
    pub fn format(&self) -> &'static VertexFormat {
        match self {
            VertexLayout::Textured => &TexturedVertex::FORMAT,
            VertexLayout::Lit => &LitVertex::FORMAT,
            VertexLayout::MultiLayer => &MultiLayerVertex::FORMAT,
        }
    }

    /// Number of texture coordinate channels this layout feeds
    pub fn tex_coord_count(&self) -> usize {
        self.format().tex_coord_offsets.len()
    }
}

/// Byte layout of one vertex record
///
/// All offsets are relative to the start of a record; `stride` is the
/// record size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormat {
    /// Record size in bytes
    pub stride: usize,
    /// Float components read for the position attribute
    pub position_components: u32,
    /// Offset of the position attribute
    pub position_offset: usize,
    /// Offset of the fog depth channel, if the layout provides one
    pub fog_offset: Option<usize>,
    /// Offset of the packed RGBA8 color
    pub color_offset: usize,
    /// Offset of each texture coordinate set, one entry per channel
    pub tex_coord_offsets: &'static [usize],
}

/// Fixed-layout vertex record
///
/// Implemented by the three record types the buffer layer knows how to bind.
/// Records are plain old data so they can be copied straight into mapped
/// device memory.
pub trait Vertex: Pod {
    /// Layout tag used by the array-state cache
    const LAYOUT: VertexLayout;
    /// Attribute offset table
    const FORMAT: VertexFormat;
}

/// Pre-transformed vertex with fog depth
///
/// `w` doubles as the fourth position component and the fog coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub p: Vec3,
    pub w: f32,
    pub color: u32,
    pub uv: Vec2,
}

impl TexturedVertex {
    pub fn new(p: Vec3, w: f32, color: u32, uv: Vec2) -> Self {
        Self { p, w, color, uv }
    }
}

impl Vertex for TexturedVertex {
    const LAYOUT: VertexLayout = VertexLayout::Textured;
    const FORMAT: VertexFormat = VertexFormat {
        stride: size_of::<TexturedVertex>(),
        position_components: 4,
        position_offset: offset_of!(TexturedVertex, p),
        fog_offset: Some(offset_of!(TexturedVertex, w)),
        color_offset: offset_of!(TexturedVertex, color),
        tex_coord_offsets: &[offset_of!(TexturedVertex, uv)],
    };
}

/// Lit vertex with a single UV set
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LitVertex {
    pub p: Vec3,
    pub color: u32,
    pub uv: Vec2,
}

impl LitVertex {
    pub fn new(p: Vec3, color: u32, uv: Vec2) -> Self {
        Self { p, color, uv }
    }
}

impl Vertex for LitVertex {
    const LAYOUT: VertexLayout = VertexLayout::Lit;
    const FORMAT: VertexFormat = VertexFormat {
        stride: size_of::<LitVertex>(),
        position_components: 3,
        position_offset: offset_of!(LitVertex, p),
        fog_offset: None,
        color_offset: offset_of!(LitVertex, color),
        tex_coord_offsets: &[offset_of!(LitVertex, uv)],
    };
}

/// Lit vertex with three UV sets (multi-layer surfaces)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MultiLayerVertex {
    pub p: Vec3,
    pub color: u32,
    pub uv: [Vec2; 3],
}

impl MultiLayerVertex {
    pub fn new(p: Vec3, color: u32, uv: [Vec2; 3]) -> Self {
        Self { p, color, uv }
    }
}

impl Vertex for MultiLayerVertex {
    const LAYOUT: VertexLayout = VertexLayout::MultiLayer;
    const FORMAT: VertexFormat = VertexFormat {
        stride: size_of::<MultiLayerVertex>(),
        position_components: 3,
        position_offset: offset_of!(MultiLayerVertex, p),
        fog_offset: None,
        color_offset: offset_of!(MultiLayerVertex, color),
        tex_coord_offsets: &[
            offset_of!(MultiLayerVertex, uv),
            offset_of!(MultiLayerVertex, uv) + size_of::<Vec2>(),
            offset_of!(MultiLayerVertex, uv) + 2 * size_of::<Vec2>(),
        ],
    };
}

#[cfg(test)]
#[path = "vertex_tests.rs"]
mod tests;
