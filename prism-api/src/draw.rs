//! Draw data handed from a GUI frame to a renderer.
//!
//! Layout mirrors what GPU backends expect: one vertex buffer, one index
//! buffer, and a list of commands slicing the index buffer per texture and
//! clip rectangle.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::GpuHandle;

/// A single vertex: position in pixels, atlas UV, packed RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct DrawVert {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub col: u32,
}

/// One draw call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCmd {
    /// Texture to bind; `None` before any atlas has been uploaded.
    pub texture: Option<GpuHandle>,
    /// Clip rectangle as `[min_x, min_y, max_x, max_y]`.
    pub clip_rect: [f32; 4],
    /// First index in `DrawData::indices`.
    pub index_offset: u32,
    /// Number of indices.
    pub elem_count: u32,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawData {
    pub display_size: [f32; 2],
    pub vertices: Vec<DrawVert>,
    pub indices: Vec<u32>,
    pub commands: Vec<DrawCmd>,
}

impl DrawData {
    pub fn total_vtx_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn total_idx_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Raw vertex bytes, ready for a buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Pack an RGBA color into the `DrawVert::col` layout.
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}
