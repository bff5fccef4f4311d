use bytemuck::cast_slice;

use super::block_tree::CellId;
use super::heightfield::HeightField;
use crate::render::IndexFormat;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl BlockIndices {
    pub fn len(&self) -> usize {
        match self {
            BlockIndices::U16(v) => v.len(),
            BlockIndices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            BlockIndices::U16(_) => IndexFormat::U16,
            BlockIndices::U32(_) => IndexFormat::U32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BlockIndices::U16(v) => cast_slice(v),
            BlockIndices::U32(v) => cast_slice(v),
        }
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            BlockIndices::U16(v) => v.get(i).map(|i| *i as u32),
            BlockIndices::U32(v) => v.get(i).copied(),
        }
    }
}

/// Topology of one terrain block, shared by every level. A `block_size` grid of interior
/// vertices is wrapped by a ring of skirt vertices pinned to the block border.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMesh {
    block_size: u32,
    positions: Vec<[f32; 3]>,
    indices: BlockIndices,
}

impl BlockMesh {
    pub fn new(block_size: u32) -> Self {
        let edge = block_size + 2;
        let mut positions = Vec::with_capacity((edge * edge) as usize);
        for v in 0..edge {
            for u in 0..edge {
                let (s, t) = template_uv(block_size, u, v);
                positions.push([s, 0.0, t]);
            }
        }

        let strip = strip_indices(edge);
        let indices = if positions.len() > u16::MAX as usize {
            BlockIndices::U32(strip)
        } else {
            BlockIndices::U16(strip.into_iter().map(|i| i as u16).collect())
        };

        Self {
            block_size,
            positions,
            indices,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Vertices per block edge including the skirt ring.
    pub fn edge(&self) -> u32 {
        self.block_size + 2
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn indices(&self) -> &BlockIndices {
        &self.indices
    }

    pub fn triangles_per_block(&self) -> u64 {
        let quads = (self.block_size + 1) as u64;
        quads * quads * 2
    }

    /// Byte offset of the height stream inside the vertex buffer.
    pub fn height_stream_offset(&self) -> usize {
        self.vertex_count() * 12
    }

    /// Initial vertex buffer contents: positions followed by a zeroed height stream.
    pub fn vertex_buffer_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.vertex_count() * 16);
        bytes.extend_from_slice(cast_slice(&self.positions));
        bytes.resize(self.vertex_count() * 16, 0);
        bytes
    }

    pub fn is_skirt(&self, u: u32, v: u32) -> bool {
        let last = self.edge() - 1;
        u == 0 || v == 0 || u == last || v == last
    }

    /// Height of template vertex `(u, v)` when stretched over `cell`.
    fn vertex_height(&self, field: &HeightField, cell: CellId, u: u32, v: u32) -> f32 {
        let [s, _, t] = self.positions[(v * self.edge() + u) as usize];
        let n = field.size() as f32;
        let scale = cell.scale();
        let px = ((s * scale + cell.min_u()) * n + 0.5).floor() as i64;
        let py = ((t * scale + cell.min_v()) * n + 0.5).floor() as i64;
        field.height_at_pixel(px, py)
    }

    /// Writes the height stream of one block into `out`, dropping skirt vertices by
    /// `skirt_drop` and clamping them at zero.
    pub fn fill_heights(&self, field: &HeightField, cell: CellId, skirt_drop: f32, out: &mut Vec<f32>) {
        out.clear();
        let edge = self.edge();
        for v in 0..edge {
            for u in 0..edge {
                let mut h = self.vertex_height(field, cell, u, v);
                if self.is_skirt(u, v) {
                    h = (h - skirt_drop).max(0.0);
                }
                out.push(h);
            }
        }
    }

    /// Appends one block as static triangles: positions on the unit footprint and two
    /// triangles per template quad, offset by the vertices already in `positions`.
    pub fn append_static(
        &self,
        field: &HeightField,
        cell: CellId,
        skirt_height: f32,
        positions: &mut Vec<[f32; 3]>,
        indices: &mut Vec<u32>,
    ) {
        let base = positions.len() as u32;
        let edge = self.edge();
        let scale = cell.scale();
        let mut heights = Vec::with_capacity(self.vertex_count());
        self.fill_heights(field, cell, skirt_height, &mut heights);
        for (p, h) in self.positions.iter().zip(heights) {
            positions.push([p[0] * scale + cell.min_u(), h, p[2] * scale + cell.min_v()]);
        }

        for v in 0..edge - 1 {
            for u in 0..edge - 1 {
                let i = base + v * edge + u;
                let below = i + edge;
                indices.extend_from_slice(&[i, below, below + 1, i, below + 1, i + 1]);
            }
        }
    }
}

fn template_uv(block_size: u32, u: u32, v: u32) -> (f32, f32) {
    let last = block_size + 1;
    let inv = 1.0 / (block_size - 1).max(1) as f32;
    let coord = |i: u32| match i {
        0 => 0.0,
        i if i == last => 1.0,
        i => (i - 1) as f32 * inv,
    };
    (coord(u), coord(v))
}

/// Triangle strip over an `edge x edge` grid. Rows alternate direction and repeat their last
/// index to stitch into the next row.
fn strip_indices(edge: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(((2 * edge + 1) * edge.saturating_sub(1)) as usize);
    let mut forward = true;
    for v in 0..edge.saturating_sub(1) {
        for u in 0..edge {
            let col = if forward { u } else { edge - 1 - u };
            indices.push(v * edge + col);
            indices.push((v + 1) * edge + col);
        }
        if let Some(last) = indices.last().copied() {
            indices.push(last);
        }
        forward = !forward;
    }
    indices
}
