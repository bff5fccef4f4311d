use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::math::Frustum;

pub mod database;
pub mod headless;

pub use headless::HeadlessDevice;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

/// Per block uniform: uv offset of the block and its scale on the unit footprint.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BlockParams {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
}

impl BlockParams {
    pub fn new(min_u: f32, min_v: f32, scale: f32) -> Self {
        Self {
            offset: [min_u, min_v],
            scale: [scale, scale],
        }
    }
}

/// One indexed draw from the shared terrain block buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawIndexed {
    pub primitive: PrimitiveType,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_format: IndexFormat,
    pub index_count: u32,
    pub vertex_count: u32,
    /// Byte offset of the height stream behind the position stream.
    pub height_stream_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    UnknownBuffer(BufferHandle),
    OutOfRange {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
        size: usize,
    },
    OutOfMemory,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::UnknownBuffer(b) => write!(f, "unknown buffer {}", b.0),
            DeviceError::OutOfRange {
                buffer,
                offset,
                len,
                size,
            } => write!(
                f,
                "write of {} bytes at {} exceeds buffer {} of {} bytes",
                len, offset, buffer.0, size
            ),
            DeviceError::OutOfMemory => write!(f, "device out of memory"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// The slice of a GPU device the terrain needs. Calls are synchronous from the caller's
/// point of view.
pub trait RenderDevice {
    fn create_buffer(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, DeviceError>;
    fn destroy_buffer(&mut self, buffer: BufferHandle);
    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DeviceError>;
    fn set_world_transform(&mut self, transform: &Mat4);
    fn set_block_params(&mut self, params: &BlockParams);
    fn draw_indexed(&mut self, draw: &DrawIndexed);
}

/// What a terrain is rendered for in one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderView<'a> {
    /// Camera position in world space. Without one only the coarsest block is drawn.
    pub camera: Option<Vec3>,
    /// View and optional shadow frustum.
    pub frusta: [Option<&'a Frustum>; 2],
    /// Material class of the pass, `None` accepts every material.
    pub material_class: Option<&'a str>,
    /// Draw with the built-in debug shading, ignoring the material.
    pub debug_view: bool,
}

impl<'a> RenderView<'a> {
    pub fn new(camera: Vec3, frustum: &'a Frustum) -> Self {
        Self {
            camera: Some(camera),
            frusta: [Some(frustum), None],
            ..Default::default()
        }
    }
}

/// Engine counters accumulated while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub batch_count: u32,
    pub triangle_count: u64,
}

impl std::ops::AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: Self) {
        self.batch_count += rhs.batch_count;
        self.triangle_count += rhs.triangle_count;
    }
}
