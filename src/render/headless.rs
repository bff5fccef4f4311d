use std::collections::HashMap;

use glam::Mat4;
use tracing::debug;

use super::{BlockParams, BufferHandle, BufferUsage, DeviceError, DrawIndexed, RenderDevice};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub draw: DrawIndexed,
    pub params: BlockParams,
    pub world: Mat4,
    /// Height stream at draw time, only kept when capturing.
    pub heights: Option<Vec<f32>>,
}

struct Buffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// Device that keeps buffers in memory and records every draw.
#[derive(Default)]
pub struct HeadlessDevice {
    buffers: HashMap<BufferHandle, Buffer>,
    next_buffer: u32,
    params: BlockParams,
    world: Mat4,
    capture_heights: bool,
    pub draws: Vec<RecordedDraw>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the height stream with each recorded draw.
    pub fn capturing() -> Self {
        Self {
            capture_heights: true,
            ..Default::default()
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer).map(|b| b.usage)
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_buffer(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, DeviceError> {
        self.next_buffer = self.next_buffer.checked_add(1).ok_or(DeviceError::OutOfMemory)?;
        let handle = BufferHandle(self.next_buffer);
        debug!("Headless {:?} buffer {} ({} bytes)", usage, handle.0, data.len());
        self.buffers.insert(
            handle,
            Buffer {
                usage,
                data: data.to_vec(),
            },
        );
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let buf = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        let size = buf.data.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or(DeviceError::OutOfRange {
                buffer,
                offset,
                len: data.len(),
                size,
            })?;
        buf.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn set_world_transform(&mut self, transform: &Mat4) {
        self.world = *transform;
    }

    fn set_block_params(&mut self, params: &BlockParams) {
        self.params = *params;
    }

    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        let heights = if self.capture_heights {
            self.buffers.get(&draw.vertex_buffer).map(|b| {
                let start = draw.height_stream_offset.min(b.data.len());
                let end = (start + draw.vertex_count as usize * 4).min(b.data.len());
                b.data[start..end]
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect()
            })
        } else {
            None
        };

        self.draws.push(RecordedDraw {
            draw: *draw,
            params: self.params,
            world: self.world,
            heights,
        });
    }
}
