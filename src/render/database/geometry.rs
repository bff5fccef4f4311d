//! `H3DG` binary geometry blobs.
//!
//! Layout (little-endian): magic, version, joint count, stream count, vertex count, then
//! per stream its id, element size and data, then the index count, 32-bit indices and the
//! morph target count.

use super::{Error, Result};

pub const GEOMETRY_MAGIC: &[u8; 4] = b"H3DG";
pub const GEOMETRY_VERSION: u32 = 5;
/// Stream id of vertex positions.
pub const POSITION_STREAM: u32 = 0;
pub const POSITION_ELEMENT_SIZE: u32 = 12;

/// Static mesh with a single position stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBlob {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl GeometryBlob {
    /// Size in bytes of the serialized blob.
    pub fn byte_size(&self) -> usize {
        4 + 4 * 8
            + self.positions.len() * POSITION_ELEMENT_SIZE as usize
            + self.indices.len() * 4
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_size());
        out.extend_from_slice(GEOMETRY_MAGIC);
        put_u32(&mut out, GEOMETRY_VERSION);
        // joints
        put_u32(&mut out, 0);
        // streams
        put_u32(&mut out, 1);
        put_u32(&mut out, self.positions.len() as u32);

        put_u32(&mut out, POSITION_STREAM);
        put_u32(&mut out, POSITION_ELEMENT_SIZE);
        for p in &self.positions {
            for c in p {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }

        put_u32(&mut out, self.indices.len() as u32);
        for i in &self.indices {
            put_u32(&mut out, *i);
        }
        // morph targets
        put_u32(&mut out, 0);
        out
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, pos: 0 };
        if reader.take(4)? != GEOMETRY_MAGIC {
            return Err(Error::geometry("missing H3DG magic"));
        }
        let version = reader.u32()?;
        if version != GEOMETRY_VERSION {
            return Err(Error::geometry(format!("unsupported version {}", version)));
        }
        if reader.u32()? != 0 {
            return Err(Error::geometry("skinned geometry is not supported"));
        }

        let stream_count = reader.u32()? as usize;
        let vertex_count = reader.u32()? as usize;
        // every stream carries at least its id and element size
        if stream_count > reader.remaining() / 8 {
            return Err(Error::geometry(format!(
                "{} streams do not fit in {} bytes",
                stream_count,
                reader.remaining()
            )));
        }
        let mut positions = Vec::new();
        for _ in 0..stream_count {
            let id = reader.u32()?;
            let element_size = reader.u32()? as usize;
            let bytes = reader.take(vertex_count * element_size)?;
            if id == POSITION_STREAM {
                if element_size != POSITION_ELEMENT_SIZE as usize {
                    return Err(Error::geometry(format!(
                        "position stream element size {}",
                        element_size
                    )));
                }
                positions = bytes
                    .chunks_exact(4)
                    .map(le_f32)
                    .collect::<Vec<_>>()
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect();
            }
        }

        let index_count = reader.u32()? as usize;
        let indices: Vec<u32> = reader.take(index_count * 4)?.chunks_exact(4).map(le_u32).collect();
        if let Some(bad) = indices.iter().find(|i| **i as usize >= vertex_count) {
            return Err(Error::geometry(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        if reader.u32()? != 0 {
            return Err(Error::geometry("morph targets are not supported"));
        }
        if reader.pos != data.len() {
            return Err(Error::geometry(format!(
                "{} trailing bytes",
                data.len() - reader.pos
            )));
        }

        Ok(Self { positions, indices })
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Error::geometry(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        self.take(4).map(le_u32)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

#[derive(Debug, Clone)]
pub struct GeometryResource {
    pub data: Vec<u8>,
    pub mesh: GeometryBlob,
}

impl GeometryResource {
    pub fn load(data: Vec<u8>) -> Result<Self> {
        let mesh = GeometryBlob::parse(&data)?;
        Ok(Self { data, mesh })
    }
}
