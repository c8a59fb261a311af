//! Master/slave state distribution.
//!
//! The master encodes every shared object into one byte stream per frame;
//! slaves decode the same stream in the same order. Transport is the host's
//! business, this module only defines the byte layout.

use crate::error::SyncError;

/// Append-only little-endian snapshot writer.
#[derive(Debug, Default)]
pub struct SyncEncoder {
    bytes: Vec<u8>,
}

impl SyncEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed slice of plain-old-data records.
    pub fn write_pod_slice<T: bytemuck::Pod>(&mut self, values: &[T]) {
        self.write_u32(values.len() as u32);
        self.bytes.extend_from_slice(bytemuck::cast_slice(values));
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reader over a snapshot produced by [`SyncEncoder`].
#[derive(Debug)]
pub struct SyncDecoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> SyncDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], SyncError> {
        let available = self.bytes.len() - self.offset;
        if needed > available {
            return Err(SyncError::Truncated {
                needed,
                offset: self.offset,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, SyncError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, SyncError> {
        let raw = self.take(4)?;
        Ok(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_pod_vec<T: bytemuck::Pod>(&mut self) -> Result<Vec<T>, SyncError> {
        let count = self.read_u32()? as usize;
        let size = std::mem::size_of::<T>();
        let raw = self.take(count * size)?;
        Ok(raw
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect())
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

/// An object whose authoritative copy lives on the master node.
///
/// Per frame the master runs `pre_sync`, `encode` and `update_synced_master`;
/// a slave runs `decode` and `update_synced_slave`.
pub trait SharedState {
    fn pre_sync(&mut self) {}

    fn encode(&self, encoder: &mut SyncEncoder);

    fn decode(&mut self, decoder: &mut SyncDecoder<'_>) -> Result<(), SyncError>;

    fn update_synced_master(&mut self) {}

    fn update_synced_slave(&mut self) {}
}
