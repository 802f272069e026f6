use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ContainerError;

pub(crate) const LEVEL_ENTRY_SIZE: usize = 24;

/// One entry of the level index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Level {
    pub byte_offset: u64,
    pub byte_length: u64,
    pub uncompressed_byte_length: u64,
}

impl Level {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.byte_offset.to_le_bytes());
        out.extend_from_slice(&self.byte_length.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_byte_length.to_le_bytes());
    }

    pub fn read(rdr: &mut Cursor<&[u8]>) -> Result<Level, ContainerError> {
        Ok(Level {
            byte_offset: rdr.read_u64::<LittleEndian>()?,
            byte_length: rdr.read_u64::<LittleEndian>()?,
            uncompressed_byte_length: rdr.read_u64::<LittleEndian>()?,
        })
    }
}
