use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ContainerError;

/// dfd/kvd/sgd offsets and lengths.
pub(crate) const INDEX_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Index {
    pub dfd_byte_offset: u32,
    pub dfd_byte_length: u32,
    pub kvd_byte_offset: u32,
    pub kvd_byte_length: u32,
    pub sgd_byte_offset: u64,
    pub sgd_byte_length: u64,
}

impl Index {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.dfd_byte_offset.to_le_bytes());
        out.extend_from_slice(&self.dfd_byte_length.to_le_bytes());
        out.extend_from_slice(&self.kvd_byte_offset.to_le_bytes());
        out.extend_from_slice(&self.kvd_byte_length.to_le_bytes());
        out.extend_from_slice(&self.sgd_byte_offset.to_le_bytes());
        out.extend_from_slice(&self.sgd_byte_length.to_le_bytes());
    }

    pub fn read(rdr: &mut Cursor<&[u8]>) -> Result<Index, ContainerError> {
        Ok(Index {
            dfd_byte_offset: rdr.read_u32::<LittleEndian>()?,
            dfd_byte_length: rdr.read_u32::<LittleEndian>()?,
            kvd_byte_offset: rdr.read_u32::<LittleEndian>()?,
            kvd_byte_length: rdr.read_u32::<LittleEndian>()?,
            sgd_byte_offset: rdr.read_u64::<LittleEndian>()?,
            sgd_byte_length: rdr.read_u64::<LittleEndian>()?,
        })
    }
}
