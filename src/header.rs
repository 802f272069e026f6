use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ContainerError;
use crate::vk_format::{SupercompressionScheme, VkFormat};

pub(crate) const IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// Identifier plus the nine header words.
pub(crate) const HEADER_SIZE: usize = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub vk_format: VkFormat,
    pub type_size: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub layer_count: u32,
    pub face_count: u32,
    pub level_count: u32,
    pub supercompression_scheme: SupercompressionScheme,
}

impl Header {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&IDENTIFIER);
        for word in [
            self.vk_format.0,
            self.type_size,
            self.pixel_width,
            self.pixel_height,
            self.pixel_depth,
            self.layer_count,
            self.face_count,
            self.level_count,
            self.supercompression_scheme.0,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
    }

    pub fn read(rdr: &mut Cursor<&[u8]>) -> Result<Header, ContainerError> {
        let mut identifier = [0u8; 12];
        rdr.read_exact(&mut identifier)?;
        if identifier != IDENTIFIER {
            return Err(ContainerError::BadIdentifier);
        }

        Ok(Header {
            vk_format: VkFormat(rdr.read_u32::<LittleEndian>()?),
            type_size: rdr.read_u32::<LittleEndian>()?,
            pixel_width: rdr.read_u32::<LittleEndian>()?,
            pixel_height: rdr.read_u32::<LittleEndian>()?,
            pixel_depth: rdr.read_u32::<LittleEndian>()?,
            layer_count: rdr.read_u32::<LittleEndian>()?,
            face_count: rdr.read_u32::<LittleEndian>()?,
            level_count: rdr.read_u32::<LittleEndian>()?,
            supercompression_scheme: SupercompressionScheme(rdr.read_u32::<LittleEndian>()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_little_endian_after_identifier() {
        let header = Header {
            vk_format: VkFormat::BC7_SRGB_BLOCK,
            type_size: 1,
            pixel_width: 0x0102_0304,
            pixel_height: 512,
            pixel_depth: 0,
            layer_count: 4,
            face_count: 1,
            level_count: 10,
            supercompression_scheme: SupercompressionScheme::ZSTANDARD,
        };
        let mut out = Vec::new();
        header.write(&mut out);

        assert_eq!(out.len(), HEADER_SIZE);
        assert_eq!(&out[..12], &IDENTIFIER);
        assert_eq!(&out[20..24], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(Header::read(&mut Cursor::new(&out[..])).unwrap(), header);
    }
}
