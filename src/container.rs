use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;

use crate::dfd::DataFormatDescriptor;
use crate::error::ContainerError;
use crate::header::{HEADER_SIZE, Header};
use crate::index::{INDEX_SIZE, Index};
use crate::key_value::{self, KeyValueData, align_up};
use crate::layer::CombinedLevel;
use crate::level::{LEVEL_ENTRY_SIZE, Level};
use crate::vk_format::{SupercompressionScheme, VkFormat};

/// A KTX2 texture at the field level.
///
/// `levels[0]` is the full-resolution level. Each level holds all layers and
/// faces of that mip back to back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub vk_format: VkFormat,
    pub type_size: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub layer_count: u32,
    pub face_count: u32,
    pub level_count: u32,
    pub supercompression_scheme: SupercompressionScheme,
    pub levels: Vec<CombinedLevel>,
    pub dfd: DataFormatDescriptor,
    pub key_value: KeyValueData,
    pub global_data: Option<Vec<u8>>,
}

impl Container {
    fn header(&self) -> Header {
        Header {
            vk_format: self.vk_format,
            type_size: self.type_size,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            pixel_depth: self.pixel_depth,
            layer_count: self.layer_count,
            face_count: self.face_count,
            level_count: self.level_count,
            supercompression_scheme: self.supercompression_scheme,
        }
    }

    /// Alignment of each level's data within the file.
    ///
    /// Without supercompression levels start on a multiple of
    /// lcm(texel block size, 4); supercompressed levels are packed.
    fn level_alignment(&self) -> usize {
        if !self.supercompression_scheme.is_none() {
            return 1;
        }
        let block = match self.dfd.basic().map(|b| b.bytes_plane0()) {
            Some(bytes) if bytes > 0 => bytes as usize,
            _ => self.type_size.max(1) as usize,
        };
        lcm(block, 4)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let level_count = self.levels.len();
        let dfd = self.dfd.as_bytes();
        let kvd = key_value::encode(&self.key_value);
        let sgd = self.global_data.as_deref().unwrap_or(&[]);

        let mut offset = HEADER_SIZE + INDEX_SIZE + LEVEL_ENTRY_SIZE * level_count;
        let mut index = Index {
            dfd_byte_offset: offset as u32,
            dfd_byte_length: dfd.len() as u32,
            ..Index::default()
        };
        offset += dfd.len();

        if !kvd.is_empty() {
            offset = align_up(offset, 4);
            index.kvd_byte_offset = offset as u32;
            index.kvd_byte_length = kvd.len() as u32;
            offset += kvd.len();
        }
        let kvd_end = offset;

        if !sgd.is_empty() {
            offset = align_up(offset, 8);
            index.sgd_byte_offset = offset as u64;
            index.sgd_byte_length = sgd.len() as u64;
            offset += sgd.len();
        }
        let sgd_end = offset;

        // Smallest mip first in the file, level 0 last.
        let alignment = self.level_alignment();
        let mut entries = vec![
            Level {
                byte_offset: 0,
                byte_length: 0,
                uncompressed_byte_length: 0,
            };
            level_count
        ];
        for (i, level) in self.levels.iter().enumerate().rev() {
            offset = align_up(offset, alignment);
            entries[i] = Level {
                byte_offset: offset as u64,
                byte_length: level.data.len() as u64,
                uncompressed_byte_length: level.uncompressed_byte_length,
            };
            offset += level.data.len();
        }

        let mut buffer = Vec::with_capacity(offset);
        self.header().write(&mut buffer);
        index.write(&mut buffer);
        for entry in &entries {
            entry.write(&mut buffer);
        }
        buffer.extend_from_slice(dfd);
        if !kvd.is_empty() {
            buffer.resize(index.kvd_byte_offset as usize, 0);
            buffer.extend_from_slice(&kvd);
        }
        buffer.resize(kvd_end, 0);
        if !sgd.is_empty() {
            buffer.resize(index.sgd_byte_offset as usize, 0);
            buffer.extend_from_slice(sgd);
        }
        buffer.resize(sgd_end, 0);
        for (i, level) in self.levels.iter().enumerate().rev() {
            buffer.resize(entries[i].byte_offset as usize, 0);
            buffer.extend_from_slice(&level.data);
        }

        debug!(
            bytes = buffer.len(),
            levels = level_count,
            layers = self.layer_count,
            "Serialized KTX2 container"
        );
        buffer
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        let mut file = File::create(path)?;
        file.write_all(&self.serialize())?;
        Ok(())
    }

    pub fn parse(buffer: &[u8]) -> Result<Container, ContainerError> {
        let file_size = buffer.len() as u64;
        let fixed = (HEADER_SIZE + INDEX_SIZE) as u64;
        if file_size < fixed {
            return Err(ContainerError::Truncated {
                needed: fixed,
                available: file_size,
            });
        }

        let mut rdr = Cursor::new(buffer);
        let header = Header::read(&mut rdr)?;
        let index = Index::read(&mut rdr)?;

        // levelCount 0 still has one level index entry.
        let entry_count = header.level_count.max(1) as u64;
        let needed = fixed + entry_count * LEVEL_ENTRY_SIZE as u64;
        if file_size < needed {
            return Err(ContainerError::Truncated {
                needed,
                available: file_size,
            });
        }
        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            entries.push(Level::read(&mut rdr)?);
        }

        let dfd = slice(
            buffer,
            "DFD",
            u64::from(index.dfd_byte_offset),
            u64::from(index.dfd_byte_length),
        )?;
        let dfd = DataFormatDescriptor::from_bytes(dfd.to_vec())?;

        let key_value = if index.kvd_byte_length > 0 {
            key_value::decode(slice(
                buffer,
                "key/value",
                u64::from(index.kvd_byte_offset),
                u64::from(index.kvd_byte_length),
            )?)?
        } else {
            KeyValueData::new()
        };

        let global_data = if index.sgd_byte_length > 0 {
            Some(slice(buffer, "supercompression global data", index.sgd_byte_offset, index.sgd_byte_length)?.to_vec())
        } else {
            None
        };

        let mut levels = Vec::with_capacity(entries.len());
        for entry in &entries {
            let data = slice(buffer, "level", entry.byte_offset, entry.byte_length)?;
            levels.push(CombinedLevel {
                data: data.to_vec(),
                uncompressed_byte_length: entry.uncompressed_byte_length,
            });
        }

        Ok(Container {
            vk_format: header.vk_format,
            type_size: header.type_size,
            pixel_width: header.pixel_width,
            pixel_height: header.pixel_height,
            pixel_depth: header.pixel_depth,
            layer_count: header.layer_count,
            face_count: header.face_count,
            level_count: header.level_count,
            supercompression_scheme: header.supercompression_scheme,
            levels,
            dfd,
            key_value,
            global_data,
        })
    }
}

fn slice<'a>(buffer: &'a [u8], what: &'static str, offset: u64, length: u64) -> Result<&'a [u8], ContainerError> {
    let file_size = buffer.len() as u64;
    match offset.checked_add(length) {
        Some(end) if end <= file_size => Ok(&buffer[offset as usize..end as usize]),
        _ => Err(ContainerError::InvalidRange {
            what,
            offset,
            length,
            file_size,
        }),
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}
