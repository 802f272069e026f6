use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ContainerError;

pub const KHR_DF_MODEL_RGBSDA: u8 = 1;
pub const KHR_DF_MODEL_BC1A: u8 = 128;
pub const KHR_DF_MODEL_BC3: u8 = 130;
pub const KHR_DF_MODEL_BC7: u8 = 134;
pub const KHR_DF_MODEL_ETC2: u8 = 161;
pub const KHR_DF_MODEL_ASTC: u8 = 162;
pub const KHR_DF_MODEL_ETC1S: u8 = 163;
pub const KHR_DF_MODEL_UASTC: u8 = 166;

pub const KHR_DF_TRANSFER_LINEAR: u8 = 1;
pub const KHR_DF_TRANSFER_SRGB: u8 = 2;

const BASIC_BLOCK_HEADER_SIZE: usize = 24;
const SAMPLE_SIZE: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DfdSample {
    pub row_0: u32,
    pub row_1: u32,
    pub row_2: u32,
    pub row_3: u32,
}

/// Khronos basic descriptor block, kept as its raw 32-bit rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicDataFormatDescriptor {
    pub row_0: u32,
    pub row_1: u32,
    pub row_2: u32,
    pub row_3: u32,
    pub row_4: u32,
    pub row_5: u32,
    pub samples: Vec<DfdSample>,
}

impl BasicDataFormatDescriptor {
    /// Descriptor for a single-plane 4x4 block-compressed format with one
    /// sample spanning the whole block.
    pub fn block_4x4(color_model: u8, transfer_function: u8, bytes_per_block: u8) -> Self {
        let block_bits = u32::from(bytes_per_block) * 8;
        let size = (BASIC_BLOCK_HEADER_SIZE + SAMPLE_SIZE) as u32;
        BasicDataFormatDescriptor {
            row_0: 0,
            row_1: 2 | size << 16,
            // BT.709 primaries, no premultiplied alpha
            row_2: u32::from(color_model) | 1 << 8 | u32::from(transfer_function) << 16,
            row_3: 3 | 3 << 8,
            row_4: u32::from(bytes_per_block),
            row_5: 0,
            samples: vec![DfdSample {
                row_0: (block_bits.saturating_sub(1) & 0xFF) << 16,
                row_1: 0,
                row_2: 0,
                row_3: u32::MAX,
            }],
        }
    }

    pub fn color_model(&self) -> u8 {
        (self.row_2 & 0xFF) as u8
    }

    pub fn transfer_function(&self) -> u8 {
        ((self.row_2 >> 16) & 0xFF) as u8
    }

    /// Texel block width and height in pixels.
    pub fn texel_block_dimensions(&self) -> (u32, u32) {
        ((self.row_3 & 0xFF) + 1, ((self.row_3 >> 8) & 0xFF) + 1)
    }

    pub fn bytes_plane0(&self) -> u32 {
        self.row_4 & 0xFF
    }

    fn block_size(&self) -> usize {
        BASIC_BLOCK_HEADER_SIZE + SAMPLE_SIZE * self.samples.len()
    }

    fn write(&self, out: &mut Vec<u8>) {
        for row in [self.row_0, self.row_1, self.row_2, self.row_3, self.row_4, self.row_5] {
            out.extend_from_slice(&row.to_le_bytes());
        }
        for sample in &self.samples {
            out.extend_from_slice(&sample.row_0.to_le_bytes());
            out.extend_from_slice(&sample.row_1.to_le_bytes());
            out.extend_from_slice(&sample.row_2.to_le_bytes());
            out.extend_from_slice(&sample.row_3.to_le_bytes());
        }
    }
}

/// The complete data format descriptor as stored in the file, starting with
/// `dfdTotalSize`.
///
/// Layers share one descriptor, so the bytes are carried verbatim into the
/// array container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFormatDescriptor {
    bytes: Vec<u8>,
}

impl DataFormatDescriptor {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContainerError> {
        if bytes.len() < 4 {
            return Err(ContainerError::Dfd(format!("{} bytes is too short", bytes.len())));
        }
        let total = Cursor::new(&bytes[..4]).read_u32::<LittleEndian>()? as usize;
        if total != bytes.len() {
            return Err(ContainerError::Dfd(format!(
                "dfdTotalSize {} does not match block length {}",
                total,
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    pub fn from_basic(basic: &BasicDataFormatDescriptor) -> Self {
        let total = 4 + basic.block_size();
        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&(total as u32).to_le_bytes());
        basic.write(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parses the first descriptor block if it is a Khronos basic block.
    pub fn basic(&self) -> Option<BasicDataFormatDescriptor> {
        let block = self.bytes.get(4..)?;
        if block.len() < BASIC_BLOCK_HEADER_SIZE {
            return None;
        }
        let mut rdr = Cursor::new(block);
        let mut rows = [0u32; 6];
        for row in rows.iter_mut() {
            *row = rdr.read_u32::<LittleEndian>().ok()?;
        }
        // vendorId 0 (Khronos), descriptorType 0 (basic)
        if rows[0] != 0 {
            return None;
        }
        let block_size = (rows[1] >> 16) as usize;
        if block_size < BASIC_BLOCK_HEADER_SIZE || block_size > block.len() {
            return None;
        }
        let sample_count = (block_size - BASIC_BLOCK_HEADER_SIZE) / SAMPLE_SIZE;
        let mut samples = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            samples.push(DfdSample {
                row_0: rdr.read_u32::<LittleEndian>().ok()?,
                row_1: rdr.read_u32::<LittleEndian>().ok()?,
                row_2: rdr.read_u32::<LittleEndian>().ok()?,
                row_3: rdr.read_u32::<LittleEndian>().ok()?,
            });
        }
        Some(BasicDataFormatDescriptor {
            row_0: rows[0],
            row_1: rows[1],
            row_2: rows[2],
            row_3: rows[3],
            row_4: rows[4],
            row_5: rows[5],
            samples,
        })
    }

    /// Colour model of the basic block, 0 when there is none.
    pub fn color_model(&self) -> u8 {
        self.basic().map(|b| b.color_model()).unwrap_or(0)
    }
}
