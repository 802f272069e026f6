//! Per-layer and combined level data.

use crate::dfd::DataFormatDescriptor;
use crate::error::ContainerError;
use crate::key_value::KeyValueData;
use crate::container::Container;
use crate::vk_format::{SupercompressionScheme, VkFormat};

/// One mip level of one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub data: Vec<u8>,
    /// Size before the layer's supercompression scheme was applied. For
    /// scheme none this is the block-aligned size of the level.
    pub uncompressed_byte_length: u64,
}

impl MipLevel {
    pub fn new(data: Vec<u8>, uncompressed_byte_length: u64) -> Self {
        Self {
            data,
            uncompressed_byte_length,
        }
    }

    /// A level stored without supercompression.
    pub fn uncompressed(data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        Self::new(data, len)
    }
}

/// One mip level holding every layer, layer 0 first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinedLevel {
    pub data: Vec<u8>,
    pub uncompressed_byte_length: u64,
}

/// One encoded image or video frame.
///
/// Produced once by an encoder and never mutated afterwards; the assembler
/// takes it by value and drops each level's bytes as soon as they have been
/// copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedLayer {
    /// Level 0 is full resolution.
    pub levels: Vec<MipLevel>,
    pub format: VkFormat,
    pub width: u32,
    pub height: u32,
    pub type_size: u32,
    pub supercompression_scheme: SupercompressionScheme,
    pub dfd: DataFormatDescriptor,
    pub key_value: Option<KeyValueData>,
}

impl EncodedLayer {
    /// Extracts the layer stored in a single-layer 2D KTX2 container.
    pub fn from_container(container: Container) -> Result<EncodedLayer, ContainerError> {
        if container.layer_count > 1 || container.face_count != 1 || container.pixel_depth != 0 {
            return Err(ContainerError::NotSingleLayer {
                layers: container.layer_count,
                faces: container.face_count,
                depth: container.pixel_depth,
            });
        }

        let levels = container
            .levels
            .into_iter()
            .map(|level| MipLevel::new(level.data, level.uncompressed_byte_length))
            .collect();

        Ok(EncodedLayer {
            levels,
            format: container.vk_format,
            width: container.pixel_width,
            height: container.pixel_height,
            type_size: container.type_size,
            supercompression_scheme: container.supercompression_scheme,
            dfd: container.dfd,
            key_value: Some(container.key_value),
        })
    }

    pub fn mip_count(&self) -> usize {
        self.levels.len()
    }
}

/// The contract fixed by the first layer of an array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseParameters {
    pub format: VkFormat,
    pub width: u32,
    pub height: u32,
    pub supercompression_scheme: SupercompressionScheme,
    pub key_value: Option<KeyValueData>,
    pub type_size: u32,
    pub mip_count: usize,
    pub dfd: DataFormatDescriptor,
}

impl BaseParameters {
    pub fn from_layer(layer: &EncodedLayer) -> Self {
        Self {
            format: layer.format,
            width: layer.width,
            height: layer.height,
            supercompression_scheme: layer.supercompression_scheme,
            key_value: layer.key_value.clone(),
            type_size: layer.type_size,
            mip_count: layer.levels.len(),
            dfd: layer.dfd.clone(),
        }
    }
}
