//! Assembles independently encoded block-compressed layers into one KTX2
//! 2D array texture.
//!
//! Each layer (a still image or a video frame) arrives as its own mip chain.
//! The layers are checked against the first one, then every mip level is
//! rebuilt with all layers stored back to back in layer order, which is the
//! layout GPUs expect for array textures.

pub mod vk_format;
pub(crate) mod header;
pub(crate) mod index;
pub(crate) mod level;
pub mod dfd;
pub mod key_value;

pub mod container;
pub mod layer;
pub mod validate;
pub mod assemble;
pub mod builder;

pub mod config;
pub mod encoder;
pub mod error;
pub mod source;
pub mod pipeline;

pub use assemble::{ArrayAssembler, BlockLayout};
pub use config::{ArrayConfig, EncoderConfig, SourceMode};
pub use container::Container;
pub use encoder::{Encoder, PrecompressedEncoder};
pub use error::{ArrayError, ConsistencyError, ContainerError, EncodeError, SourceError, UnsupportedFormatError};
pub use layer::{BaseParameters, CombinedLevel, EncodedLayer, MipLevel};
pub use pipeline::{ArrayPipeline, assemble_layers, combine_ktx2_layers};
pub use source::{FileFetcher, Fetch, LayerInput, LayerSource, ReadyFetcher};
pub use vk_format::{SupercompressionScheme, VkFormat};

#[cfg(test)]
mod tests {
    use crate::dfd::{BasicDataFormatDescriptor, DataFormatDescriptor, KHR_DF_MODEL_BC7, KHR_DF_TRANSFER_SRGB};
    use crate::{ArrayError, Container, EncodedLayer, MipLevel, SupercompressionScheme, VkFormat, combine_ktx2_layers};

    fn single_layer_file(tag: u8) -> Vec<u8> {
        let layer = EncodedLayer {
            levels: vec![MipLevel::uncompressed(vec![tag; 64]), MipLevel::uncompressed(vec![tag; 16])],
            format: VkFormat::BC7_SRGB_BLOCK,
            width: 8,
            height: 8,
            type_size: 1,
            supercompression_scheme: SupercompressionScheme::NONE,
            dfd: DataFormatDescriptor::from_basic(&BasicDataFormatDescriptor::block_4x4(
                KHR_DF_MODEL_BC7,
                KHR_DF_TRANSFER_SRGB,
                16,
            )),
            key_value: None,
        };
        crate::assemble_layers(vec![layer]).unwrap().serialize()
    }

    #[test]
    fn it_works() {
        let files: Vec<_> = (1..=3).map(single_layer_file).collect();
        let array = Container::parse(&combine_ktx2_layers(&files).unwrap()).unwrap();

        assert_eq!(array.layer_count, 3);
        assert_eq!(array.levels[0].data.len(), 3 * 64);
        assert_eq!(&array.levels[1].data[16..32], &[2u8; 16]);
    }

    #[test]
    fn oversized_header_dimensions_are_an_input_error() {
        let mut file = single_layer_file(1);
        // pixelWidth and pixelHeight follow the identifier, format and type size
        file[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
        file[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        let files = vec![file.clone(), file];

        assert!(matches!(combine_ktx2_layers(&files), Err(ArrayError::Input(_))));
    }
}
