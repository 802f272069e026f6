//! Layer compatibility checks.
//!
//! Every layer is compared against the [`BaseParameters`] taken from layer 0.
//! The checks only read their inputs.

use crate::error::ConsistencyError;
use crate::layer::{BaseParameters, EncodedLayer};

/// Checks `layer` (at position `layer_index`) against the base parameters.
///
/// A format of 0 on either side is a wildcard: the format is then carried
/// by the data format descriptor, so it never conflicts with anything.
pub fn validate(
    layer: &EncodedLayer,
    base: &BaseParameters,
    layer_index: usize,
) -> Result<(), ConsistencyError> {
    if !base.format.is_undefined() && !layer.format.is_undefined() && base.format != layer.format {
        return Err(ConsistencyError::Format {
            layer: layer_index,
            expected: base.format,
            actual: layer.format,
        });
    }

    if layer.width != base.width || layer.height != base.height {
        return Err(ConsistencyError::Dimensions {
            layer: layer_index,
            expected_width: base.width,
            expected_height: base.height,
            actual_width: layer.width,
            actual_height: layer.height,
        });
    }

    if layer.levels.len() != base.mip_count {
        return Err(ConsistencyError::MipCount {
            layer: layer_index,
            expected: base.mip_count,
            actual: layer.levels.len(),
        });
    }

    if layer.supercompression_scheme != base.supercompression_scheme {
        return Err(ConsistencyError::Supercompression {
            layer: layer_index,
            expected: base.supercompression_scheme,
            actual: layer.supercompression_scheme,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfd::{BasicDataFormatDescriptor, DataFormatDescriptor, KHR_DF_MODEL_UASTC, KHR_DF_TRANSFER_SRGB};
    use crate::layer::MipLevel;
    use crate::vk_format::{SupercompressionScheme, VkFormat};
    use proptest::prelude::*;

    fn layer(format: VkFormat, width: u32, height: u32, mips: usize) -> EncodedLayer {
        EncodedLayer {
            levels: (0..mips).map(|_| MipLevel::uncompressed(vec![0; 16])).collect(),
            format,
            width,
            height,
            type_size: 1,
            supercompression_scheme: SupercompressionScheme::NONE,
            dfd: DataFormatDescriptor::from_basic(&BasicDataFormatDescriptor::block_4x4(
                KHR_DF_MODEL_UASTC,
                KHR_DF_TRANSFER_SRGB,
                16,
            )),
            key_value: None,
        }
    }

    #[test]
    fn accepts_matching_layer() {
        let first = layer(VkFormat::BC7_UNORM_BLOCK, 64, 64, 7);
        let base = BaseParameters::from_layer(&first);
        assert_eq!(validate(&layer(VkFormat::BC7_UNORM_BLOCK, 64, 64, 7), &base, 1), Ok(()));
    }

    #[test]
    fn rejects_height_mismatch_with_index() {
        let base = BaseParameters::from_layer(&layer(VkFormat::UNDEFINED, 512, 512, 10));
        let err = validate(&layer(VkFormat::UNDEFINED, 512, 256, 10), &base, 2).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::Dimensions {
                layer: 2,
                expected_width: 512,
                expected_height: 512,
                actual_width: 512,
                actual_height: 256,
            }
        );
    }

    #[test]
    fn rejects_mip_count_mismatch() {
        let base = BaseParameters::from_layer(&layer(VkFormat::UNDEFINED, 512, 512, 10));
        let err = validate(&layer(VkFormat::UNDEFINED, 512, 512, 9), &base, 4).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::MipCount {
                layer: 4,
                expected: 10,
                actual: 9,
            }
        );
    }

    #[test]
    fn rejects_mixed_supercompression() {
        let base = BaseParameters::from_layer(&layer(VkFormat::UNDEFINED, 16, 16, 1));
        let mut other = layer(VkFormat::UNDEFINED, 16, 16, 1);
        other.supercompression_scheme = SupercompressionScheme::ZSTANDARD;
        assert!(matches!(
            validate(&other, &base, 1),
            Err(ConsistencyError::Supercompression { layer: 1, .. })
        ));
    }

    #[test]
    fn validation_leaves_inputs_untouched() {
        let first = layer(VkFormat::BC3_UNORM_BLOCK, 32, 32, 6);
        let base = BaseParameters::from_layer(&first);
        let candidate = layer(VkFormat::BC7_UNORM_BLOCK, 32, 32, 6);
        let before = (candidate.clone(), base.clone());
        let _ = validate(&candidate, &base, 1);
        assert_eq!((candidate, base), before);
    }

    proptest! {
        #[test]
        fn undefined_format_never_conflicts(other in any::<u32>(), zero_is_base in any::<bool>()) {
            let (base_format, layer_format) = if zero_is_base {
                (VkFormat::UNDEFINED, VkFormat(other))
            } else {
                (VkFormat(other), VkFormat::UNDEFINED)
            };
            let base = BaseParameters::from_layer(&layer(base_format, 8, 8, 4));
            prop_assert_eq!(validate(&layer(layer_format, 8, 8, 4), &base, 1), Ok(()));
        }

        #[test]
        fn distinct_defined_formats_always_conflict(a in 1u32..=u32::MAX, b in 1u32..=u32::MAX) {
            prop_assume!(a != b);
            let base = BaseParameters::from_layer(&layer(VkFormat(a), 8, 8, 4));
            let is_format_error = matches!(
                validate(&layer(VkFormat(b), 8, 8, 4), &base, 3),
                Err(ConsistencyError::Format { layer: 3, .. })
            );
            prop_assert!(is_format_error);
        }
    }
}
