//! Combines per-layer mip chains into array levels.
//!
//! For every mip level the layers are stored back to back in layer order, so
//! layer `i` of mip `m` sits at a fixed offset a renderer can compute.
//!
//! Without supercompression each layer occupies a slot of exactly
//! `exact + pad` bytes, where `exact` is the block-aligned size of the level
//! and `pad` rounds it up to 8 bytes. Encoders may hand over oversized
//! buffers; only the first `exact` bytes are copied. Supercompressed payloads
//! are copied verbatim and packed without padding.

use tracing::{debug, instrument};

use crate::dfd::{DataFormatDescriptor, KHR_DF_MODEL_UASTC};
use crate::error::{ArrayError, ConsistencyError, UnsupportedFormatError};
use crate::layer::{BaseParameters, CombinedLevel, EncodedLayer};
use crate::validate::validate;
use crate::vk_format::VkFormat;

/// Alignment of every layer slot within a combined level.
pub const LAYER_SLOT_ALIGNMENT: usize = 8;

/// Block geometry of the array's format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    pub block_width: u32,
    pub block_height: u32,
    pub bytes_per_block: u32,
}

impl BlockLayout {
    pub const BLOCK_4X4_16: BlockLayout = BlockLayout {
        block_width: 4,
        block_height: 4,
        bytes_per_block: 16,
    };

    /// Derives the block layout from the format tag, falling back to the
    /// descriptor when the tag is undefined.
    ///
    /// Only 4x4 blocks of 16 bytes are supported. Everything else fails
    /// instead of guessing a block size.
    pub fn resolve(format: VkFormat, dfd: &DataFormatDescriptor) -> Result<BlockLayout, UnsupportedFormatError> {
        let color_model = dfd.color_model();
        let unsupported = |reason: String| UnsupportedFormatError {
            format,
            color_model,
            reason,
        };

        if format.is_hdr() {
            return Err(unsupported("HDR formats are not supported".to_string()));
        }

        match format.block_bytes_4x4() {
            Some(16) => Ok(BlockLayout::BLOCK_4X4_16),
            Some(bytes) => Err(unsupported(format!(
                "{} bytes per 4x4 block, only 16-byte blocks are supported",
                bytes
            ))),
            None if format.is_undefined() => {
                let basic = dfd
                    .basic()
                    .ok_or_else(|| unsupported("no basic data format descriptor".to_string()))?;
                if basic.color_model() == KHR_DF_MODEL_UASTC
                    && basic.texel_block_dimensions() == (4, 4)
                    && basic.bytes_plane0() == 16
                {
                    Ok(BlockLayout::BLOCK_4X4_16)
                } else {
                    Err(unsupported(format!(
                        "descriptor declares {:?} texel blocks of {} bytes",
                        basic.texel_block_dimensions(),
                        basic.bytes_plane0()
                    )))
                }
            }
            None => Err(unsupported("not a 4x4 block-compressed format".to_string())),
        }
    }

    /// Exact byte size of one layer at `level`, for a base size of
    /// `width` x `height`. `None` if the size does not fit in `usize`.
    pub fn level_size(&self, width: u32, height: u32, level: usize) -> Option<usize> {
        let (w, h) = mip_dimensions(width, height, level);
        let blocks_wide = w.div_ceil(self.block_width) as usize;
        let blocks_high = h.div_ceil(self.block_height) as usize;
        blocks_wide
            .checked_mul(blocks_high)?
            .checked_mul(self.bytes_per_block as usize)
    }
}

/// Dimensions of `level`: halved per level, never below 1.
pub fn mip_dimensions(width: u32, height: u32, level: usize) -> (u32, u32) {
    let shift = level as u32;
    (
        width.checked_shr(shift).unwrap_or(0).max(1),
        height.checked_shr(shift).unwrap_or(0).max(1),
    )
}

/// Zero bytes needed after `exact` bytes to reach the slot alignment.
pub fn slot_padding(exact: usize) -> usize {
    (LAYER_SLOT_ALIGNMENT - exact % LAYER_SLOT_ALIGNMENT) % LAYER_SLOT_ALIGNMENT
}

/// Rejects base parameters no array can be built from.
fn check_base(base: &BaseParameters) -> Result<(), ArrayError> {
    if base.width == 0 || base.height == 0 {
        return Err(ArrayError::input(format!(
            "layer 0 has degenerate dimensions {}x{}",
            base.width, base.height
        )));
    }
    if base.mip_count == 0 {
        return Err(ArrayError::input("layer 0 has no mip levels"));
    }
    Ok(())
}

/// Exact size of every level of one layer.
fn exact_level_sizes(layout: BlockLayout, base: &BaseParameters) -> Result<Vec<usize>, ArrayError> {
    (0..base.mip_count)
        .map(|m| {
            layout.level_size(base.width, base.height, m).ok_or_else(|| {
                ArrayError::input(format!(
                    "level {} of a {}x{} layer is too large to address",
                    m, base.width, base.height
                ))
            })
        })
        .collect()
}

struct LevelBuffer {
    data: Vec<u8>,
    exact: usize,
    slot: usize,
    /// Size of the packed buffer, allocated once the first layer is accepted.
    total: usize,
    uncompressed_byte_length: u64,
}

/// Streaming form of the assembler.
///
/// Layers are pushed one at a time in array order; each is validated and
/// its level bytes are copied and dropped before the call returns, so a
/// caller that never holds more than one layer keeps peak memory at the
/// output size plus one layer.
pub struct ArrayAssembler {
    base: BaseParameters,
    layout: BlockLayout,
    layer_count: usize,
    pushed: usize,
    levels: Vec<LevelBuffer>,
}

impl ArrayAssembler {
    pub fn new(base: BaseParameters, layer_count: usize) -> Result<Self, ArrayError> {
        if layer_count == 0 {
            return Err(ArrayError::input("an array needs at least one layer"));
        }
        check_base(&base)?;
        let layout = BlockLayout::resolve(base.format, &base.dfd)?;
        let packed = base.supercompression_scheme.is_none();

        let levels = exact_level_sizes(layout, &base)?
            .into_iter()
            .enumerate()
            .map(|(m, exact)| {
                let slot = exact.checked_add(slot_padding(exact));
                let total = slot.and_then(|slot| slot.checked_mul(layer_count));
                match (slot, total) {
                    (Some(slot), Some(total)) => Ok(LevelBuffer {
                        data: Vec::new(),
                        exact,
                        slot,
                        total: if packed { total } else { 0 },
                        uncompressed_byte_length: 0,
                    }),
                    _ => Err(ArrayError::input(format!(
                        "level {} of {} layers is too large to address",
                        m, layer_count
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base,
            layout,
            layer_count,
            pushed: 0,
            levels,
        })
    }

    pub fn base(&self) -> &BaseParameters {
        &self.base
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    pub fn layers_pushed(&self) -> usize {
        self.pushed
    }

    /// Validates `layer` and copies its levels into the combined buffers.
    pub fn push(&mut self, layer: EncodedLayer) -> Result<(), ArrayError> {
        let index = self.pushed;
        if index == self.layer_count {
            return Err(ArrayError::input(format!(
                "array was sized for {} layers, got another",
                self.layer_count
            )));
        }
        validate(&layer, &self.base, index)?;
        let packed = self.base.supercompression_scheme.is_none();
        if packed {
            let exact_sizes: Vec<usize> = self.levels.iter().map(|level| level.exact).collect();
            check_level_sizes(&layer, &exact_sizes, index)?;
        }

        for (m, (level, target)) in layer.levels.into_iter().zip(self.levels.iter_mut()).enumerate() {
            if packed {
                if target.data.is_empty() {
                    target.data = vec![0u8; target.total];
                }
                let offset = index * target.slot;
                assert!(
                    offset + target.slot <= target.data.len(),
                    "layer {} overruns combined level {}",
                    index,
                    m
                );
                target.data[offset..offset + target.exact].copy_from_slice(&level.data[..target.exact]);
            } else {
                target.data.extend_from_slice(&level.data);
                target.uncompressed_byte_length += level.uncompressed_byte_length;
            }
            // `level` is dropped here, releasing this layer's bytes for mip m.
        }

        self.pushed += 1;
        debug!(layer = index, total = self.layer_count, "Layer copied into array");
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<CombinedLevel>, ArrayError> {
        if self.pushed != self.layer_count {
            return Err(ArrayError::input(format!(
                "array was sized for {} layers, only {} were supplied",
                self.layer_count, self.pushed
            )));
        }

        let packed = self.base.supercompression_scheme.is_none();
        Ok(self
            .levels
            .into_iter()
            .enumerate()
            .map(|(m, level)| {
                let uncompressed_byte_length = if packed {
                    level.data.len() as u64
                } else {
                    level.uncompressed_byte_length
                };
                debug!(level = m, bytes = level.data.len(), uncompressed_byte_length, "Combined level");
                CombinedLevel {
                    data: level.data,
                    uncompressed_byte_length,
                }
            })
            .collect())
    }
}

/// Without supercompression every level must hold at least its exact size.
///
/// A shorter payload means the declared format does not describe the data
/// (for example 8-byte blocks tagged as a 16-byte format); it is reported
/// rather than re-derived from the buffer length.
fn check_level_sizes(layer: &EncodedLayer, exact_sizes: &[usize], index: usize) -> Result<(), ConsistencyError> {
    for (m, (level, &expected)) in layer.levels.iter().zip(exact_sizes).enumerate() {
        if level.data.len() < expected {
            return Err(ConsistencyError::LevelTooShort {
                layer: index,
                level: m,
                expected,
                actual: level.data.len(),
            });
        }
    }
    Ok(())
}

/// Assembles a complete set of layers.
///
/// All layers are checked before any combined buffer is allocated.
#[instrument(skip_all, fields(layers = layers.len(), mips = base.mip_count))]
pub fn assemble(layers: Vec<EncodedLayer>, base: &BaseParameters) -> Result<Vec<CombinedLevel>, ArrayError> {
    if layers.is_empty() {
        return Err(ArrayError::input("no layers provided"));
    }
    check_base(base)?;
    let layout = BlockLayout::resolve(base.format, &base.dfd)?;
    let exact_sizes = exact_level_sizes(layout, base)?;
    for (index, layer) in layers.iter().enumerate() {
        validate(layer, base, index)?;
        if base.supercompression_scheme.is_none() {
            check_level_sizes(layer, &exact_sizes, index)?;
        }
    }

    let mut assembler = ArrayAssembler::new(base.clone(), layers.len())?;
    for layer in layers {
        assembler.push(layer)?;
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfd::{BasicDataFormatDescriptor, KHR_DF_MODEL_BC7, KHR_DF_TRANSFER_LINEAR};
    use crate::layer::MipLevel;
    use crate::vk_format::SupercompressionScheme;
    use proptest::prelude::*;

    fn uastc_dfd() -> DataFormatDescriptor {
        DataFormatDescriptor::from_basic(&BasicDataFormatDescriptor::block_4x4(
            KHR_DF_MODEL_UASTC,
            KHR_DF_TRANSFER_LINEAR,
            16,
        ))
    }

    fn full_chain(width: u32, height: u32) -> usize {
        (32 - width.max(height).leading_zeros()) as usize
    }

    /// A layer whose every byte is `tag`, sized exactly for scheme none.
    fn layer(tag: u8, width: u32, height: u32, mips: usize) -> EncodedLayer {
        let layout = BlockLayout::BLOCK_4X4_16;
        EncodedLayer {
            levels: (0..mips)
                .map(|m| MipLevel::uncompressed(vec![tag; layout.level_size(width, height, m).unwrap()]))
                .collect(),
            format: VkFormat::UNDEFINED,
            width,
            height,
            type_size: 1,
            supercompression_scheme: SupercompressionScheme::NONE,
            dfd: uastc_dfd(),
            key_value: None,
        }
    }

    fn zstd_layer(tag: u8, sizes: &[usize]) -> EncodedLayer {
        EncodedLayer {
            levels: sizes
                .iter()
                .map(|&len| MipLevel::new(vec![tag; len], (len * 3) as u64))
                .collect(),
            supercompression_scheme: SupercompressionScheme::ZSTANDARD,
            ..layer(tag, 64, 64, 0)
        }
    }

    #[test]
    fn mip_size_derivation_for_1024() {
        let layout = BlockLayout::BLOCK_4X4_16;
        assert_eq!(layout.level_size(1024, 1024, 0), Some(1_048_576));
        assert_eq!(layout.level_size(1024, 1024, 1), Some(262_144));
        assert_eq!(layout.level_size(1024, 1024, 9), Some(16));
        assert_eq!(layout.level_size(1024, 1024, 10), Some(16));
        assert_eq!(full_chain(1024, 1024), 11);
    }

    #[test]
    fn non_square_dimensions_floor_at_one() {
        assert_eq!(mip_dimensions(16, 4, 3), (2, 1));
        assert_eq!(mip_dimensions(16, 4, 40), (1, 1));
        assert_eq!(BlockLayout::BLOCK_4X4_16.level_size(6, 10, 0), Some(2 * 3 * 16));
    }

    #[test]
    fn slot_padding_rounds_to_eight() {
        assert_eq!(slot_padding(16), 0);
        assert_eq!(slot_padding(20), 4);
        assert_eq!(slot_padding(7), 1);
    }

    #[test]
    fn resolves_supported_layouts() {
        let dfd = uastc_dfd();
        assert_eq!(BlockLayout::resolve(VkFormat::UNDEFINED, &dfd), Ok(BlockLayout::BLOCK_4X4_16));
        assert_eq!(BlockLayout::resolve(VkFormat::BC7_SRGB_BLOCK, &dfd), Ok(BlockLayout::BLOCK_4X4_16));
        assert_eq!(BlockLayout::resolve(VkFormat::ASTC_4x4_UNORM_BLOCK, &dfd), Ok(BlockLayout::BLOCK_4X4_16));
    }

    #[test]
    fn refuses_to_guess_other_layouts() {
        let dfd = uastc_dfd();
        assert!(BlockLayout::resolve(VkFormat::BC1_RGBA_UNORM_BLOCK, &dfd).is_err());
        assert!(BlockLayout::resolve(VkFormat::R8G8B8A8_UNORM, &dfd).is_err());
        assert!(BlockLayout::resolve(VkFormat::BC6H_UFLOAT_BLOCK, &dfd).is_err());

        let bc7_8_bytes = DataFormatDescriptor::from_basic(&BasicDataFormatDescriptor::block_4x4(
            KHR_DF_MODEL_BC7,
            KHR_DF_TRANSFER_LINEAR,
            8,
        ));
        let err = BlockLayout::resolve(VkFormat::UNDEFINED, &bc7_8_bytes).unwrap_err();
        assert_eq!(err.color_model, KHR_DF_MODEL_BC7);
    }

    #[test]
    fn scenario_four_layers_512() {
        let layers: Vec<_> = (0..4).map(|i| layer(i as u8, 512, 512, 10)).collect();
        let base = BaseParameters::from_layer(&layers[0]);
        let levels = assemble(layers, &base).unwrap();

        assert_eq!(levels.len(), 10);
        // 128 x 128 blocks of 16 bytes, already 8-byte aligned
        assert_eq!(levels[0].data.len(), 4 * 262_144);
        assert_eq!(levels[0].uncompressed_byte_length, levels[0].data.len() as u64);
        assert_eq!(levels[9].data.len(), 4 * 16);
    }

    #[test]
    fn oversized_payloads_are_trimmed() {
        let mut first = layer(1, 4, 4, 1);
        first.levels[0].data.extend_from_slice(&[0xEE; 24]);
        let second = layer(2, 4, 4, 1);
        let base = BaseParameters::from_layer(&first);

        let levels = assemble(vec![first, second], &base).unwrap();
        assert_eq!(levels[0].data.len(), 32);
        assert!(levels[0].data[..16].iter().all(|b| *b == 1));
        assert!(levels[0].data[16..].iter().all(|b| *b == 2));
    }

    #[test]
    fn short_payload_is_reported_not_corrected() {
        let first = layer(1, 8, 8, 1);
        let mut second = layer(2, 8, 8, 1);
        second.levels[0].data.truncate(32);
        let base = BaseParameters::from_layer(&first);

        let err = assemble(vec![first, second], &base).unwrap_err();
        assert!(matches!(
            err,
            ArrayError::Consistency(ConsistencyError::LevelTooShort {
                layer: 1,
                level: 0,
                expected: 64,
                actual: 32,
            })
        ));
    }

    #[test]
    fn mismatch_reports_layer_index() {
        let mut layers: Vec<_> = (0..4).map(|i| layer(i as u8, 512, 512, 10)).collect();
        layers[2] = layer(2, 512, 256, 10);
        let base = BaseParameters::from_layer(&layers[0]);

        match assemble(layers, &base) {
            Err(ArrayError::Consistency(err)) => assert_eq!(err.layer(), 2),
            other => panic!("expected consistency error, got {:?}", other.map(|l| l.len())),
        }
    }

    #[test]
    fn supercompressed_levels_are_verbatim() {
        let layers = vec![zstd_layer(1, &[30, 7]), zstd_layer(2, &[25, 9]), zstd_layer(3, &[41, 5])];
        let base = BaseParameters::from_layer(&layers[0]);
        let levels = assemble(layers, &base).unwrap();

        assert_eq!(levels[0].data.len(), 30 + 25 + 41);
        assert_eq!(levels[0].uncompressed_byte_length, 3 * (30 + 25 + 41) as u64);
        assert_eq!(levels[1].data.len(), 7 + 9 + 5);
        assert_eq!(&levels[1].data[7..16], &[2u8; 9]);
    }

    #[test]
    fn unsupported_format_fails_explicitly() {
        let mut first = layer(1, 8, 8, 1);
        first.format = VkFormat::BC1_RGB_UNORM_BLOCK;
        let base = BaseParameters::from_layer(&first);
        assert!(matches!(assemble(vec![first], &base), Err(ArrayError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        let base = BaseParameters::from_layer(&layer(0, 4, 4, 1));
        assert!(matches!(assemble(Vec::new(), &base), Err(ArrayError::Input(_))));
    }

    #[test]
    fn layers_without_levels_are_rejected() {
        let layers = vec![layer(1, 8, 8, 0), layer(2, 8, 8, 0)];
        let base = BaseParameters::from_layer(&layers[0]);
        assert!(matches!(assemble(layers, &base), Err(ArrayError::Input(_))));
        assert!(matches!(ArrayAssembler::new(base, 2), Err(ArrayError::Input(_))));
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut first = layer(1, 4, 4, 1);
        first.width = 0;
        let base = BaseParameters::from_layer(&first);
        assert!(matches!(assemble(vec![first], &base), Err(ArrayError::Input(_))));
        assert!(matches!(ArrayAssembler::new(base, 1), Err(ArrayError::Input(_))));
    }

    #[test]
    fn zero_height_is_rejected() {
        let mut first = layer(1, 4, 4, 1);
        first.height = 0;
        let base = BaseParameters::from_layer(&first);
        assert!(matches!(assemble(vec![first], &base), Err(ArrayError::Input(_))));
        assert!(matches!(ArrayAssembler::new(base, 1), Err(ArrayError::Input(_))));
    }

    #[test]
    fn level_size_reports_overflow() {
        assert_eq!(BlockLayout::BLOCK_4X4_16.level_size(u32::MAX, u32::MAX, 0), None);
        // small enough again once halved
        assert!(BlockLayout::BLOCK_4X4_16.level_size(u32::MAX, u32::MAX, 20).is_some());
    }

    #[test]
    fn oversized_dimensions_fail_before_allocation() {
        let mut first = layer(1, 8, 8, 1);
        first.width = u32::MAX;
        first.height = u32::MAX;
        let base = BaseParameters::from_layer(&first);
        assert!(matches!(assemble(vec![first], &base), Err(ArrayError::Input(_))));
        assert!(matches!(ArrayAssembler::new(base, 1), Err(ArrayError::Input(_))));
    }

    #[test]
    fn streaming_assembler_enforces_layer_count() {
        let base = BaseParameters::from_layer(&layer(0, 4, 4, 1));

        let mut assembler = ArrayAssembler::new(base.clone(), 1).unwrap();
        assembler.push(layer(0, 4, 4, 1)).unwrap();
        assert!(matches!(assembler.push(layer(1, 4, 4, 1)), Err(ArrayError::Input(_))));

        let mut short = ArrayAssembler::new(base, 2).unwrap();
        short.push(layer(0, 4, 4, 1)).unwrap();
        assert!(matches!(short.finish(), Err(ArrayError::Input(_))));
    }

    proptest! {
        #[test]
        fn packed_layers_keep_order_and_slot_size(
            width in 1u32..70,
            height in 1u32..70,
            count in 1usize..6,
        ) {
            let mips = full_chain(width, height);
            let layers: Vec<_> = (0..count).map(|i| layer(i as u8 + 1, width, height, mips)).collect();
            let base = BaseParameters::from_layer(&layers[0]);
            let levels = assemble(layers, &base).unwrap();

            for (m, level) in levels.iter().enumerate() {
                let exact = BlockLayout::BLOCK_4X4_16.level_size(width, height, m).unwrap();
                let slot = exact + (8 - exact % 8) % 8;
                prop_assert_eq!(level.data.len(), slot * count);
                for i in 0..count {
                    let layer_bytes = &level.data[i * slot..i * slot + exact];
                    prop_assert!(layer_bytes.iter().all(|b| *b == i as u8 + 1));
                }
            }
        }

        #[test]
        fn verbatim_sizes_sum(sizes in proptest::collection::vec(1usize..200, 1..8)) {
            let layers: Vec<_> = sizes.iter().enumerate().map(|(i, &s)| zstd_layer(i as u8, &[s])).collect();
            let base = BaseParameters::from_layer(&layers[0]);
            let levels = assemble(layers, &base).unwrap();

            prop_assert_eq!(levels[0].data.len(), sizes.iter().sum::<usize>());
            let mut offset = 0;
            for (i, &s) in sizes.iter().enumerate() {
                prop_assert!(level_slice_is(&levels[0].data[offset..offset + s], i as u8));
                offset += s;
            }
        }
    }

    fn level_slice_is(bytes: &[u8], tag: u8) -> bool {
        bytes.iter().all(|b| *b == tag)
    }
}
