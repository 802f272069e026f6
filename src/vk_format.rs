#![allow(non_upper_case_globals)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Vulkan format tag stored in the KTX2 header.
///
/// Kept as an open `u32` so tags this crate has no name for still round-trip
/// through parse and serialize. `UNDEFINED` (0) is a legitimate value: the
/// format is then described only by the data format descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VkFormat(pub u32);

impl VkFormat {
    pub const UNDEFINED: VkFormat = VkFormat(0);
    pub const R8G8B8A8_UNORM: VkFormat = VkFormat(37);
    pub const R8G8B8A8_SRGB: VkFormat = VkFormat(43);
    pub const R16_SFLOAT: VkFormat = VkFormat(76);
    pub const BC1_RGB_UNORM_BLOCK: VkFormat = VkFormat(131);
    pub const BC1_RGB_SRGB_BLOCK: VkFormat = VkFormat(132);
    pub const BC1_RGBA_UNORM_BLOCK: VkFormat = VkFormat(133);
    pub const BC1_RGBA_SRGB_BLOCK: VkFormat = VkFormat(134);
    pub const BC2_UNORM_BLOCK: VkFormat = VkFormat(135);
    pub const BC2_SRGB_BLOCK: VkFormat = VkFormat(136);
    pub const BC3_UNORM_BLOCK: VkFormat = VkFormat(137);
    pub const BC3_SRGB_BLOCK: VkFormat = VkFormat(138);
    pub const BC4_UNORM_BLOCK: VkFormat = VkFormat(139);
    pub const BC4_SNORM_BLOCK: VkFormat = VkFormat(140);
    pub const BC5_UNORM_BLOCK: VkFormat = VkFormat(141);
    pub const BC5_SNORM_BLOCK: VkFormat = VkFormat(142);
    pub const BC6H_UFLOAT_BLOCK: VkFormat = VkFormat(143);
    pub const BC6H_SFLOAT_BLOCK: VkFormat = VkFormat(144);
    pub const BC7_UNORM_BLOCK: VkFormat = VkFormat(145);
    pub const BC7_SRGB_BLOCK: VkFormat = VkFormat(146);
    pub const ETC2_R8G8B8_UNORM_BLOCK: VkFormat = VkFormat(147);
    pub const ETC2_R8G8B8_SRGB_BLOCK: VkFormat = VkFormat(148);
    pub const ETC2_R8G8B8A1_UNORM_BLOCK: VkFormat = VkFormat(149);
    pub const ETC2_R8G8B8A1_SRGB_BLOCK: VkFormat = VkFormat(150);
    pub const ETC2_R8G8B8A8_UNORM_BLOCK: VkFormat = VkFormat(151);
    pub const ETC2_R8G8B8A8_SRGB_BLOCK: VkFormat = VkFormat(152);
    pub const EAC_R11_UNORM_BLOCK: VkFormat = VkFormat(153);
    pub const EAC_R11_SNORM_BLOCK: VkFormat = VkFormat(154);
    pub const EAC_R11G11_UNORM_BLOCK: VkFormat = VkFormat(155);
    pub const EAC_R11G11_SNORM_BLOCK: VkFormat = VkFormat(156);
    pub const ASTC_4x4_UNORM_BLOCK: VkFormat = VkFormat(157);
    pub const ASTC_4x4_SRGB_BLOCK: VkFormat = VkFormat(158);

    pub fn is_undefined(self) -> bool {
        self.0 == 0
    }

    /// Bytes per 4x4 block for the block-compressed formats named above.
    ///
    /// `None` for anything else, including undefined and uncompressed tags.
    pub fn block_bytes_4x4(self) -> Option<u32> {
        match self.0 {
            131..=134 | 139 | 140 | 147..=150 | 153 | 154 => Some(8),
            135..=138 | 141..=146 | 151 | 152 | 155..=158 => Some(16),
            _ => None,
        }
    }

    /// Floating point HDR formats, which the encoders upstream reject.
    pub fn is_hdr(self) -> bool {
        matches!(self, VkFormat::BC6H_UFLOAT_BLOCK | VkFormat::BC6H_SFLOAT_BLOCK | VkFormat::R16_SFLOAT)
    }

    /// `typeSize` header value: 1 for block-compressed data, the channel
    /// size for the few uncompressed formats listed here.
    pub fn type_size(self) -> u32 {
        match self {
            VkFormat::R16_SFLOAT => 2,
            _ => 1,
        }
    }

    fn name(self) -> Option<&'static str> {
        let name = match self {
            VkFormat::UNDEFINED => "UNDEFINED",
            VkFormat::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
            VkFormat::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
            VkFormat::R16_SFLOAT => "R16_SFLOAT",
            VkFormat::BC1_RGB_UNORM_BLOCK => "BC1_RGB_UNORM_BLOCK",
            VkFormat::BC1_RGB_SRGB_BLOCK => "BC1_RGB_SRGB_BLOCK",
            VkFormat::BC1_RGBA_UNORM_BLOCK => "BC1_RGBA_UNORM_BLOCK",
            VkFormat::BC1_RGBA_SRGB_BLOCK => "BC1_RGBA_SRGB_BLOCK",
            VkFormat::BC2_UNORM_BLOCK => "BC2_UNORM_BLOCK",
            VkFormat::BC2_SRGB_BLOCK => "BC2_SRGB_BLOCK",
            VkFormat::BC3_UNORM_BLOCK => "BC3_UNORM_BLOCK",
            VkFormat::BC3_SRGB_BLOCK => "BC3_SRGB_BLOCK",
            VkFormat::BC4_UNORM_BLOCK => "BC4_UNORM_BLOCK",
            VkFormat::BC4_SNORM_BLOCK => "BC4_SNORM_BLOCK",
            VkFormat::BC5_UNORM_BLOCK => "BC5_UNORM_BLOCK",
            VkFormat::BC5_SNORM_BLOCK => "BC5_SNORM_BLOCK",
            VkFormat::BC6H_UFLOAT_BLOCK => "BC6H_UFLOAT_BLOCK",
            VkFormat::BC6H_SFLOAT_BLOCK => "BC6H_SFLOAT_BLOCK",
            VkFormat::BC7_UNORM_BLOCK => "BC7_UNORM_BLOCK",
            VkFormat::BC7_SRGB_BLOCK => "BC7_SRGB_BLOCK",
            VkFormat::ETC2_R8G8B8_UNORM_BLOCK => "ETC2_R8G8B8_UNORM_BLOCK",
            VkFormat::ETC2_R8G8B8_SRGB_BLOCK => "ETC2_R8G8B8_SRGB_BLOCK",
            VkFormat::ETC2_R8G8B8A1_UNORM_BLOCK => "ETC2_R8G8B8A1_UNORM_BLOCK",
            VkFormat::ETC2_R8G8B8A1_SRGB_BLOCK => "ETC2_R8G8B8A1_SRGB_BLOCK",
            VkFormat::ETC2_R8G8B8A8_UNORM_BLOCK => "ETC2_R8G8B8A8_UNORM_BLOCK",
            VkFormat::ETC2_R8G8B8A8_SRGB_BLOCK => "ETC2_R8G8B8A8_SRGB_BLOCK",
            VkFormat::EAC_R11_UNORM_BLOCK => "EAC_R11_UNORM_BLOCK",
            VkFormat::EAC_R11_SNORM_BLOCK => "EAC_R11_SNORM_BLOCK",
            VkFormat::EAC_R11G11_UNORM_BLOCK => "EAC_R11G11_UNORM_BLOCK",
            VkFormat::EAC_R11G11_SNORM_BLOCK => "EAC_R11G11_SNORM_BLOCK",
            VkFormat::ASTC_4x4_UNORM_BLOCK => "ASTC_4x4_UNORM_BLOCK",
            VkFormat::ASTC_4x4_SRGB_BLOCK => "ASTC_4x4_SRGB_BLOCK",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for VkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "VK_FORMAT_{}", name),
            None => write!(f, "VkFormat({})", self.0),
        }
    }
}

impl fmt::Display for VkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// KTX2 `supercompressionScheme` header value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupercompressionScheme(pub u32);

impl SupercompressionScheme {
    pub const NONE: SupercompressionScheme = SupercompressionScheme(0);
    pub const BASIS_LZ: SupercompressionScheme = SupercompressionScheme(1);
    pub const ZSTANDARD: SupercompressionScheme = SupercompressionScheme(2);
    pub const ZLIB: SupercompressionScheme = SupercompressionScheme(3);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for SupercompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SupercompressionScheme::NONE => f.write_str("None"),
            SupercompressionScheme::BASIS_LZ => f.write_str("BasisLZ"),
            SupercompressionScheme::ZSTANDARD => f.write_str("Zstandard"),
            SupercompressionScheme::ZLIB => f.write_str("ZLIB"),
            SupercompressionScheme(other) => write!(f, "SupercompressionScheme({})", other),
        }
    }
}

impl fmt::Display for SupercompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
