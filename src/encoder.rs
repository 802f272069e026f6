//! Encoder seam.
//!
//! Block compression itself lives behind [`Encoder`]; the assembler only
//! sees the resulting [`EncodedLayer`]s. [`PrecompressedEncoder`] covers the
//! case where every input is already a single-layer KTX2 file.

use anyhow::Context;
use tracing::debug;

use crate::config::EncoderConfig;
use crate::container::Container;
use crate::error::EncodeError;
use crate::header::IDENTIFIER;
use crate::layer::EncodedLayer;
use crate::source::LayerInput;

/// Turns one input image or frame into an encoded mip chain.
///
/// Implementations may use threads internally; callers run `encode` on a
/// blocking thread and treat it as one opaque step.
pub trait Encoder: Send + Sync + 'static {
    fn encode(&self, input: LayerInput, config: &EncoderConfig) -> Result<EncodedLayer, EncodeError>;
}

/// Accepts inputs that are already encoded single-layer KTX2 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecompressedEncoder;

const HDR_EXTENSIONS: [&str; 2] = ["hdr", "exr"];

impl Encoder for PrecompressedEncoder {
    fn encode(&self, input: LayerInput, config: &EncoderConfig) -> Result<EncodedLayer, EncodeError> {
        let extension = input.extension();
        let (file_bytes, file_name) = match input {
            LayerInput::Image {
                file_bytes, file_name, ..
            } => (file_bytes, file_name),
            LayerInput::RawPixels { file_name, .. } => {
                return Err(EncodeError::UnsupportedSource {
                    file_name,
                    reason: "raw pixels need a block compressor".to_string(),
                });
            }
        };

        if extension.as_deref().is_some_and(|ext| HDR_EXTENSIONS.contains(&ext)) {
            return Err(EncodeError::UnsupportedSource {
                file_name,
                reason: "HDR sources are not supported".to_string(),
            });
        }
        if !file_bytes.starts_with(&IDENTIFIER) {
            return Err(EncodeError::UnsupportedSource {
                file_name,
                reason: "not a KTX2 file".to_string(),
            });
        }

        let layer = Container::parse(&file_bytes)
            .map_err(anyhow::Error::from)
            .and_then(|container| EncodedLayer::from_container(container).map_err(anyhow::Error::from))
            .with_context(|| format!("reading {}", file_name));
        let mut layer = match layer {
            Ok(layer) => layer,
            Err(source) => return Err(EncodeError::Failed { file_name, source }),
        };

        if layer.format.is_hdr() {
            return Err(EncodeError::UnsupportedSource {
                file_name,
                reason: format!("HDR format {}", layer.format),
            });
        }
        if layer.supercompression_scheme != config.supercompression {
            return Err(EncodeError::ConfigMismatch {
                reason: format!(
                    "stored with {} supercompression, configured for {}",
                    layer.supercompression_scheme, config.supercompression
                ),
                file_name,
            });
        }
        if !config.generate_mipmaps && layer.levels.len() > 1 {
            layer.levels.truncate(1);
        }

        debug!(
            file = %file_name,
            width = layer.width,
            height = layer.height,
            levels = layer.levels.len(),
            "Loaded precompressed layer"
        );
        Ok(layer)
    }
}
