//! Error types for array assembly.
//!
//! Every failure is terminal: the pipeline returns the first error it meets
//! and never a partially assembled array.

use thiserror::Error;

use crate::vk_format::{SupercompressionScheme, VkFormat};

/// Top-level error returned by the assembly pipeline.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// No layers, a malformed input, or a misused assembler.
    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormatError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl ArrayError {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        ArrayError::Input(msg.into())
    }
}

/// A layer does not match the parameters fixed by layer 0.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Layer {layer}: format mismatch (expected {expected}, got {actual})")]
    Format {
        layer: usize,
        expected: VkFormat,
        actual: VkFormat,
    },

    #[error(
        "Layer {layer}: dimension mismatch (expected {expected_width}x{expected_height}, got {actual_width}x{actual_height})"
    )]
    Dimensions {
        layer: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Layer {layer}: mip count mismatch (expected {expected}, got {actual})")]
    MipCount {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Layer {layer}: supercompression mismatch (expected {expected}, got {actual})")]
    Supercompression {
        layer: usize,
        expected: SupercompressionScheme,
        actual: SupercompressionScheme,
    },

    /// The payload is smaller than the declared block format requires.
    #[error("Layer {layer}, level {level}: payload too short (expected at least {expected} bytes, got {actual})")]
    LevelTooShort {
        layer: usize,
        level: usize,
        expected: usize,
        actual: usize,
    },
}

impl ConsistencyError {
    /// Index of the offending layer.
    pub fn layer(&self) -> usize {
        match self {
            ConsistencyError::Format { layer, .. }
            | ConsistencyError::Dimensions { layer, .. }
            | ConsistencyError::MipCount { layer, .. }
            | ConsistencyError::Supercompression { layer, .. }
            | ConsistencyError::LevelTooShort { layer, .. } => *layer,
        }
    }
}

/// The exact per-level size cannot be derived for this format.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unsupported format {format} (DFD color model {color_model}): {reason}")]
pub struct UnsupportedFormatError {
    pub format: VkFormat,
    pub color_model: u8,
    pub reason: String,
}

/// Failure reported by an [`Encoder`](crate::encoder::Encoder).
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder cannot handle this kind of input (HDR, raw pixels, ...).
    #[error("Unsupported source '{file_name}': {reason}")]
    UnsupportedSource { file_name: String, reason: String },

    /// The encoded result disagrees with the requested configuration.
    #[error("Encoder output for '{file_name}' does not match configuration: {reason}")]
    ConfigMismatch { file_name: String, reason: String },

    #[error("Encoding '{file_name}' failed: {source}")]
    Failed {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure while acquiring the input for one layer.
#[derive(Debug, Error)]
#[error("Failed to acquire layer {index}: {source}")]
pub struct SourceError {
    pub index: usize,
    #[source]
    pub source: anyhow::Error,
}

impl SourceError {
    pub fn new(index: usize, source: impl Into<anyhow::Error>) -> Self {
        Self {
            index,
            source: source.into(),
        }
    }
}

/// KTX2 wire-level failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Not a KTX2 file: bad identifier")]
    BadIdentifier,

    #[error("Truncated KTX2 data: needed {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },

    #[error("Invalid KTX2 {what} range: offset {offset}, length {length}, file size {file_size}")]
    InvalidRange {
        what: &'static str,
        offset: u64,
        length: u64,
        file_size: u64,
    },

    #[error("Malformed key/value data: {0}")]
    KeyValue(String),

    #[error("Malformed data format descriptor: {0}")]
    Dfd(String),

    #[error(
        "Expected a single-layer 2D texture, got layers={layers} faces={faces} depth={depth}"
    )]
    NotSingleLayer { layers: u32, faces: u32, depth: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
