//! Assembly configuration.
//!
//! Settings are plain values passed into each call; nothing here is global,
//! so independent assemblies can run side by side with different settings.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ArrayError;
use crate::key_value::KeyValueData;
use crate::vk_format::SupercompressionScheme;

/// Layer count from which [`SourceMode::Auto`] switches to pipelining.
pub const PIPELINE_THRESHOLD: usize = 8;

/// Settings handed to the encoder for every layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    pub multithreaded: bool,
    pub quality_level: u32,
    pub rdo_enabled: bool,
    pub rdo_quality: f32,
    /// Source images are sRGB encoded.
    pub perceptual: bool,
    pub generate_mipmaps: bool,
    pub supercompression: SupercompressionScheme,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            multithreaded: true,
            quality_level: 128,
            rdo_enabled: false,
            rdo_quality: 1.0,
            perceptual: true,
            generate_mipmaps: true,
            supercompression: SupercompressionScheme::NONE,
        }
    }
}

/// How layers are fetched and encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Fetch and encode every item concurrently up front; layers are
    /// still handed out in item order.
    Eager,
    /// Fetch layer `i + 1` while layer `i` is encoded; one layer in memory.
    Pipelined,
    /// Pipelined from [`PIPELINE_THRESHOLD`] layers up, eager below.
    #[default]
    Auto,
}

impl SourceMode {
    pub fn resolve(self, layer_count: usize) -> SourceMode {
        match self {
            SourceMode::Auto if layer_count >= PIPELINE_THRESHOLD => SourceMode::Pipelined,
            SourceMode::Auto => SourceMode::Eager,
            mode => mode,
        }
    }
}

/// Complete configuration for one array assembly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArrayConfig {
    pub encoder: EncoderConfig,
    pub mode: SourceMode,
    /// String entries written over the base layer's key/value data.
    pub key_value_overrides: BTreeMap<String, String>,
}

impl ArrayConfig {
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_value_overrides.insert(key.into(), value.into());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArrayError> {
        serde_json::from_str(json).map_err(|e| ArrayError::input(format!("invalid configuration: {}", e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ArrayError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ArrayError::input(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Overrides as KTX2 values: UTF-8 strings with a trailing NUL.
    pub fn key_value_entries(&self) -> KeyValueData {
        self.key_value_overrides
            .iter()
            .map(|(key, value)| {
                let mut bytes = value.as_bytes().to_vec();
                bytes.push(0);
                (key.clone(), bytes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_switches_on_threshold() {
        assert_eq!(SourceMode::Auto.resolve(3), SourceMode::Eager);
        assert_eq!(SourceMode::Auto.resolve(PIPELINE_THRESHOLD), SourceMode::Pipelined);
        assert_eq!(SourceMode::Eager.resolve(1000), SourceMode::Eager);
    }

    #[test]
    fn parses_partial_json() {
        let config = ArrayConfig::from_json_str(
            r#"{
                "mode": "pipelined",
                "encoder": { "qualityLevel": 255, "supercompression": 2 },
                "keyValueOverrides": { "KTXwriter": "frames" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, SourceMode::Pipelined);
        assert_eq!(config.encoder.quality_level, 255);
        assert_eq!(config.encoder.supercompression, SupercompressionScheme::ZSTANDARD);
        assert!(config.encoder.generate_mipmaps);
        assert_eq!(config.key_value_entries()["KTXwriter"], b"frames\0".to_vec());
    }

    #[test]
    fn malformed_json_is_input_error() {
        assert!(matches!(ArrayConfig::from_json_str("{ mode: "), Err(ArrayError::Input(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("array.json");
        std::fs::write(&path, r#"{ "mode": "eager" }"#).unwrap();
        assert_eq!(ArrayConfig::from_json_file(&path).unwrap().mode, SourceMode::Eager);
    }
}
