//! End-to-end array assembly.
//!
//! ```text
//! items ──► LayerSource ──► ArrayAssembler ──► build ──► Container ──► bytes
//!          (fetch+encode)   (validate, copy)
//! ```
//!
//! Eager sources hand the whole layer set to the batch assembler, which
//! validates every layer before allocating. Pipelined sources push layers
//! into the streaming assembler as they arrive. Both paths copy through the
//! same [`ArrayAssembler`] and give byte-identical output.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::assemble::{ArrayAssembler, assemble};
use crate::builder::build;
use crate::config::{ArrayConfig, SourceMode};
use crate::container::Container;
use crate::encoder::Encoder;
use crate::error::ArrayError;
use crate::layer::{BaseParameters, EncodedLayer};
use crate::source::{Fetch, LayerSource};

/// Fetches, encodes and assembles an ordered list of items into one array.
pub struct ArrayPipeline<F: Fetch, E: Encoder> {
    fetcher: Arc<F>,
    encoder: Arc<E>,
    config: ArrayConfig,
}

impl<F: Fetch, E: Encoder> ArrayPipeline<F, E> {
    pub fn new(fetcher: F, encoder: E, config: ArrayConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            encoder: Arc::new(encoder),
            config,
        }
    }

    pub fn config(&self) -> &ArrayConfig {
        &self.config
    }

    /// Assembles `items` in order. The first failure aborts the whole array.
    #[instrument(skip_all, fields(layers = items.len()))]
    pub async fn assemble(&self, items: Vec<F::Item>) -> Result<Container, ArrayError> {
        if items.is_empty() {
            return Err(ArrayError::input("no layers provided"));
        }
        let layer_count = items.len();
        let mode = self.config.mode.resolve(layer_count);
        info!(layers = layer_count, mode = ?mode, "Assembling array texture");

        let mut source = LayerSource::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.encoder),
            Arc::new(self.config.encoder.clone()),
            items,
            mode,
        );

        let mut container = match mode {
            SourceMode::Eager => {
                let mut layers = Vec::with_capacity(layer_count);
                while let Some(layer) = source.next_layer().await {
                    layers.push(layer?);
                }
                assemble_layers(layers)?
            }
            SourceMode::Pipelined | SourceMode::Auto => {
                let first = match source.next_layer().await {
                    Some(layer) => layer?,
                    None => return Err(ArrayError::input("layer source produced nothing")),
                };
                let base = BaseParameters::from_layer(&first);
                let mut assembler = ArrayAssembler::new(base.clone(), layer_count)?;
                assembler.push(first)?;
                while let Some(layer) = source.next_layer().await {
                    assembler.push(layer?)?;
                }
                build(layer_count, &base, assembler.finish()?)
            }
        };

        container.key_value.extend(self.config.key_value_entries());
        Ok(container)
    }

    pub async fn assemble_to_bytes(&self, items: Vec<F::Item>) -> Result<Vec<u8>, ArrayError> {
        Ok(self.assemble(items).await?.serialize())
    }
}

/// Assembles layers that are already encoded, in the given order.
pub fn assemble_layers(layers: Vec<EncodedLayer>) -> Result<Container, ArrayError> {
    let base = match layers.first() {
        Some(first) => BaseParameters::from_layer(first),
        None => return Err(ArrayError::input("no layers provided")),
    };
    let layer_count = layers.len();
    let levels = assemble(layers, &base)?;
    Ok(build(layer_count, &base, levels))
}

/// Combines single-layer KTX2 files into one serialized array texture.
pub fn combine_ktx2_layers<B: AsRef<[u8]>>(buffers: &[B]) -> Result<Vec<u8>, ArrayError> {
    if buffers.is_empty() {
        return Err(ArrayError::input("no layers provided"));
    }
    let layers = buffers
        .iter()
        .map(|bytes| Container::parse(bytes.as_ref()).and_then(EncodedLayer::from_container))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assemble_layers(layers)?.serialize())
}
