//! Layer production.
//!
//! A [`LayerSource`] turns an ordered list of items into encoded layers,
//! always delivered in item order. Two strategies are available:
//!
//! - **Eager**: every item is fetched and encoded up front. Highest peak
//!   memory, shortest wall clock for small arrays.
//! - **Pipelined**: a one-step software pipeline. While layer `i` is being
//!   encoded the fetch of item `i + 1` runs as a separate task. Only one
//!   encoded layer is alive at a time.
//!
//! Both produce the same layers in the same order. The first failure ends the
//! source: any in-flight lookahead is aborted and later items are never
//! fetched.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{EncoderConfig, SourceMode};
use crate::encoder::Encoder;
use crate::error::{ArrayError, EncodeError, SourceError};
use crate::layer::EncodedLayer;

/// Input for one layer, before encoding.
///
/// In JSON the variant is chosen by which field is present: `rgbaPixels`
/// for raw pixels, `fileBytes` for an encoded image file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerInput {
    #[serde(rename_all = "camelCase")]
    RawPixels {
        rgba_pixels: Vec<u8>,
        width: u32,
        height: u32,
        file_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        file_bytes: Vec<u8>,
        file_name: String,
        #[serde(default)]
        extension_hint: Option<String>,
    },
}

impl LayerInput {
    pub fn file_name(&self) -> &str {
        match self {
            LayerInput::RawPixels { file_name, .. } | LayerInput::Image { file_name, .. } => file_name,
        }
    }

    /// Lower-case extension, from the hint if given, else from the name.
    pub fn extension(&self) -> Option<String> {
        let hint = match self {
            LayerInput::Image {
                extension_hint: Some(hint),
                ..
            } => Some(hint.trim_start_matches('.')),
            _ => None,
        };
        hint.or_else(|| {
            let name = self.file_name();
            name.rsplit_once('.').map(|(_, ext)| ext)
        })
        .map(str::to_ascii_lowercase)
    }

    /// Checks that the required fields are usable.
    pub fn check(&self) -> Result<(), ArrayError> {
        match self {
            LayerInput::RawPixels {
                rgba_pixels,
                width,
                height,
                file_name,
            } => {
                let expected = *width as usize * *height as usize * 4;
                if *width == 0 || *height == 0 || rgba_pixels.len() != expected {
                    return Err(ArrayError::input(format!(
                        "'{}': {} bytes of RGBA for {}x{} pixels",
                        file_name,
                        rgba_pixels.len(),
                        width,
                        height
                    )));
                }
            }
            LayerInput::Image {
                file_bytes, file_name, ..
            } => {
                if file_bytes.is_empty() {
                    return Err(ArrayError::input(format!("'{}' is empty", file_name)));
                }
            }
        }
        Ok(())
    }
}

/// Acquires the input for one item (file read, download, frame decode).
pub trait Fetch: Send + Sync + 'static {
    type Item: Send + 'static;

    fn fetch(&self, index: usize, item: Self::Item) -> impl Future<Output = Result<LayerInput, SourceError>> + Send;
}

/// Reads image files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetch for FileFetcher {
    type Item = PathBuf;

    async fn fetch(&self, index: usize, path: PathBuf) -> Result<LayerInput, SourceError> {
        let file_bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
            .map_err(|e| SourceError::new(index, e))?;

        Ok(LayerInput::Image {
            file_bytes,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            extension_hint: path.extension().map(|ext| ext.to_string_lossy().into_owned()),
        })
    }
}

/// Passes inputs that are already in memory straight through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadyFetcher;

impl Fetch for ReadyFetcher {
    type Item = LayerInput;

    async fn fetch(&self, _index: usize, item: LayerInput) -> Result<LayerInput, SourceError> {
        Ok(item)
    }
}

/// Pull-based producer of encoded layers.
pub struct LayerSource<F: Fetch, E: Encoder> {
    fetcher: Arc<F>,
    encoder: Arc<E>,
    config: Arc<EncoderConfig>,
    items: std::vec::IntoIter<F::Item>,
    total: usize,
    mode: SourceMode,
    /// Index of the next layer handed out.
    next_index: usize,
    /// Index of the next item to start fetching.
    next_fetch: usize,
    lookahead: Option<JoinHandle<Result<LayerInput, SourceError>>>,
    ready: Option<VecDeque<EncodedLayer>>,
    finished: bool,
}

impl<F: Fetch, E: Encoder> LayerSource<F, E> {
    /// `mode` must already be resolved; [`SourceMode::Auto`] is treated as
    /// pipelined.
    pub fn new(
        fetcher: Arc<F>,
        encoder: Arc<E>,
        config: Arc<EncoderConfig>,
        items: Vec<F::Item>,
        mode: SourceMode,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            config,
            total: items.len(),
            items: items.into_iter(),
            mode,
            next_index: 0,
            next_fetch: 0,
            lookahead: None,
            ready: None,
            finished: false,
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The next layer in item order, `None` once every layer was produced or
    /// after the first error.
    pub async fn next_layer(&mut self) -> Option<Result<EncodedLayer, ArrayError>> {
        if self.finished || self.next_index >= self.total {
            self.finished = true;
            return None;
        }

        let result = match self.mode {
            SourceMode::Eager => self.next_eager().await,
            SourceMode::Pipelined | SourceMode::Auto => self.next_pipelined().await,
        };

        match result {
            Ok(layer) => {
                self.next_index += 1;
                Some(Ok(layer))
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }

    async fn next_eager(&mut self) -> Result<EncodedLayer, ArrayError> {
        if self.ready.is_none() {
            let (fetcher, encoder, config) = (&self.fetcher, &self.encoder, &self.config);
            let jobs = (&mut self.items).enumerate().map(|(index, item)| {
                let fetcher = Arc::clone(fetcher);
                let encoder = Arc::clone(encoder);
                let config = Arc::clone(config);
                async move {
                    let input = fetcher.fetch(index, item).await.map_err(ArrayError::from)?;
                    debug!(layer = index, file = %input.file_name(), "Fetched layer input");
                    encode(encoder, config, index, input).await
                }
            });
            let layers = try_join_all(jobs).await?;
            self.next_fetch = self.total;
            self.ready = Some(layers.into());
        }

        self.ready
            .as_mut()
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| ArrayError::input("layer source ran out of encoded layers"))
    }

    async fn next_pipelined(&mut self) -> Result<EncodedLayer, ArrayError> {
        let index = self.next_index;
        let pending = match self.lookahead.take() {
            Some(handle) => Some(handle),
            None => self.spawn_fetch(),
        };
        let handle = pending.ok_or_else(|| ArrayError::input(format!("no item left for layer {}", index)))?;

        let input = match handle.await {
            Ok(result) => result?,
            Err(join_err) => return Err(SourceError::new(index, join_err).into()),
        };
        debug!(layer = index, file = %input.file_name(), "Fetched layer input");

        // Overlap the next fetch with this encode.
        self.lookahead = self.spawn_fetch();

        encode(Arc::clone(&self.encoder), Arc::clone(&self.config), index, input).await
    }

    fn spawn_fetch(&mut self) -> Option<JoinHandle<Result<LayerInput, SourceError>>> {
        let item = self.items.next()?;
        let index = self.next_fetch;
        self.next_fetch += 1;
        let fetcher = Arc::clone(&self.fetcher);
        Some(tokio::spawn(async move { fetcher.fetch(index, item).await }))
    }

    fn finish(&mut self) {
        self.finished = true;
        self.ready = None;
        if let Some(handle) = self.lookahead.take() {
            handle.abort();
            warn!(layer = self.next_fetch.saturating_sub(1), "Abandoned lookahead fetch");
        }
    }
}

impl<F: Fetch, E: Encoder> Drop for LayerSource<F, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.lookahead.take() {
            handle.abort();
        }
    }
}

async fn encode<E: Encoder>(
    encoder: Arc<E>,
    config: Arc<EncoderConfig>,
    index: usize,
    input: LayerInput,
) -> Result<EncodedLayer, ArrayError> {
    input.check()?;
    let file_name = input.file_name().to_string();

    let layer = tokio::task::spawn_blocking(move || encoder.encode(input, &config))
        .await
        .map_err(|join_err| EncodeError::Failed {
            file_name: file_name.clone(),
            source: anyhow::Error::new(join_err),
        })??;

    debug!(
        layer = index,
        file = %file_name,
        levels = layer.levels.len(),
        bytes = layer.levels.iter().map(|l| l.data.len()).sum::<usize>(),
        "Encoded layer"
    );
    Ok(layer)
}
