//! Asset sources and the defaults-fallback loader.
//!
//! An [`AssetSource`] fetches the raw bytes behind a key from one place: a
//! resource pack directory, an HTTP mirror, or memory. The [`AssetLoader`]
//! pairs a primary source with a defaults source and retries against the
//! defaults whenever the primary cannot produce a usable asset.

use std::{
    collections::HashMap,
    future::Future,
    io,
    path::PathBuf,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::key::AssetKey;
use crate::types::{AssetKind, BlockState, Model, TextureAsset, TextureMeta};

/// Future type for source fetches. `Ok(None)` means the asset does not exist.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

/// A place assets can be fetched from.
pub trait AssetSource: Send + Sync {
    /// Fetch the bytes for `key`.
    fn fetch(&self, key: &AssetKey) -> FetchFuture<'_>;

    /// Short description for log output.
    fn describe(&self) -> String;
}

/// Reads assets from a resource pack laid out as `assets/<ns>/<path>.<ext>`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectorySource {
    fn fetch(&self, key: &AssetKey) -> FetchFuture<'_> {
        let path = self.root.join(key.file_path());
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }),
            }
        })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Fetches assets over HTTP from a mirror with the resource pack layout.
///
/// A 404 is reported as absence; any other non-success status is an error.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source rooted at `base_url`, which should end with `/`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a source with a custom HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn fetch_bytes(&self, url: String) -> Result<Option<Vec<u8>>> {
        tracing::debug!(url, "fetching");

        let response = self.http.get(&url).send().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(data.to_vec()))
    }
}

impl AssetSource for HttpSource {
    fn fetch(&self, key: &AssetKey) -> FetchFuture<'_> {
        let url = format!("{}{}", self.base_url, key.file_path());
        Box::pin(self.fetch_bytes(url))
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}

/// Serves assets from memory and records every fetch.
///
/// Useful for embedded default sets and for asserting on load order in
/// tests. Clones share the same entries and log.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    log: Arc<Mutex<Vec<String>>>,
    latency: Option<Duration>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency`, to simulate a slow network.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace the asset for `key`.
    pub fn insert(&self, key: &AssetKey, data: impl Into<Vec<u8>>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.serialize(), data.into());
    }

    /// Serialized keys of every fetch so far, in order.
    #[must_use]
    pub fn fetch_log(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of fetches for `key`.
    #[must_use]
    pub fn fetch_count(&self, key: &AssetKey) -> usize {
        let key = key.serialize();
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|k| **k == key)
            .count()
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, key: &AssetKey) -> FetchFuture<'_> {
        let key = key.serialize();
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            Ok(self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned())
        })
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

/// A value the loader knows how to build from fetched bytes.
pub trait LoadableAsset: Sized {
    /// Kind passed along in log output.
    const KIND: AssetKind;

    /// Build the value, tagging it with `key`.
    fn from_bytes(key: &AssetKey, data: Vec<u8>) -> Result<Self>;
}

impl LoadableAsset for TextureAsset {
    const KIND: AssetKind = AssetKind::Image;

    fn from_bytes(key: &AssetKey, data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            key: key.clone(),
            data: data.into(),
        })
    }
}

impl LoadableAsset for TextureMeta {
    const KIND: AssetKind = AssetKind::Meta;

    fn from_bytes(key: &AssetKey, data: Vec<u8>) -> Result<Self> {
        let mut meta: Self = parse_json(&data)?;
        meta.key = Some(key.clone());
        Ok(meta)
    }
}

impl LoadableAsset for BlockState {
    const KIND: AssetKind = AssetKind::BlockState;

    fn from_bytes(key: &AssetKey, data: Vec<u8>) -> Result<Self> {
        let mut state: Self = parse_json(&data)?;
        state.key = Some(key.clone());
        Ok(state)
    }
}

impl LoadableAsset for Model {
    const KIND: AssetKind = AssetKind::Model;

    fn from_bytes(key: &AssetKey, data: Vec<u8>) -> Result<Self> {
        let mut model: Self = parse_json(&data)?;
        model.key = Some(key.clone());
        Ok(model)
    }
}

fn parse_json<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| Error::Serialization {
        context: "asset json",
        message: e.to_string(),
    })
}

/// Loads assets from a primary source, retrying against a default set.
#[derive(Clone)]
pub struct AssetLoader {
    primary: Arc<dyn AssetSource>,
    defaults: Option<Arc<dyn AssetSource>>,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("primary", &self.primary.describe())
            .field("defaults", &self.defaults.as_ref().map(|d| d.describe()))
            .finish()
    }
}

impl AssetLoader {
    /// Loader with only a primary source.
    #[must_use]
    pub fn new(primary: Arc<dyn AssetSource>) -> Self {
        Self {
            primary,
            defaults: None,
        }
    }

    /// Loader that falls back to `defaults`.
    #[must_use]
    pub fn with_defaults(primary: Arc<dyn AssetSource>, defaults: Arc<dyn AssetSource>) -> Self {
        Self {
            primary,
            defaults: Some(defaults),
        }
    }

    /// Load `key` from the primary source, then from the defaults.
    ///
    /// Returns `None` if neither source produced a usable asset. Fetch and
    /// parse failures are logged, never returned.
    pub async fn load_or_retry_with_defaults<T: LoadableAsset>(&self, key: &AssetKey) -> Option<T> {
        if let Some(asset) = load_from(self.primary.as_ref(), key, T::KIND).await {
            return Some(asset);
        }

        let defaults = self.defaults.as_ref()?;
        tracing::debug!(%key, kind = ?T::KIND, "retrying with defaults");
        let asset = load_from(defaults.as_ref(), key, T::KIND).await;
        if asset.is_none() {
            tracing::warn!(%key, kind = ?T::KIND, "asset unavailable");
        }
        asset
    }
}

async fn load_from<T: LoadableAsset>(
    source: &dyn AssetSource,
    key: &AssetKey,
    kind: AssetKind,
) -> Option<T> {
    let result = match source.fetch(key).await {
        Ok(Some(data)) => T::from_bytes(key, data).map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    match result {
        Ok(asset) => asset,
        Err(e) => {
            tracing::warn!(%key, ?kind, source = %source.describe(), "load failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str, extension: &str) -> AssetKey {
        AssetKey::new(Some("minecraft"), path, extension).unwrap()
    }

    #[tokio::test]
    async fn test_primary_wins() {
        let primary = MemorySource::new();
        let defaults = MemorySource::new();
        let k = key("textures/block/stone", "png");
        primary.insert(&k, b"primary".to_vec());
        defaults.insert(&k, b"default".to_vec());

        let loader = AssetLoader::with_defaults(Arc::new(primary), Arc::new(defaults.clone()));
        let asset: TextureAsset = loader.load_or_retry_with_defaults(&k).await.unwrap();

        assert_eq!(&*asset.data, b"primary");
        assert_eq!(asset.key, k);
        assert!(defaults.fetch_log().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_on_missing_and_unparseable() {
        let primary = MemorySource::new();
        let defaults = MemorySource::new();
        let meta = key("textures/block/water", "png.mcmeta");
        primary.insert(&meta, b"{not json".to_vec());
        defaults.insert(&meta, br#"{"animation":{"frametime":4}}"#.to_vec());

        let loader = AssetLoader::with_defaults(Arc::new(primary), Arc::new(defaults.clone()));
        let loaded: TextureMeta = loader.load_or_retry_with_defaults(&meta).await.unwrap();
        assert_eq!(loaded.animation.unwrap().frametime, 4);
        assert_eq!(loaded.key, Some(meta.clone()));

        let missing = key("blockstates/nothing", "json");
        let state: Option<BlockState> = loader.load_or_retry_with_defaults(&missing).await;
        assert!(state.is_none());
        assert_eq!(defaults.fetch_count(&missing), 1);
    }

    #[tokio::test]
    async fn test_directory_source_layout() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("assets/minecraft/blockstates");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("stone.json"),
            br#"{"variants":{"":{"model":"block/stone"}}}"#,
        )
        .unwrap();

        let loader = AssetLoader::new(Arc::new(DirectorySource::new(root.path())));
        let k = AssetKey::parse("blockstates", "stone").unwrap();
        let state: BlockState = loader.load_or_retry_with_defaults(&k).await.unwrap();
        assert_eq!(state.default_variant().unwrap().model, "block/stone");

        let absent = AssetKey::parse("blockstates", "dirt").unwrap();
        assert!(
            loader
                .load_or_retry_with_defaults::<BlockState>(&absent)
                .await
                .is_none()
        );
    }
}
