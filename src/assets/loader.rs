//! Raster loading from URLs and local paths

use async_trait::async_trait;
use image::RgbaImage;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::{LoaderError, LoaderResult};

/// Images larger than this are refused before decoding
const MAX_ASSET_BYTES: usize = 10 * 1024 * 1024;

/// Loads a decoded raster for a URL or path
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage>;
}

#[async_trait]
impl<T: AssetLoader + ?Sized> AssetLoader for Arc<T> {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage> {
        (**self).load(url).await
    }
}

fn too_large(url: &str, bytes: u64) -> LoaderError {
    LoaderError::decode(url, format!("image too large ({} bytes)", bytes))
}

fn decode(url: &str, bytes: &[u8]) -> LoaderResult<RgbaImage> {
    if bytes.len() > MAX_ASSET_BYTES {
        return Err(too_large(url, bytes.len() as u64));
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| LoaderError::decode(url, e.to_string()))
}

/// Fetches images over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpAssetLoader {
    client: Client,
}

impl HttpAssetLoader {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("marker-sprites/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage> {
        debug!("Fetching asset: {}", url);
        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LoaderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                LoaderError::fetch(url, e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LoaderError::fetch(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        if let Some(length) = response.content_length() {
            if length > MAX_ASSET_BYTES as u64 {
                return Err(too_large(url, length));
            }
        }

        // Bodies without a Content-Length are capped while streaming
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LoaderError::fetch(url, e.to_string()))?
        {
            if bytes.len() + chunk.len() > MAX_ASSET_BYTES {
                return Err(too_large(url, (bytes.len() + chunk.len()) as u64));
            }
            bytes.extend_from_slice(&chunk);
        }
        decode(url, &bytes)
    }
}

/// Reads images from the local filesystem, relative paths resolved against `root`
#[derive(Debug, Clone, Default)]
pub struct FileAssetLoader {
    root: Option<PathBuf>,
}

impl FileAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl AssetLoader for FileAssetLoader {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage> {
        let path = self.resolve(url);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| LoaderError::fetch(url, format!("{}: {}", path.display(), e)))?;
        decode(url, &bytes)
    }
}

/// Dispatches `http(s)://` to the HTTP loader and everything else to the file loader
#[derive(Debug, Clone)]
pub struct RoutingAssetLoader {
    http: HttpAssetLoader,
    file: FileAssetLoader,
}

impl RoutingAssetLoader {
    pub fn new(http: HttpAssetLoader, file: FileAssetLoader) -> Self {
        Self { http, file }
    }

    pub fn from_timeout(timeout: Duration) -> Self {
        Self::new(HttpAssetLoader::new(timeout), FileAssetLoader::new())
    }
}

#[async_trait]
impl AssetLoader for RoutingAssetLoader {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.load(url).await
        } else {
            self.file.load(url).await
        }
    }
}

/// Pre-decoded rasters keyed by URL; unknown URLs fail with a fetch error
#[derive(Debug, Clone, Default)]
pub struct StaticAssetLoader {
    images: HashMap<String, Arc<RgbaImage>>,
}

impl StaticAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image<S: Into<String>>(mut self, url: S, image: RgbaImage) -> Self {
        self.images.insert(url.into(), Arc::new(image));
        self
    }
}

#[async_trait]
impl AssetLoader for StaticAssetLoader {
    async fn load(&self, url: &str) -> LoaderResult<RgbaImage> {
        self.images
            .get(url)
            .map(|image| image.as_ref().clone())
            .ok_or_else(|| LoaderError::fetch(url, "not found"))
    }
}
