//! Artifact stores. All of them overwrite on write, so re-running a game
//! replaces its six objects instead of adding new ones.

use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, instrument};

use super::ArtifactStore;
use crate::error::{RevealError, RevealResult};

/// Supabase Storage bucket, written through the object REST API with `x-upsert`.
#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
        }
    }

    /// Object endpoint for `key`. Each `/`-separated part of the key becomes one
    /// percent-encoded path segment, so ids containing `#`, `?` or `%` stay in the path.
    fn object_url(&self, key: &str) -> RevealResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            RevealError::storage(key, format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                RevealError::storage(key, format!("base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["storage", "v1", "object", self.bucket.as_str()])
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ArtifactStore for SupabaseStorage {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()> {
        let response = self
            .client
            .post(self.object_url(key)?)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "max-age=3600")
            .body(bytes)
            .send()
            .await
            .map_err(|e| RevealError::storage(key, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevealError::storage(key, format!("HTTP {}: {}", status, body))
                .with_metadata("status", status.as_u16().to_string()));
        }
        debug!(%status, "stored artifact");
        Ok(())
    }
}

/// Writes artifacts under a local directory, one file per key.
///
/// Each write goes to a temporary file in the target directory and is renamed
/// into place, so readers never observe a half-written image.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ArtifactStore for DirectoryStore {
    async fn upsert(&self, key: &str, bytes: Bytes, _content_type: &str) -> RevealResult<()> {
        let path = self.path_for(key);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
            .await
            .map_err(|e| RevealError::storage(key, format!("write task failed: {}", e)))?
            .map_err(|e| RevealError::storage(key, format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "stored artifact");
        Ok(())
    }
}

/// In-memory store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).map(|(bytes, _)| bytes.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|(_, ct)| ct.clone())
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total number of `upsert` calls, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Bytes, String)>> {
        // A poisoned map still holds consistent entries; each insert is atomic.
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }
}
