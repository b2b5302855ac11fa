//! Shared fakes and fixtures for the reveal_crops integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::Url;
use reveal_crops::backends::{ArtifactStore, ImageFetcher, InMemoryGameRecords, MemoryStore};
use reveal_crops::config::GameRecord;
use reveal_crops::{RevealError, RevealResult, RevealSession};

pub const PHOTO_URL: &str = "https://images.test/photo.png";

/// A 120×80 image with a different color in each quadrant.
pub fn quadrant_image() -> RgbImage {
    RgbImage::from_fn(120, 80, |x, y| match (x < 60, y < 40) {
        (true, true) => Rgb([220, 30, 30]),
        (false, true) => Rgb([30, 220, 30]),
        (true, false) => Rgb([30, 30, 220]),
        (false, false) => Rgb([230, 230, 30]),
    })
}

pub fn png_bytes(image: &RgbImage) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

pub fn game(url: &str, origin: Option<&str>, max_zoom: Option<f64>) -> GameRecord {
    GameRecord {
        image_url: Some(url.to_string()),
        transform_origin: origin.map(str::to_string),
        max_zoom,
    }
}

/// Serves fixed responses per URL and counts requests.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, Result<Bytes, u16>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: Bytes) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> RevealResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.responses.get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(RevealError::fetch(
                url.as_str(),
                Some(*status),
                format!("HTTP {}", status),
            )),
            None => Err(RevealError::fetch(url.as_str(), Some(404), "HTTP 404 Not Found")),
        }
    }
}

/// Store that rejects every key containing `fail_on`.
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_on: String,
}

impl FailingStore {
    pub fn new(fail_on: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_on: fail_on.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()> {
        if key.contains(&self.fail_on) {
            return Err(RevealError::storage(key, "bucket unavailable"));
        }
        self.inner.upsert(key, bytes, content_type).await
    }
}

/// Store that waits before every write.
pub struct SlowStore {
    pub inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl ArtifactStore for SlowStore {
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(key, bytes, content_type).await
    }
}

/// Session over in-memory records, a stub fetcher and a memory store.
pub fn session(
    records: InMemoryGameRecords,
    fetcher: Arc<StubFetcher>,
    store: Arc<MemoryStore>,
) -> RevealSession {
    RevealSession::builder()
        .with_records(records)
        .with_fetcher(fetcher)
        .with_store(store)
        .build()
        .unwrap()
}
