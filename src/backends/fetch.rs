//! Source image download over HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, instrument};

use super::ImageFetcher;
use crate::error::{RevealError, RevealResult};

/// Largest source image accepted by default (50 MiB).
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 50 * 1024 * 1024;

/// Fetches images with a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: DEFAULT_MAX_SOURCE_BYTES,
        }
    }

    /// Reject bodies larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> RevealResult<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RevealError::fetch(url.as_str(), None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RevealError::fetch(
                url.as_str(),
                Some(status.as_u16()),
                format!("HTTP {}", status),
            ));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(RevealError::fetch(
                    url.as_str(),
                    Some(status.as_u16()),
                    format!("body of {} bytes exceeds limit of {}", len, self.max_bytes),
                ));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RevealError::fetch(url.as_str(), Some(status.as_u16()), e.to_string()))?;
        if body.len() > self.max_bytes {
            return Err(RevealError::fetch(
                url.as_str(),
                Some(status.as_u16()),
                format!("body of {} bytes exceeds limit of {}", body.len(), self.max_bytes),
            ));
        }

        debug!(bytes = body.len(), "fetched source image");
        Ok(body)
    }
}
