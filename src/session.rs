//! # Reveal Session
//!
//! Orchestrates one crop generation run per game:
//! 1. **Lookup**: fetch and validate the game row
//! 2. **Fetch + decode**: download the source photograph and decode it once
//! 3. **Render**: plan all six stages and render them in parallel on the
//!    blocking pool, each from its own copy of the crop region
//! 4. **Persist**: upsert the six artifacts concurrently
//!
//! Rendering is all-or-nothing: if any stage fails, nothing is written. Writes
//! fail fast on the first storage error. A failed run may have replaced some
//! objects, but the set is never reported as published, and a retry rewrites all
//! six keys.
//!
//! The whole run is bounded by a deadline. Running out of time before the source
//! is decoded is a fetch failure; running out afterwards is a storage failure.

use std::{sync::Arc, time::Duration};

use futures_util::future::try_join_all;
use image::RgbImage;
use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, info, info_span, warn};

use crate::backends::{ArtifactStore, GameRecords, ImageFetcher};
use crate::config::config::DEFAULT_DEADLINE;
use crate::config::{GameAssetRequest, GameId};
use crate::error::{RevealError, RevealResult};
use crate::processing::{
    ARTIFACT_CONTENT_TYPE, RenderOptions, StageArtifact, StagePipeline, decode_source, plan_stages,
};

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub game_id: String,
    pub source_width: u32,
    pub source_height: u32,
    pub stages: Vec<StageReport>,
}

/// Geometry and output of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: u8,
    pub scale: f64,
    /// `[x, y, width, height]` in source pixels, before rounding.
    pub window: [f64; 4],
    pub key: String,
    pub bytes: usize,
}

/// Crop generator wired to its collaborators.
pub struct RevealSession {
    records: Arc<dyn GameRecords>,
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<dyn ArtifactStore>,
    pipeline: StagePipeline,
    deadline: Duration,
}

impl RevealSession {
    /// Create a new session using the builder pattern.
    pub fn builder() -> RevealSessionBuilder {
        RevealSessionBuilder::new()
    }

    pub fn render_options(&self) -> RenderOptions {
        self.pipeline.options()
    }

    /// Generate and store all six stage artifacts for `game_id`.
    pub async fn run(&self, game_id: &str) -> RevealResult<RunReport> {
        let game_id = GameId::parse(game_id)?;
        let span = info_span!("reveal_run", game_id = %game_id);
        self.run_inner(game_id).instrument(span).await
    }

    async fn run_inner(&self, game_id: GameId) -> RevealResult<RunReport> {
        let deadline = Instant::now() + self.deadline;
        info!("Generating crops");

        let record = timeout_at(deadline, self.records.find_game(&game_id))
            .await
            .map_err(|_| self.expired_before_decode("", "game lookup"))??
            .ok_or_else(|| RevealError::game_not_found(game_id.as_str()))?;
        let request = GameAssetRequest::from_record(game_id, record)?;

        let url = request.source_image_url.as_str();
        let bytes = timeout_at(deadline, self.fetcher.fetch(&request.source_image_url))
            .await
            .map_err(|_| self.expired_before_decode(url, "download"))??;

        let decode = tokio::task::spawn_blocking(move || decode_source(&bytes));
        let source = timeout_at(deadline, decode)
            .await
            .map_err(|_| self.expired_before_decode(url, "decode"))?
            .map_err(|e| RevealError::decode(format!("decode task failed: {}", e)))??;
        let source = Arc::new(source);
        let (width, height) = source.dimensions();
        info!(width, height, "decoded source image");

        let artifacts = timeout_at(deadline, self.render_all(&request, &source))
            .await
            .map_err(|_| self.expired_after_decode(&request.game_id, "render"))??;

        timeout_at(deadline, self.persist_all(&artifacts))
            .await
            .map_err(|_| self.expired_after_decode(&request.game_id, "persist"))??;

        let report = build_report(&request, width, height, &artifacts);
        info!(stages = report.stages.len(), "Crops generated");
        Ok(report)
    }

    /// Render every stage concurrently. Any failure abandons the whole set.
    async fn render_all(
        &self,
        request: &GameAssetRequest,
        source: &Arc<RgbImage>,
    ) -> RevealResult<Vec<StageArtifact>> {
        let (width, height) = source.dimensions();
        let plans = plan_stages(width, height, request.origin(), request.max_zoom);

        let tasks = plans.into_iter().map(|plan| {
            let source = Arc::clone(source);
            let game_id = request.game_id.clone();
            let pipeline = self.pipeline;
            async move {
                tokio::task::spawn_blocking(move || {
                    pipeline.render_stage(&game_id, &source, &plan)
                })
                .await
                .map_err(|e| {
                    RevealError::encode(
                        Some(plan.stage.get()),
                        format!("render task failed: {}", e),
                    )
                })?
            }
        });

        try_join_all(tasks).await.inspect_err(|e| {
            warn!(error = %e, "stage rendering failed, nothing was stored");
        })
    }

    /// Upsert every artifact concurrently, failing on the first write error.
    async fn persist_all(&self, artifacts: &[StageArtifact]) -> RevealResult<()> {
        let writes = artifacts.iter().map(|artifact| {
            let key = artifact.key();
            let bytes = artifact.bytes.clone();
            let stage = artifact.stage;
            async move {
                self.store
                    .upsert(&key, bytes, ARTIFACT_CONTENT_TYPE)
                    .await
                    .map_err(|e| {
                        e.with_operation("persist")
                            .with_context(format!("uploading stage {}", stage))
                    })
            }
        });
        try_join_all(writes).await.map(|_| ()).inspect_err(|e| {
            warn!(error = %e, "artifact write failed, stage set is incomplete");
        })
    }

    fn expired_before_decode(&self, url: &str, step: &str) -> RevealError {
        RevealError::fetch(
            url,
            None,
            format!("deadline of {}ms exceeded during {}", self.deadline.as_millis(), step),
        )
        .with_operation(step)
        .with_metadata("deadline_ms", self.deadline.as_millis().to_string())
    }

    fn expired_after_decode(&self, game_id: &GameId, step: &str) -> RevealError {
        RevealError::storage(
            format!("{}/", game_id),
            format!("deadline of {}ms exceeded during {}", self.deadline.as_millis(), step),
        )
        .with_operation(step)
        .with_metadata("deadline_ms", self.deadline.as_millis().to_string())
    }
}

fn build_report(
    request: &GameAssetRequest,
    width: u32,
    height: u32,
    artifacts: &[StageArtifact],
) -> RunReport {
    let plans = plan_stages(width, height, request.origin(), request.max_zoom);
    let stages = plans
        .iter()
        .zip(artifacts)
        .map(|(plan, artifact)| StageReport {
            stage: plan.stage.get(),
            scale: plan.scale,
            window: [plan.window.x, plan.window.y, plan.window.width, plan.window.height],
            key: artifact.key(),
            bytes: artifact.bytes.len(),
        })
        .collect();
    RunReport {
        game_id: request.game_id.to_string(),
        source_width: width,
        source_height: height,
        stages,
    }
}

/// Builder for creating reveal sessions with fluent API.
pub struct RevealSessionBuilder {
    records: Option<Arc<dyn GameRecords>>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    store: Option<Arc<dyn ArtifactStore>>,
    options: RenderOptions,
    deadline: Duration,
}

impl Default for RevealSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealSessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self {
            records: None,
            fetcher: None,
            store: None,
            options: RenderOptions::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Set the game-record backend.
    pub fn with_records<R: GameRecords + 'static>(mut self, records: R) -> Self {
        self.records = Some(Arc::new(records));
        self
    }

    /// Set the source image fetcher.
    pub fn with_fetcher<F: ImageFetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Set the artifact store.
    pub fn with_store<S: ArtifactStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Output canvas and JPEG quality.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Overall budget for one run.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Build the session with the configured components.
    pub fn build(self) -> RevealResult<RevealSession> {
        let records = self.records.ok_or_else(|| {
            RevealError::config("records", "<unset>", "a game record backend is required")
        })?;
        let fetcher = self.fetcher.ok_or_else(|| {
            RevealError::config("fetcher", "<unset>", "an image fetcher is required")
        })?;
        let store = self.store.ok_or_else(|| {
            RevealError::config("store", "<unset>", "an artifact store is required")
        })?;
        if self.deadline.is_zero() {
            return Err(RevealError::config("deadline", "0", "must be greater than 0"));
        }
        if self.options.target.is_empty() {
            return Err(RevealError::config(
                "canvas",
                format!("{}x{}", self.options.target.w, self.options.target.h),
                "output canvas must not be empty",
            ));
        }
        if !(1..=100).contains(&self.options.quality) {
            return Err(RevealError::config(
                "jpeg_quality",
                self.options.quality.to_string(),
                "must be between 1 and 100",
            ));
        }

        Ok(RevealSession {
            records,
            fetcher,
            store,
            pipeline: StagePipeline::new(self.options),
            deadline: self.deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{InMemoryGameRecords, MemoryStore};

    struct NoFetch;

    #[async_trait::async_trait]
    impl ImageFetcher for NoFetch {
        async fn fetch(&self, url: &reqwest::Url) -> RevealResult<bytes::Bytes> {
            Err(RevealError::fetch(url.as_str(), Some(404), "HTTP 404 Not Found"))
        }
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = RevealSession::builder().build().err().unwrap();
        assert_eq!(err.category(), "config");

        let err = RevealSession::builder()
            .with_records(InMemoryGameRecords::new())
            .with_fetcher(NoFetch)
            .with_store(MemoryStore::new())
            .with_deadline(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn test_empty_game_id_is_invalid() {
        let session = RevealSession::builder()
            .with_records(InMemoryGameRecords::new())
            .with_fetcher(NoFetch)
            .with_store(MemoryStore::new())
            .build()
            .unwrap();
        let err = session.run("  ").await.unwrap_err();
        assert_eq!(err.category(), "invalid_request");
    }
}
