//! Game-record lookups: PostgREST for production, an in-memory map for local
//! runs (optionally loaded from a JSON file) and tests.

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::GameRecords;
use crate::config::{GameId, GameRecord};
use crate::error::{RevealError, RevealResult};

const RECORD_COLUMNS: &str = "image_url,transform_origin,max_zoom";

/// Reads rows from a Supabase/PostgREST table.
#[derive(Clone, Debug)]
pub struct PostgrestGameRecords {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    table: String,
}

impl PostgrestGameRecords {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            table: table.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl GameRecords for PostgrestGameRecords {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn find_game(&self, game_id: &GameId) -> RevealResult<Option<GameRecord>> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("id", format!("eq.{}", game_id)),
                ("select", RECORD_COLUMNS.to_string()),
            ])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RevealError::lookup_source("request to records backend failed", e))?;

        let status = response.status();
        // PostgREST answers 400 when the id does not fit the column type
        // (e.g. "abc" against a uuid column); no such game can exist.
        if status == StatusCode::BAD_REQUEST {
            debug!(%status, "records backend rejected id");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevealError::lookup(format!("records backend returned {}: {}", status, body))
                .with_metadata("status", status.as_u16().to_string()));
        }

        let rows: Vec<GameRecord> = response
            .json()
            .await
            .map_err(|e| RevealError::lookup_source("malformed records response", e))?;
        debug!(rows = rows.len(), "records lookup complete");
        Ok(rows.into_iter().next())
    }
}

/// Game rows held in memory, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryGameRecords {
    games: HashMap<String, GameRecord>,
}

impl InMemoryGameRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one row.
    pub fn with_game(mut self, game_id: impl Into<String>, record: GameRecord) -> Self {
        self.games.insert(game_id.into(), record);
        self
    }

    /// Load rows from a JSON object mapping game id to row, e.g.
    /// `{"42": {"image_url": "https://…", "transform_origin": "30% 60%", "max_zoom": 4}}`.
    pub async fn from_json_file(path: impl AsRef<Path>) -> RevealResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| RevealError::lookup_source(format!("reading {}", path.display()), e))?;
        let games: HashMap<String, GameRecord> = serde_json::from_slice(&raw)
            .map_err(|e| RevealError::lookup_source(format!("parsing {}", path.display()), e))?;
        Ok(Self { games })
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[async_trait]
impl GameRecords for InMemoryGameRecords {
    async fn find_game(&self, game_id: &GameId) -> RevealResult<Option<GameRecord>> {
        Ok(self.games.get(game_id.as_str()).cloned())
    }
}
