//! # Collaborator Backends
//!
//! The crop generator depends on three outside systems. Each is an async trait so
//! the session can be wired to Supabase in production, to local files for
//! one-off runs, and to in-memory fakes in tests.
//!
//! - [`GameRecords`]: look up a game row by id
//! - [`ImageFetcher`]: download the source photograph
//! - [`ArtifactStore`]: write stage artifacts with overwrite semantics

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::config::{GameId, GameRecord};
use crate::error::RevealResult;

pub mod fetch;
pub mod records;
pub mod storage;

pub use fetch::HttpImageFetcher;
pub use records::{InMemoryGameRecords, PostgrestGameRecords};
pub use storage::{DirectoryStore, MemoryStore, SupabaseStorage};

/// Source of game rows.
#[async_trait]
pub trait GameRecords: Send + Sync {
    /// Returns `Ok(None)` when no row exists for `game_id`.
    async fn find_game(&self, game_id: &GameId) -> RevealResult<Option<GameRecord>>;
}

/// Downloads source images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the raw bytes at `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &Url) -> RevealResult<Bytes>;
}

/// Object storage for rendered stages.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` at `key`, replacing any existing object.
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()>;
}

#[async_trait]
impl<T: GameRecords + ?Sized> GameRecords for std::sync::Arc<T> {
    async fn find_game(&self, game_id: &GameId) -> RevealResult<Option<GameRecord>> {
        (**self).find_game(game_id).await
    }
}

#[async_trait]
impl<T: ImageFetcher + ?Sized> ImageFetcher for std::sync::Arc<T> {
    async fn fetch(&self, url: &Url) -> RevealResult<Bytes> {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<T: ArtifactStore + ?Sized> ArtifactStore for std::sync::Arc<T> {
    async fn upsert(&self, key: &str, bytes: Bytes, content_type: &str) -> RevealResult<()> {
        (**self).upsert(key, bytes, content_type).await
    }
}
