//! # Reveal Crops
//!
//! Generates the six progressively revealing crops behind a daily "guess the
//! picture" game. Stage 0 is a tight zoom on the game's focal point; each later
//! stage widens the view until stage 5 shows the whole photograph.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `config`: Service configuration and validated game requests
//! - `processing`: Stage planning plus crop, resize and JPEG encode
//! - `backends`: Game records, image download and artifact storage
//! - `session`: One full run from game id to six stored artifacts
//! - `server`: HTTP trigger around a shared session
//!
//! Pure geometry (focal point parsing, scale decay, crop windows) lives in the
//! `reveal-geometry` crate so it can be used without any I/O stack.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reveal_crops::backends::{DirectoryStore, HttpImageFetcher, InMemoryGameRecords};
//! use reveal_crops::config::GameRecord;
//! use reveal_crops::RevealSession;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = InMemoryGameRecords::new().with_game(
//!     "g1",
//!     GameRecord {
//!         image_url: Some("https://example.com/photo.jpg".to_string()),
//!         transform_origin: Some("30% 70%".to_string()),
//!         max_zoom: Some(4.0),
//!     },
//! );
//! let session = RevealSession::builder()
//!     .with_records(records)
//!     .with_fetcher(HttpImageFetcher::new(reqwest::Client::new()))
//!     .with_store(DirectoryStore::new("out"))
//!     .build()?;
//!
//! let report = session.run("g1").await?;
//! assert_eq!(report.stages.len(), 6);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod processing;
pub mod server;
pub mod session;

/// Re-export error types for convenience
pub use error::{RevealError, RevealResult, Retryable};

pub use session::{RevealSession, RevealSessionBuilder, RunReport, StageReport};

/// Re-export the geometry crate
pub use reveal_geometry as geometry;
