//! # Service Configuration
//!
//! Settings shared by the HTTP trigger and the one-shot CLI. Values come from
//! command-line flags with environment fallbacks (see `src/main.rs`) and are
//! validated once at startup.
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `bind_addr` | `0.0.0.0:8000` | Listen address for `serve` |
//! | `supabase_url` | none | Project URL for PostgREST records and object storage |
//! | `service_key` | none | Service-role key sent as `apikey` and bearer token |
//! | `games_table` | `daily_games` | Table holding game rows |
//! | `bucket` | `game-crops` | Storage bucket for stage artifacts |
//! | `canvas` | `retina` (600×400) | Output canvas for every stage |
//! | `jpeg_quality` | 80 | JPEG quality, 1-100 |
//! | `deadline` | 60s | Budget for one full run |
//!
//! ## Examples
//!
//! ```rust
//! use reveal_crops::config::ServiceConfig;
//!
//! let config = ServiceConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.render_options().quality, 80);
//! ```

use std::{net::SocketAddr, time::Duration};

use reveal_geometry::presets::CanvasPreset;

use crate::processing::RenderOptions;

/// Default JPEG quality for stage artifacts.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
/// Default deadline for one fetch + decode + render + persist run.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Configuration for the crop generation service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP trigger listens on.
    pub bind_addr: SocketAddr,

    /// Base URL of the Supabase project, e.g. `https://abc.supabase.co`.
    ///
    /// Required whenever game rows or artifacts go through Supabase.
    pub supabase_url: Option<String>,

    /// Service-role key used for both PostgREST and storage requests.
    pub service_key: Option<String>,

    /// Table containing `id`, `image_url`, `transform_origin`, `max_zoom`.
    pub games_table: String,

    /// Bucket receiving `{gameId}/stage_{n}.jpg` objects.
    pub bucket: String,

    /// Output canvas every stage is stretched to.
    pub canvas: CanvasPreset,

    /// JPEG quality (1 = smallest, 100 = best).
    pub jpeg_quality: u8,

    /// Overall budget for one run. Expiry fails the run, it never truncates it.
    pub deadline: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            supabase_url: None,
            service_key: None,
            games_table: "daily_games".to_string(),
            bucket: "game-crops".to_string(),
            canvas: CanvasPreset::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl ServiceConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.deadline.is_zero() {
            return Err("Deadline must be greater than 0".to_string());
        }
        if self.games_table.trim().is_empty() {
            return Err("Games table name must not be empty".to_string());
        }
        if self.bucket.trim().is_empty() {
            return Err("Bucket name must not be empty".to_string());
        }
        if let Some(url) = &self.supabase_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Supabase URL must be http(s): {}", url));
            }
        }
        Ok(())
    }

    /// `(url, key)` when both Supabase settings are present.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.service_key) {
            (Some(url), Some(key)) => Some((url.trim_end_matches('/'), key.as_str())),
            _ => None,
        }
    }

    /// Canvas and encoder settings for the stage pipeline.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            target: self.canvas.size(),
            quality: self.jpeg_quality,
        }
    }
}

/// Parse a duration string like "45", "30s", "2m" into a [`Duration`].
pub fn parse_duration(duration: &str) -> Result<Duration, String> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let Some((split, _)) = duration.char_indices().last() else {
        return Err(format!("Invalid duration format: {}", duration));
    };
    if split == 0 {
        return Err(format!("Invalid duration format: {}", duration));
    }

    let (num_str, unit) = duration.split_at(split);
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => {
            return Err(format!(
                "Invalid duration unit: {}. Use 's' for seconds, 'm' for minutes, 'h' for hours",
                unit
            ));
        }
    };
    num.checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Duration too large: {}", duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.games_table, "daily_games");
        assert_eq!(config.bucket, "game-crops");
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.canvas.size().w, 600);
        assert!(config.supabase().is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServiceConfig::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.jpeg_quality = 80;

        config.deadline = Duration::ZERO;
        assert!(config.validate().is_err());
        config.deadline = DEFAULT_DEADLINE;

        config.supabase_url = Some("ftp://nope".into());
        assert!(config.validate().is_err());
        config.supabase_url = Some("https://abc.supabase.co/".into());
        assert!(config.validate().is_ok());

        config.bucket = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_supabase_pair_trims_trailing_slash() {
        let config = ServiceConfig {
            supabase_url: Some("https://abc.supabase.co/".into()),
            service_key: Some("secret".into()),
            ..ServiceConfig::default()
        };
        assert_eq!(config.supabase(), Some(("https://abc.supabase.co", "secret")));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("x").is_err());
        assert!(parse_duration("10d").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_odd_input_without_panicking() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5é").is_err());
        assert!(parse_duration("é").is_err());
        assert!(parse_duration("10µ").is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
        assert!(parse_duration(&format!("{}m", u64::MAX / 2)).is_err());
    }
}
