//! # Game Asset Requests
//!
//! A game row arrives from the records backend with loosely typed, optional
//! columns. [`GameAssetRequest::from_record`] turns it into a fixed structure with
//! required fields checked and defaults applied, so nothing downstream deals with
//! missing values.

use std::fmt;

use reqwest::Url;
use reveal_geometry::origin::{DEFAULT_ORIGIN, NormalizedOrigin, parse_origin};
use serde::{Deserialize, Serialize};

use crate::error::{RevealError, RevealResult};

/// Zoom applied when a row has no usable `max_zoom`.
pub const DEFAULT_MAX_ZOOM: f64 = 5.0;

/// Opaque, non-empty game identifier.
///
/// Identifiers become the first segment of every storage key, so path separators
/// and dot segments are rejected up front.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GameId(String);

impl GameId {
    pub fn parse(raw: &str) -> RevealResult<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(RevealError::invalid_request("gameId", "is missing"));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) || id.chars().any(char::is_control) {
            return Err(RevealError::invalid_request(
                "gameId",
                format!("contains characters not allowed in a storage path: {:?}", id),
            ));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw game row as stored by the records backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRecord {
    pub image_url: Option<String>,
    pub transform_origin: Option<String>,
    pub max_zoom: Option<f64>,
}

/// Validated parameters for one crop generation run.
#[derive(Clone, Debug, PartialEq)]
pub struct GameAssetRequest {
    pub game_id: GameId,
    pub source_image_url: Url,
    pub transform_origin: String,
    pub max_zoom: f64,
}

impl GameAssetRequest {
    /// Validate a game row and apply defaults.
    ///
    /// - `image_url` is required and must be an absolute http(s) URL.
    /// - an absent or blank `transform_origin` becomes `"50% 50%"`.
    /// - an absent or zero `max_zoom` becomes 5; negative or non-finite values
    ///   are rejected.
    pub fn from_record(game_id: GameId, record: GameRecord) -> RevealResult<Self> {
        let raw_url = record
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RevealError::invalid_request("image_url", "is missing"))?;
        let source_image_url = Url::parse(raw_url).map_err(|e| {
            RevealError::invalid_request("image_url", format!("is not a valid URL: {}", e))
        })?;
        if !matches!(source_image_url.scheme(), "http" | "https") {
            return Err(RevealError::invalid_request(
                "image_url",
                format!("must use http or https, got {}", source_image_url.scheme()),
            ));
        }

        let transform_origin = record
            .transform_origin
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());

        let max_zoom = match record.max_zoom {
            None => DEFAULT_MAX_ZOOM,
            Some(z) if z == 0.0 => DEFAULT_MAX_ZOOM,
            Some(z) if z.is_finite() && z > 0.0 => z,
            Some(z) => {
                return Err(RevealError::invalid_request(
                    "max_zoom",
                    format!("must be a positive number, got {}", z),
                ));
            }
        };

        Ok(Self {
            game_id,
            source_image_url,
            transform_origin,
            max_zoom,
        })
    }

    /// Focal point derived from `transform_origin`.
    pub fn origin(&self) -> NormalizedOrigin {
        parse_origin(&self.transform_origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> GameId {
        GameId::parse("game-42").unwrap()
    }

    fn record(url: &str) -> GameRecord {
        GameRecord {
            image_url: Some(url.to_string()),
            ..GameRecord::default()
        }
    }

    #[test]
    fn test_game_id_validation() {
        assert_eq!(GameId::parse("  abc ").unwrap().as_str(), "abc");
        assert!(matches!(GameId::parse(""), Err(RevealError::InvalidRequest { .. })));
        assert!(matches!(GameId::parse("   "), Err(RevealError::InvalidRequest { .. })));
        assert!(GameId::parse("a/b").is_err());
        assert!(GameId::parse("..").is_err());
        assert!(GameId::parse("a\\b").is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let req =
            GameAssetRequest::from_record(id(), record("https://cdn.example/car.jpg")).unwrap();
        assert_eq!(req.transform_origin, "50% 50%");
        assert_eq!(req.max_zoom, 5.0);
        assert_eq!(req.origin(), NormalizedOrigin::CENTER);
    }

    #[test]
    fn test_zero_zoom_and_blank_origin_use_defaults() {
        let rec = GameRecord {
            image_url: Some("http://cdn.example/a.png".into()),
            transform_origin: Some("   ".into()),
            max_zoom: Some(0.0),
        };
        let req = GameAssetRequest::from_record(id(), rec).unwrap();
        assert_eq!(req.max_zoom, 5.0);
        assert_eq!(req.transform_origin, "50% 50%");
    }

    #[test]
    fn test_explicit_values_kept() {
        let rec = GameRecord {
            image_url: Some("https://cdn.example/a.jpg".into()),
            transform_origin: Some("20% 80%".into()),
            max_zoom: Some(3.5),
        };
        let req = GameAssetRequest::from_record(id(), rec).unwrap();
        assert_eq!(req.max_zoom, 3.5);
        assert_eq!(req.origin(), NormalizedOrigin::new(0.2, 0.8));
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(GameAssetRequest::from_record(id(), GameRecord::default()).is_err());
        assert!(GameAssetRequest::from_record(id(), record("not a url")).is_err());
        assert!(GameAssetRequest::from_record(id(), record("file:///etc/passwd")).is_err());

        let negative = GameRecord {
            max_zoom: Some(-2.0),
            ..record("https://cdn.example/a.jpg")
        };
        assert!(GameAssetRequest::from_record(id(), negative).is_err());
    }

    #[test]
    fn test_record_deserializes_with_extra_columns() {
        let rec: GameRecord = serde_json::from_str(
            r#"{"id": 7, "image_url": "https://x/y.jpg", "max_zoom": null, "answer": "Miata"}"#,
        )
        .unwrap();
        assert_eq!(rec.image_url.as_deref(), Some("https://x/y.jpg"));
        assert_eq!(rec.max_zoom, None);
        assert_eq!(rec.transform_origin, None);
    }
}
