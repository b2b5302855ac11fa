//! # Error Handling
//!
//! Every step of a crop run fails into one [`RevealError`] variant. The variants
//! follow the order of the pipeline, so the first failure determines the response
//! the trigger receives:
//!
//! | Variant | When | HTTP |
//! |---------|------|------|
//! | `InvalidRequest` | missing/empty game id, unusable game row | 400 |
//! | `GameNotFound` | lookup returned no row | 404 |
//! | `Lookup` | game-record backend unreachable or malformed reply | 500 |
//! | `Fetch` | source image unreachable, non-2xx, or deadline hit before decode | 502 |
//! | `Decode` | source bytes are not a usable image | 422 |
//! | `Encode` | a stage could not be resized or serialized | 500 |
//! | `Storage` | an artifact write failed, or deadline hit after decode | 500 |
//! | `Config` | service configuration rejected at startup | 500 |
//!
//! Nothing is retried internally. [`Retryable`] only tells the caller whether
//! resubmitting the same request has a chance of succeeding.
//!
//! ## Usage
//!
//! ```rust
//! use reveal_crops::error::{RevealError, Retryable};
//!
//! let error = RevealError::fetch("https://cdn.example/car.jpg", Some(404), "HTTP 404 Not Found")
//!     .with_operation("fetch_source");
//! assert_eq!(error.status_code(), 502);
//! assert!(!error.is_retryable());
//! ```

use std::{collections::HashMap, error::Error as StdError, fmt, time::SystemTime};

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The pipeline step being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Failure of a crop generation run
#[derive(Debug)]
pub enum RevealError {
    /// Request rejected before any collaborator was called
    InvalidRequest {
        field: String,
        reason: String,
        context: ErrorContext,
    },
    /// No game row for the requested id
    GameNotFound {
        game_id: String,
        context: ErrorContext,
    },
    /// Game-record backend failed
    Lookup {
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Source image could not be retrieved
    Fetch {
        url: String,
        status: Option<u16>,
        reason: String,
        context: ErrorContext,
    },
    /// Source bytes could not be decoded
    Decode {
        reason: String,
        context: ErrorContext,
    },
    /// A stage could not be resized or encoded
    Encode {
        stage: Option<u8>,
        reason: String,
        context: ErrorContext,
    },
    /// An artifact write failed
    Storage {
        key: String,
        reason: String,
        context: ErrorContext,
    },
    /// Service configuration is invalid
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
}

impl RevealError {
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn game_not_found(game_id: impl Into<String>) -> Self {
        Self::GameNotFound {
            game_id: game_id.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn lookup(reason: impl Into<String>) -> Self {
        Self::Lookup {
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Lookup failure caused by an underlying library error
    pub fn lookup_source(
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Lookup {
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    pub fn fetch(url: impl Into<String>, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            status,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn encode(stage: Option<u8>, reason: impl Into<String>) -> Self {
        Self::Encode {
            stage,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn storage(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Record the pipeline step that failed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidRequest { context, .. } => context,
            Self::GameNotFound { context, .. } => context,
            Self::Lookup { context, .. } => context,
            Self::Fetch { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Storage { context, .. } => context,
            Self::Config { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidRequest { context, .. } => context,
            Self::GameNotFound { context, .. } => context,
            Self::Lookup { context, .. } => context,
            Self::Fetch { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Storage { context, .. } => context,
            Self::Config { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::GameNotFound { .. } => "game_not_found",
            Self::Lookup { .. } => "lookup",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Storage { .. } => "storage",
            Self::Config { .. } => "config",
        }
    }

    /// HTTP status the trigger endpoint answers with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::GameNotFound { .. } => 404,
            Self::Fetch { .. } => 502,
            Self::Decode { .. } => 422,
            Self::Lookup { .. }
            | Self::Encode { .. }
            | Self::Storage { .. }
            | Self::Config { .. } => 500,
        }
    }
}

impl fmt::Display for RevealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevealError::InvalidRequest { field, reason, .. } => {
                write!(f, "Invalid request: {} {}", field, reason)
            }
            RevealError::GameNotFound { game_id, .. } => {
                write!(f, "Game not found: {}", game_id)
            }
            RevealError::Lookup { reason, source, .. } => {
                if let Some(source) = source {
                    write!(f, "Game lookup failed: {}: {}", reason, source)
                } else {
                    write!(f, "Game lookup failed: {}", reason)
                }
            }
            RevealError::Fetch { url, reason, .. } => {
                if url.is_empty() {
                    write!(f, "Failed to fetch source image: {}", reason)
                } else {
                    write!(f, "Failed to fetch source image {}: {}", url, reason)
                }
            }
            RevealError::Decode { reason, .. } => {
                write!(f, "Failed to decode source image: {}", reason)
            }
            RevealError::Encode { stage, reason, .. } => {
                if let Some(stage) = stage {
                    write!(f, "Failed to encode stage {}: {}", stage, reason)
                } else {
                    write!(f, "Failed to encode image: {}", reason)
                }
            }
            RevealError::Storage { key, reason, .. } => {
                write!(f, "Failed to store artifact '{}': {}", key, reason)
            }
            RevealError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
        }
    }
}

impl StdError for RevealError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Lookup {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type RevealResult<T> = Result<T, RevealError>;

/// Trait for errors that can be retried by resubmitting the request
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;
}

impl Retryable for RevealError {
    fn is_retryable(&self) -> bool {
        match self {
            // 4xx from the image host will not change on resubmit
            Self::Fetch {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 408 || *status == 429,
            Self::Fetch { status: None, .. } | Self::Lookup { .. } | Self::Storage { .. } => true,
            _ => false,
        }
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Errors caused by the caller's input rather than the service or its collaborators
    pub fn is_client_error(error: &RevealError) -> bool {
        (400..500).contains(&error.status_code())
    }

    /// Errors raised before any source pixels were decoded
    pub fn failed_before_decode(error: &RevealError) -> bool {
        matches!(
            error,
            RevealError::InvalidRequest { .. }
                | RevealError::GameNotFound { .. }
                | RevealError::Lookup { .. }
                | RevealError::Fetch { .. }
                | RevealError::Config { .. }
        )
    }
}
