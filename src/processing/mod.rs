//! # Processing Module
//!
//! Stage planning, rendering and encoding.

pub mod processing;

// Re-export commonly used types for convenience
pub use processing::{
    ARTIFACT_CONTENT_TYPE, RenderOptions, StageArtifact, StagePipeline, StagePlan, artifact_key,
    decode_source, plan_stages,
};
