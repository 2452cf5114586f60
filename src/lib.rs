//! signlens - camera-to-sign-language pipeline
//!
//! Captures frames, extracts hand landmarks through a pluggable inference
//! backend, suppresses per-user tics, and emits structured sign output for
//! avatar renderers.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod capture;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod filter;
pub mod landmarks;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod user;

// Core traits (source → process → sink)
pub use capture::{FrameHandle, FrameSource, SyntheticFrameSource};
pub use engine::{GraphModelRuntime, HandTrackerRuntime};
pub use pipeline::sink::{CollectorSink, JsonLinesSink, LiveTextSink, SignSink};

// Engine selection
pub use engine::{Backend, EngineAdapter, EngineKind, EngineStatus, InferenceResult};

// Filtering
pub use filter::{BaselineFilter, FilterOutcome};

// Data model
pub use landmarks::{Hand, HandSide, HeadPose, LandmarkPoint};
pub use output::{Mood, StructuredSignOutput};
pub use user::{SharedUserKey, UserKey};

// Pipeline
pub use pipeline::orchestrator::{FrameSubmitter, Pipeline, PipelineConfig, PipelineHandle};
pub use pipeline::types::{PipelineState, PipelineStats, SubmitOutcome};

// Profiles
pub use profile::{InMemoryProfileStore, ProfileRecord, ProfileRequest, ProfileStore};

// Error handling
pub use error::{Result, SignlensError};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_suffix_only_with_git_hash() {
        let ver = version_string();
        match option_env!("GIT_HASH") {
            Some(hash) if !hash.is_empty() => assert_eq!(ver.split('+').nth(1), Some(hash)),
            _ => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
