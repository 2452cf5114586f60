//! Error types for signlens.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignlensError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Capture errors
    #[error("Frame capture failed: {message}")]
    CaptureFailed { message: String },

    // Inference engine errors
    #[error("Inference engine {engine} failed to initialize: {message}")]
    EngineInit { engine: String, message: String },

    #[error("Inference failed on {engine}: {message}")]
    EngineInference { engine: String, message: String },

    #[error("No inference engine available")]
    NoEngine,

    #[error("Inference engine not initialized")]
    EngineNotInitialized,

    // Landmark filtering errors
    #[error("Malformed landmarks: {message}")]
    MalformedLandmarks { message: String },

    // Profile store errors
    #[error("Profile not found: {username}")]
    ProfileNotFound { username: String },

    #[error("Invalid profile request: {message}")]
    ProfileInvalid { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SignlensError>;
