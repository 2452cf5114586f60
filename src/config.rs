use crate::defaults;
use crate::engine::{EngineKind, TrackerOptions};
use crate::error::SignlensError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
}

/// Frame capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    pub width: u32,
    pub height: u32,
}

/// Inference engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Backends to try, in priority order.
    pub order: Vec<EngineKind>,
    pub max_hands: u32,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub graph_model_path: String,
    pub graph_input_size: u32,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// User key when nobody is signed in.
    pub default_user: String,
    pub pretty_json: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::FRAME_INTERVAL_MS,
            width: defaults::FRAME_WIDTH,
            height: defaults::FRAME_HEIGHT,
        }
    }
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order: EngineKind::ALL.to_vec(),
            max_hands: defaults::MAX_HANDS,
            model_complexity: defaults::MODEL_COMPLEXITY,
            min_detection_confidence: defaults::MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: defaults::MIN_TRACKING_CONFIDENCE,
            graph_model_path: defaults::GRAPH_MODEL_PATH.to_string(),
            graph_input_size: defaults::GRAPH_INPUT_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            max_num_hands: self.max_hands,
            model_complexity: self.model_complexity,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_user: defaults::GUEST_USER.to_string(),
            pretty_json: false,
        }
    }
}

/// Parse a comma-separated engine order such as `"graph,hand_tracker"`.
pub fn parse_engine_order(value: &str) -> Result<Vec<EngineKind>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn invalid(key: &str, message: impl Into<String>) -> SignlensError {
    SignlensError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file is missing.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SIGNLENS_ENGINE → engine.order (comma-separated)
    /// - SIGNLENS_USER → output.default_user
    /// - SIGNLENS_INTERVAL_MS → capture.interval_ms
    ///
    /// Empty values are ignored; unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(order) = std::env::var("SIGNLENS_ENGINE")
            && !order.trim().is_empty()
        {
            match parse_engine_order(&order) {
                Ok(kinds) => self.engine.order = kinds,
                Err(e) => warn!(value = %order, "Ignoring SIGNLENS_ENGINE: {e}"),
            }
        }

        if let Ok(user) = std::env::var("SIGNLENS_USER")
            && !user.trim().is_empty()
        {
            self.output.default_user = user;
        }

        if let Ok(interval) = std::env::var("SIGNLENS_INTERVAL_MS")
            && !interval.is_empty()
        {
            match interval.trim().parse() {
                Ok(ms) => self.capture.interval_ms = ms,
                Err(e) => warn!(value = %interval, "Ignoring SIGNLENS_INTERVAL_MS: {e}"),
            }
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.capture.interval_ms == 0 {
            return Err(invalid("capture.interval_ms", "must be positive"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(invalid("capture.width/height", "must be positive"));
        }
        if self.engine.order.is_empty() {
            return Err(invalid("engine.order", "must name at least one engine"));
        }
        for (i, kind) in self.engine.order.iter().enumerate() {
            if self.engine.order[..i].contains(kind) {
                return Err(invalid("engine.order", format!("'{kind}' listed twice")));
            }
        }
        if self.engine.max_hands == 0 {
            return Err(invalid("engine.max_hands", "must be at least 1"));
        }
        if self.engine.model_complexity > 2 {
            return Err(invalid("engine.model_complexity", "must be 0, 1 or 2"));
        }
        for (key, value) in [
            ("engine.min_detection_confidence", self.engine.min_detection_confidence),
            ("engine.min_tracking_confidence", self.engine.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, "must be between 0 and 1"));
            }
        }
        if self.engine.graph_input_size == 0 {
            return Err(invalid("engine.graph_input_size", "must be positive"));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/signlens/config.toml on Linux
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dir.join("signlens").join("config.toml"))
    }
}
