//! TOML-based configuration for TradeLens.
//!
//! Example `tradelens.toml`:
//! ```toml
//! [graph]
//! path = "./data/schema-graph.db"
//! timeout_ms = 250
//!
//! [scoring]
//! graph_keyword_factor = 0.4
//! memory_keyword_factor = 0.5
//! relationship_boost = 0.2
//! aggregation_boost = 0.3
//! time_boost = 0.2
//! max_suggested_columns = 5
//! max_suggestions = 5
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TRADELENS_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "tradelens.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub scoring: ScoringSettings,
}

/// Persistent graph store settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphSettings {
    /// SQLite file holding the schema graph. `None` means in-memory scoring only.
    pub path: Option<PathBuf>,

    /// Busy timeout for graph store queries, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout_ms: 250,
        }
    }
}

impl GraphSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Weights and limits used by the relevance scorer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Keyword contribution when the graph store supplies adjacency.
    pub graph_keyword_factor: f64,

    /// Keyword contribution on the in-memory backend.
    pub memory_keyword_factor: f64,

    /// Flat boost for each one-hop neighbour of a scored table.
    pub relationship_boost: f64,

    /// Boost for the fact table when the query asks for an aggregate.
    pub aggregation_boost: f64,

    /// Boost for the time dimension when the query has a time context.
    pub time_boost: f64,

    pub max_suggested_columns: usize,

    pub max_suggestions: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            graph_keyword_factor: 0.4,
            memory_keyword_factor: 0.5,
            relationship_boost: 0.2,
            aggregation_boost: 0.3,
            time_boost: 0.2,
            max_suggested_columns: 5,
            max_suggestions: 5,
        }
    }
}

impl ScoringSettings {
    /// Check every factor and boost is in `[0, 1]` and limits are non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("graph_keyword_factor", self.graph_keyword_factor),
            ("memory_keyword_factor", self.memory_keyword_factor),
            ("relationship_boost", self.relationship_boost),
            ("aggregation_boost", self.aggregation_boost),
            ("time_boost", self.time_boost),
        ];
        for (key, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    key: format!("scoring.{key}"),
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }

        let limits = [
            ("max_suggested_columns", self.max_suggested_columns),
            ("max_suggestions", self.max_suggestions),
        ];
        for (key, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: format!("scoring.{key}"),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.scoring.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if `path` does not exist, or any
    /// error from [`Settings::from_toml_str`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TRADELENS_CONFIG`
    /// 2. `./tradelens.toml`
    ///
    /// Falls back to defaults when neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a located file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::from_file(&local);
        }

        Ok(Settings::default())
    }
}
