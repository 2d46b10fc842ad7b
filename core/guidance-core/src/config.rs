//! Tunable constants for search, scheduling and accuracy gating.
//!
//! Every field has a default, so a missing file or a partial TOML document is
//! fine. Loaded from `~/.smokearrow/guidance.toml` unless a path is given.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GuidanceError, Result};

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".smokearrow/guidance.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Ascending radius ladder; the first radius with results wins.
    #[serde(default = "default_radii_meters")]
    pub radii_meters: Vec<f64>,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_smoking_spot_queries")]
    pub smoking_spot_queries: Vec<String>,
    #[serde(default = "default_cafe_queries")]
    pub cafe_queries: Vec<String>,
}

impl SearchConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radii_meters: default_radii_meters(),
            query_timeout_ms: default_query_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            smoking_spot_queries: default_smoking_spot_queries(),
            cafe_queries: default_cafe_queries(),
        }
    }
}

fn default_radii_meters() -> Vec<f64> {
    vec![1_000.0, 2_000.0, 5_000.0]
}

fn default_query_timeout_ms() -> u64 {
    2_000
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_smoking_spot_queries() -> Vec<String> {
    vec!["喫煙所".to_string(), "smoking area".to_string()]
}

fn default_cafe_queries() -> Vec<String> {
    vec![
        "喫煙可能なカフェ".to_string(),
        "喫煙可能 カフェ".to_string(),
        "喫煙 カフェ".to_string(),
        "smoking cafe".to_string(),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine scheduling
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick interval while the arrow is visible.
    #[serde(default = "default_fast_tick_ms")]
    pub fast_tick_ms: u64,
    #[serde(default = "default_slow_tick_ms")]
    pub slow_tick_ms: u64,
    /// Time constant of the arrow's exponential smoothing.
    #[serde(default = "default_heading_smoothing_secs")]
    pub heading_smoothing_secs: f64,
}

impl EngineConfig {
    pub fn fast_tick(&self) -> Duration {
        Duration::from_millis(self.fast_tick_ms)
    }

    pub fn slow_tick(&self) -> Duration {
        Duration::from_millis(self.slow_tick_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: default_fast_tick_ms(),
            slow_tick_ms: default_slow_tick_ms(),
            heading_smoothing_secs: default_heading_smoothing_secs(),
        }
    }
}

fn default_fast_tick_ms() -> u64 {
    100
}

fn default_slow_tick_ms() -> u64 {
    500
}

fn default_heading_smoothing_secs() -> f64 {
    0.1
}

// ─────────────────────────────────────────────────────────────────────────────
// Search trigger and target policy
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPolicyConfig {
    #[serde(default = "default_min_movement_meters")]
    pub min_movement_meters: f64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_accuracy_improvement_meters")]
    pub accuracy_improvement_meters: f64,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// A new candidate replaces the target only within this fraction of its distance.
    #[serde(default = "default_target_switch_ratio")]
    pub target_switch_ratio: f64,
}

impl SearchPolicyConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for SearchPolicyConfig {
    fn default() -> Self {
        Self {
            min_movement_meters: default_min_movement_meters(),
            refresh_interval_secs: default_refresh_interval_secs(),
            accuracy_improvement_meters: default_accuracy_improvement_meters(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            target_switch_ratio: default_target_switch_ratio(),
        }
    }
}

fn default_min_movement_meters() -> f64 {
    50.0
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_accuracy_improvement_meters() -> f64 {
    20.0
}

fn default_backoff_base_secs() -> u64 {
    5
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_target_switch_ratio() -> f64 {
    0.9
}

// ─────────────────────────────────────────────────────────────────────────────
// Accuracy gate
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyConfig {
    #[serde(default = "default_max_horizontal_accuracy_meters")]
    pub max_horizontal_accuracy_meters: f64,
    #[serde(default = "default_max_heading_accuracy_degrees")]
    pub max_heading_accuracy_degrees: f64,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy_meters: default_max_horizontal_accuracy_meters(),
            max_heading_accuracy_degrees: default_max_heading_accuracy_degrees(),
        }
    }
}

fn default_max_horizontal_accuracy_meters() -> f64 {
    65.0
}

fn default_max_heading_accuracy_degrees() -> f64 {
    25.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuidanceConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub policy: SearchPolicyConfig,
    #[serde(default)]
    pub accuracy: AccuracyConfig,
}

impl GuidanceConfig {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let radii = &self.search.radii_meters;
        if radii.is_empty() {
            return Err(GuidanceError::ConfigInvalid(
                "search.radii_meters must not be empty".to_string(),
            ));
        }
        if radii.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(GuidanceError::ConfigInvalid(
                "search.radii_meters must be positive".to_string(),
            ));
        }
        if radii.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(GuidanceError::ConfigInvalid(
                "search.radii_meters must be strictly ascending".to_string(),
            ));
        }
        if self.search.smoking_spot_queries.is_empty() {
            return Err(GuidanceError::ConfigInvalid(
                "search.smoking_spot_queries must not be empty".to_string(),
            ));
        }
        if self.search.query_timeout_ms == 0 {
            return Err(GuidanceError::ConfigInvalid(
                "search.query_timeout_ms must be positive".to_string(),
            ));
        }
        if self.engine.fast_tick_ms == 0 || self.engine.slow_tick_ms == 0 {
            return Err(GuidanceError::ConfigInvalid(
                "engine tick intervals must be positive".to_string(),
            ));
        }
        let ratio = self.policy.target_switch_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(GuidanceError::ConfigInvalid(format!(
                "policy.target_switch_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(GuidanceError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

/// Loads and validates the configuration, returning defaults when the file is missing.
pub fn load_config(path: Option<PathBuf>) -> Result<GuidanceConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(GuidanceConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|source| GuidanceError::Io {
        context: format!("reading {}", config_path.display()),
        source,
    })?;
    let config: GuidanceConfig =
        toml::from_str(&content).map_err(|err| GuidanceError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}
