// =============================================================================
// Runtime Configuration — analyzer defaults with atomic save
// =============================================================================
//
// Every tunable the analysis pipeline exposes lives here: the market
// catalogue, default interval/count for requests, the level and volume
// profile parameters, and the candle cache TTL.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default = "...")]` so that a config file written by an older
// build (or edited by hand down to a few keys) still loads.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::AnalysisParams;
use crate::levels::LevelConfig;
use crate::types::Interval;
use crate::upbit::client::{DEFAULT_BASE_URL, MAX_CANDLES_PER_REQUEST};
use crate::volume_profile::DEFAULT_BUCKET_COUNT;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_markets() -> Vec<MarketEntry> {
    [
        ("비트코인", "KRW-BTC"),
        ("이더리움", "KRW-ETH"),
        ("솔라나", "KRW-SOL"),
        ("XRP", "KRW-XRP"),
        ("에테나", "KRW-ENA"),
        ("도지코인", "KRW-DOGE"),
        ("바빌론", "KRW-BABY"),
    ]
    .into_iter()
    .map(|(name, code)| MarketEntry {
        name: name.to_string(),
        code: code.to_string(),
    })
    .collect()
}

fn default_candle_count() -> usize {
    MAX_CANDLES_PER_REQUEST
}

fn default_pivot_window() -> usize {
    20
}

fn default_bucket_count() -> usize {
    DEFAULT_BUCKET_COUNT
}

fn default_level_granularity() -> f64 {
    10.0
}

fn default_max_levels() -> usize {
    10
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_source_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// Market catalogue
// =============================================================================

/// A market offered to clients: display name plus exchange market code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub name: String,
    pub code: String,
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_markets")]
    pub markets: Vec<MarketEntry>,

    /// Interval used when a request does not name one.
    #[serde(default)]
    pub default_interval: Interval,

    /// Candles requested when a request does not say how many.
    #[serde(default = "default_candle_count")]
    pub default_candle_count: usize,

    // --- Level detection -----------------------------------------------------
    #[serde(default = "default_pivot_window")]
    pub pivot_window: usize,

    #[serde(default = "default_level_granularity")]
    pub level_granularity: f64,

    #[serde(default = "default_max_levels")]
    pub max_levels: usize,

    // --- Volume profile ------------------------------------------------------
    /// Number of bucket edges (yields one fewer bins).
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,

    // --- Candle source -------------------------------------------------------
    /// How long a fetched series is reused before refetching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_source_base_url")]
    pub source_base_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            default_interval: Interval::default(),
            default_candle_count: default_candle_count(),
            pivot_window: default_pivot_window(),
            level_granularity: default_level_granularity(),
            max_levels: default_max_levels(),
            bucket_count: default_bucket_count(),
            cache_ttl_secs: default_cache_ttl_secs(),
            source_base_url: default_source_base_url(),
        }
    }
}

impl RuntimeConfig {
    /// Pipeline parameters derived from the configured defaults.
    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            levels: LevelConfig {
                window: self.pivot_window,
                granularity: self.level_granularity,
                max_levels: self.max_levels,
            },
            bucket_count: self.bucket_count,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Look a market up by code (case-insensitive) or display name.
    pub fn find_market(&self, key: &str) -> Option<&MarketEntry> {
        self.markets
            .iter()
            .find(|m| m.code.eq_ignore_ascii_case(key) || m.name == key)
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            markets = config.markets.len(),
            default_interval = %config.default_interval,
            cache_ttl_secs = config.cache_ttl_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Load from `path`, or fall back to defaults and write them back so the
    /// file exists for the next start.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "using default runtime config");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!(error = %format!("{e:#}"), "could not persist default runtime config");
                }
                config
            }
        }
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
