//! Configuration file handling.
//!
//! Settings live in `property-scout.toml`. Every key is optional; anything
//! left out falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, ScoutError};
use crate::models::{DealParameters, MarketSettings, MAX_HOLD_MONTHS};
use crate::sources::{FileSource, HttpSource, ObservationSource, DEFAULT_SOURCES};

/// Default configuration file name
pub const CONFIG_FILE: &str = "property-scout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Market assumptions for the analyzer.
    #[serde(default)]
    pub market: MarketSettings,

    /// Default deal terms.
    #[serde(default)]
    pub deal: DealParameters,

    /// Source and collection settings.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Deal alert settings.
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// How observations are gathered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Per-source timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per source before it is marked failed.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before the first retry in milliseconds; doubles after each attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sources in consensus iteration order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            sources: default_sources(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_sources() -> Vec<SourceConfig> {
    DEFAULT_SOURCES
        .iter()
        .map(|id| SourceConfig {
            id: id.to_string(),
            kind: SourceKind::File,
            location: format!("observations/{{slug}}/{}.json", id),
        })
        .collect()
}

/// Where a source's observations come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON data API
    Http,
    /// Saved or hand-entered JSON file
    File,
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    /// Endpoint URL or file path; both may contain `{slug}`.
    pub location: String,
}

impl SourceConfig {
    pub fn build(&self, timeout: Duration) -> anyhow::Result<Arc<dyn ObservationSource>> {
        let source: Arc<dyn ObservationSource> = match self.kind {
            SourceKind::Http => Arc::new(HttpSource::with_timeout(&self.id, &self.location, timeout)?),
            SourceKind::File => Arc::new(FileSource::new(&self.id, &self.location)),
        };
        Ok(source)
    }
}

/// Deal alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// ROI percentage a deal must exceed to be flagged.
    #[serde(default = "default_roi_threshold")]
    pub roi_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            roi_threshold: default_roi_threshold(),
        }
    }
}

fn default_roi_threshold() -> f64 {
    20.0
}

impl Config {
    /// Load and validate configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings the analyzer or collector cannot work with.
    pub fn validate(&self) -> Result<()> {
        let m = &self.market;
        let percentages = [
            ("ltv", m.ltv),
            ("interest", m.interest),
            ("brokerage", m.brokerage),
            ("sales_closing", m.sales_closing),
            ("acquisition", m.acquisition),
            ("vacancy", m.vacancy),
            ("maintenance", m.maintenance),
            ("management", m.management),
        ];
        for (name, value) in percentages {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoutError::Config(format!(
                    "market.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if m.ltv > 100.0 {
            return Err(ScoutError::Config(format!(
                "market.ltv cannot exceed 100, got {}",
                m.ltv
            )));
        }
        if !m.hold_days_base.is_finite() || m.hold_days_base < 0.0 {
            return Err(ScoutError::Config(
                "market.hold_days_base must be a non-negative number".to_string(),
            ));
        }

        if self.deal.hold_months > MAX_HOLD_MONTHS {
            return Err(ScoutError::Config(format!(
                "deal.hold_months must be at most {}, got {}",
                MAX_HOLD_MONTHS, self.deal.hold_months
            )));
        }

        if self.acquisition.timeout_seconds == 0 {
            return Err(ScoutError::Config(
                "acquisition.timeout_seconds must be positive".to_string(),
            ));
        }
        if self.acquisition.retries == 0 {
            return Err(ScoutError::Config(
                "acquisition.retries must be at least 1".to_string(),
            ));
        }
        if self.acquisition.sources.is_empty() {
            return Err(ScoutError::Config(
                "at least one source must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for source in &self.acquisition.sources {
            if source.id.trim().is_empty() {
                return Err(ScoutError::Config("source id must not be empty".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ScoutError::Config(format!(
                    "source '{}' is configured more than once",
                    source.id
                )));
            }
        }
        Ok(())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.acquisition.timeout_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.acquisition.retry_backoff_ms)
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.acquisition.sources.iter().map(|s| s.id.clone()).collect()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
