//! Engine configuration
//!
//! Tunables for the analysis stages, loadable from a TOML file. Sections
//! missing from the file fall back to their defaults, and a small set of
//! environment variables override the file contents.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the fraud analysis engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pagerank: PageRankConfig,
    pub community: CommunityConfig,
    pub temporal: TemporalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Damping factor
    pub damping: f64,
    /// Maximum power iterations before falling back
    pub max_iterations: u32,
    /// Convergence tolerance, scaled by the node count: iteration stops once
    /// the total (L1) score movement drops below `|V| * tolerance`
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Modularity resolution (higher favours smaller communities)
    pub resolution: f64,
    /// Maximum local-moving passes per level
    pub max_passes: u32,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Burst window size in seconds
    pub burst_window_secs: i64,
    /// Minimum window-over-window ratio for a burst
    pub burst_ratio: f64,
    /// Addresses reported per burst
    pub max_burst_addresses: usize,
    /// Minimum gap (days) for a dormant wakeup
    pub dormant_min_days: i64,
    /// Minimum transactions before velocity is evaluated
    pub velocity_min_transactions: usize,
    /// Share of the most recent transactions forming the recent window
    pub velocity_recent_fraction: f64,
    /// Recent/historical rate ratio that flags an anomaly
    pub velocity_ratio: f64,
    /// Velocity anomalies reported
    pub velocity_top_n: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            burst_window_secs: 3600, // 1 hour
            burst_ratio: 5.0,
            max_burst_addresses: 10,
            dormant_min_days: 30,
            velocity_min_transactions: 5,
            velocity_recent_fraction: 0.25,
            velocity_ratio: 3.0,
            velocity_top_n: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: EngineConfig =
            toml::from_str(&contents).context("Failed to parse engine config")?;

        // Environment overrides
        if let Ok(level) = std::env::var("FRAUD_GRAPH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(resolution) = std::env::var("FRAUD_GRAPH_RESOLUTION") {
            config.community.resolution = resolution
                .parse()
                .context("FRAUD_GRAPH_RESOLUTION must be a number")?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).context("Failed to serialize engine config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Check that every tunable lies in its admissible range
    pub fn validate(&self) -> Result<()> {
        let pr = &self.pagerank;
        ensure!(
            pr.damping > 0.0 && pr.damping < 1.0,
            "pagerank.damping must be in (0, 1), got {}",
            pr.damping
        );
        ensure!(pr.max_iterations > 0, "pagerank.max_iterations must be positive");
        ensure!(pr.tolerance > 0.0, "pagerank.tolerance must be positive");

        ensure!(
            self.community.resolution > 0.0,
            "community.resolution must be positive, got {}",
            self.community.resolution
        );
        ensure!(self.community.max_passes > 0, "community.max_passes must be positive");

        let t = &self.temporal;
        ensure!(t.burst_window_secs > 0, "temporal.burst_window_secs must be positive");
        ensure!(t.burst_ratio > 0.0, "temporal.burst_ratio must be positive");
        ensure!(t.dormant_min_days > 0, "temporal.dormant_min_days must be positive");
        ensure!(
            t.velocity_recent_fraction > 0.0 && t.velocity_recent_fraction <= 1.0,
            "temporal.velocity_recent_fraction must be in (0, 1]"
        );
        ensure!(t.velocity_ratio > 0.0, "temporal.velocity_ratio must be positive");

        Ok(())
    }
}
