//! Seek controller configuration
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeekConfig {
    /// Auto-release timeout for a held seek lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    /// How long to wait for the engine to report the target position
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    #[serde(default = "default_confirm_tolerance_seconds")]
    pub confirm_tolerance_seconds: f64,

    #[serde(default = "default_continuous_tick_ms")]
    pub continuous_tick_ms: u64,

    #[serde(default = "default_continuous_initial_step_seconds")]
    pub continuous_initial_step_seconds: f64,

    /// How long a continuous-seek chapter crossing stays flagged
    #[serde(default = "default_chapter_blip_ms")]
    pub chapter_blip_ms: u64,

    #[serde(default = "default_restart_threshold_seconds")]
    pub restart_threshold_seconds: f64,

    #[serde(default = "default_edge_tolerance_seconds")]
    pub edge_tolerance_seconds: f64,

    #[serde(default)]
    pub smart_rewind: SmartRewindSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SmartRewindSettings {
    #[serde(default = "default_smart_rewind_enabled")]
    pub enabled: bool,

    #[serde(default = "default_max_rewind_seconds")]
    pub max_rewind_seconds: u32,
}

impl Default for SmartRewindSettings {
    fn default() -> Self {
        Self {
            enabled: default_smart_rewind_enabled(),
            max_rewind_seconds: default_max_rewind_seconds(),
        }
    }
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            confirm_tolerance_seconds: default_confirm_tolerance_seconds(),
            continuous_tick_ms: default_continuous_tick_ms(),
            continuous_initial_step_seconds: default_continuous_initial_step_seconds(),
            chapter_blip_ms: default_chapter_blip_ms(),
            restart_threshold_seconds: default_restart_threshold_seconds(),
            edge_tolerance_seconds: default_edge_tolerance_seconds(),
            smart_rewind: SmartRewindSettings::default(),
        }
    }
}

impl SeekConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Environment variables use the `TOME_SEEK_` prefix, e.g.
    /// `TOME_SEEK_LOCK_TIMEOUT_MS=3000`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path).required(false));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("TOME_SEEK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SeekConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.confirm_poll_interval_ms == 0 || self.continuous_tick_ms == 0 {
            return Err(PlaybackError::Config(
                "poll and tick intervals must be greater than zero".to_string(),
            ));
        }

        if self.confirm_timeout_ms < self.confirm_poll_interval_ms {
            return Err(PlaybackError::Config(format!(
                "confirm_timeout_ms ({}) is shorter than confirm_poll_interval_ms ({})",
                self.confirm_timeout_ms, self.confirm_poll_interval_ms
            )));
        }

        if !(self.confirm_tolerance_seconds.is_finite() && self.confirm_tolerance_seconds >= 0.0) {
            return Err(PlaybackError::Config(format!(
                "confirm_tolerance_seconds must be a non-negative number, got {}",
                self.confirm_tolerance_seconds
            )));
        }

        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn continuous_tick(&self) -> Duration {
        Duration::from_millis(self.continuous_tick_ms)
    }

    pub fn chapter_blip(&self) -> Duration {
        Duration::from_millis(self.chapter_blip_ms)
    }
}

// Default values
fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_confirm_poll_interval_ms() -> u64 {
    50
}

fn default_confirm_timeout_ms() -> u64 {
    3_000
}

fn default_confirm_tolerance_seconds() -> f64 {
    1.0
}

fn default_continuous_tick_ms() -> u64 {
    100
}

fn default_continuous_initial_step_seconds() -> f64 {
    2.0
}

fn default_chapter_blip_ms() -> u64 {
    200
}

fn default_restart_threshold_seconds() -> f64 {
    crate::chapters::DEFAULT_RESTART_THRESHOLD_SECONDS
}

fn default_edge_tolerance_seconds() -> f64 {
    crate::chapters::DEFAULT_EDGE_TOLERANCE_SECONDS
}

fn default_smart_rewind_enabled() -> bool {
    true
}

fn default_max_rewind_seconds() -> u32 {
    crate::smart_rewind::DEFAULT_MAX_REWIND_SECONDS
}
