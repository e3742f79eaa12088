//! Viewer configuration
//!
//! Every field has a default so a partial JSON block (from a manifest or a
//! `--config` file) only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpinError};
use crate::layout::FrameUrlScheme;

/// Tunables for one viewer instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pixels of horizontal drag per frame
    pub sensitivity: f64,
    /// Animation tick length velocities are normalized to (ms)
    pub tick_ms: f64,
    /// Per-tick velocity multiplier while coasting
    pub decay: f64,
    /// Release speed (px/tick) needed to start coasting
    pub min_velocity: f64,
    /// Coasting stops once speed drops below this (px/tick)
    pub stop_threshold: f64,
    /// A velocity sample older than this at release counts as zero (ms)
    pub release_stale_ms: f64,
    /// Frames on each side of the current one preloaded eagerly
    pub preload_window: usize,
    /// Quiet time before the rest of the set is preloaded (ms)
    pub idle_preload_delay_ms: u32,
    /// Keep spinning after a flick
    pub momentum: bool,
    /// Show a draggable progress thumb under the image
    pub slider: bool,
    pub url_scheme: FrameUrlScheme,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sensitivity: 5.0,
            tick_ms: 16.0,
            decay: 0.92,
            min_velocity: 1.0,
            stop_threshold: 0.1,
            release_stale_ms: 100.0,
            preload_window: 4,
            idle_preload_delay_ms: 500,
            momentum: true,
            slider: false,
            url_scheme: FrameUrlScheme::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SpinError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject values that would stall or blow up the simulation
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SpinError::InvalidConfig(msg));

        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return invalid(format!("sensitivity must be positive, got {}", self.sensitivity));
        }
        if !(self.tick_ms.is_finite() && self.tick_ms > 0.0) {
            return invalid(format!("tick_ms must be positive, got {}", self.tick_ms));
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return invalid(format!("decay must be in (0, 1), got {}", self.decay));
        }
        if !(self.stop_threshold.is_finite() && self.stop_threshold > 0.0) {
            return invalid(format!("stop_threshold must be positive, got {}", self.stop_threshold));
        }
        if !(self.min_velocity >= self.stop_threshold) {
            return invalid(format!(
                "min_velocity ({}) must not be below stop_threshold ({})",
                self.min_velocity, self.stop_threshold
            ));
        }
        if !(self.release_stale_ms >= 0.0) {
            return invalid(format!("release_stale_ms must not be negative, got {}", self.release_stale_ms));
        }
        if !(1..=8).contains(&self.url_scheme.pad_width) {
            return invalid(format!("pad_width must be 1..=8, got {}", self.url_scheme.pad_width));
        }
        if self.url_scheme.extension.is_empty() {
            return invalid("extension must not be empty".to_string());
        }
        Ok(())
    }
}
