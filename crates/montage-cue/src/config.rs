//! Global configuration for montage-cue
//!
//! Configuration is stored as YAML under the user config directory
//! (default: ~/.config/montage/config.yaml). Every section carries
//! serde defaults so a partial file stays loadable across versions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rhythm analysis thresholds
    pub analysis: AnalysisConfig,
    /// Segmentation behavior
    pub segmenter: SegmenterConfig,
    /// Playback synchronizer tunables
    pub playback: PlaybackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            segmenter: SegmenterConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// Rhythm analysis configuration
///
/// `min_energy` and `sensitivity` map directly onto the beat detector;
/// both are clamped to their documented ranges at detection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Energy floor for beat detection (0.01 - 0.8)
    pub min_energy: f32,
    /// Local-average multiplier (1.0 - 4.0)
    pub sensitivity: f32,
    /// Style preset selected by name (see segment::preset)
    pub preset: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_energy: 0.1,
            sensitivity: 1.4,
            preset: String::from("flow"),
        }
    }
}

/// Segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Mild speed-up on drops, slow-down on quiet passages
    pub speed_ramping: bool,
    /// Prefer brightness continuity between adjacent clips
    pub smart_reorder: bool,
    /// Fixed RNG seed for reproducible montages (None = vary per run)
    pub seed: Option<u64>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            speed_ramping: false,
            smart_reorder: true,
            seed: None,
        }
    }
}

/// Playback synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Hard-seek threshold for decoder drift, seconds
    pub drift_tolerance: f64,
    /// Crossfade blend window, seconds
    pub crossfade_secs: f64,
    /// Predictive preload lookahead, beats
    pub preload_beats: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            drift_tolerance: 0.25,
            crossfade_secs: 0.5,
            preload_beats: 2.0,
        }
    }
}

impl From<&PlaybackConfig> for montage_core::engine::SyncConfig {
    fn from(cfg: &PlaybackConfig) -> Self {
        Self {
            drift_tolerance: cfg.drift_tolerance,
            crossfade_secs: cfg.crossfade_secs,
            preload_beats: cfg.preload_beats,
        }
    }
}

impl Config {
    /// Default config file location (~/.config/montage/config.yaml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("montage")
            .join("config.yaml")
    }

    /// Load from a YAML file, falling back to defaults when missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Persist as YAML, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }
}
