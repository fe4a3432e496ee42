//! # Configuration Module
//!
//! Tunable constants for the sequencer. Every field has a default, so a
//! configuration file only needs to name the values it overrides:
//!
//! ```json
//! { "max_nodes": 25000, "beam_width": 80 }
//! ```
//!
//! The optional configuration file lives in the platform config directory:
//! - Linux: `~/.config/segue/config.json`
//! - macOS: `~/Library/Application Support/segue/config.json`
//! - Windows: `%APPDATA%\segue\config.json`

use crate::error::{Result, SegueError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Search bounds and scoring tolerances for one optimiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Node expansions allowed before the search gives up
    pub max_nodes: usize,
    /// Successor candidates expanded per node
    pub beam_width: usize,
    /// Stop as soon as a complete sequence scores at least this much (0-1)
    pub early_termination_score: f64,
    /// Where the energy curve peaks, as a fraction of the sequence
    pub peak_position: f64,
    /// Trailing positions checked for repeated subgenre/artist/key
    pub diversity_window: usize,
    /// Tempo difference that still counts as a perfect match
    pub tempo_tight_tolerance: f64,
    /// Tempo difference over which the score decays to 0.5
    pub tempo_wide_tolerance: f64,
    /// Slack around an exact half/double tempo relationship
    pub half_double_tolerance: f64,
    /// Energy difference still scoring 0.8
    pub energy_tolerance: f64,
    /// Adjacent composite score required by the minimum-compatibility rule
    pub min_compatibility: f64,
    /// Energy difference counted as an abrupt jump
    pub energy_jump_threshold: f64,
    /// Share of abrupt jumps tolerated by the energy-flow rule
    pub max_energy_jump_ratio: f64,
    /// Distinct eras tolerated by the coherence rule
    pub max_eras: usize,
    /// Distinct languages tolerated by the coherence rule
    pub max_languages: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            beam_width: 50,
            early_termination_score: 0.95,
            peak_position: 0.7,
            diversity_window: 3,
            tempo_tight_tolerance: 2.0,
            tempo_wide_tolerance: 3.0,
            half_double_tolerance: 4.0,
            energy_tolerance: 2.0,
            min_compatibility: 0.3,
            energy_jump_threshold: 3.0,
            max_energy_jump_ratio: 0.5,
            max_eras: 3,
            max_languages: 3,
        }
    }
}

impl OptimizerConfig {
    /// Load a configuration file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded optimizer configuration from {}", path.display());
        Ok(config)
    }

    /// Load the platform configuration file, or defaults when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error only when a configuration file exists but is invalid.
    pub fn load_or_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check ranges and orderings of all fields.
    ///
    /// # Errors
    ///
    /// Returns [`SegueError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(SegueError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )))
            }
        };
        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SegueError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )))
            }
        };

        if self.max_nodes == 0 {
            return Err(SegueError::InvalidConfig("max_nodes must be at least 1".into()));
        }
        if self.beam_width == 0 {
            return Err(SegueError::InvalidConfig("beam_width must be at least 1".into()));
        }
        unit("early_termination_score", self.early_termination_score)?;
        unit("peak_position", self.peak_position)?;
        unit("min_compatibility", self.min_compatibility)?;
        unit("max_energy_jump_ratio", self.max_energy_jump_ratio)?;
        non_negative("tempo_tight_tolerance", self.tempo_tight_tolerance)?;
        non_negative("tempo_wide_tolerance", self.tempo_wide_tolerance)?;
        non_negative("half_double_tolerance", self.half_double_tolerance)?;
        non_negative("energy_tolerance", self.energy_tolerance)?;
        non_negative("energy_jump_threshold", self.energy_jump_threshold)?;

        if self.tempo_wide_tolerance < self.tempo_tight_tolerance {
            return Err(SegueError::InvalidConfig(format!(
                "tempo_wide_tolerance ({}) must not be below tempo_tight_tolerance ({})",
                self.tempo_wide_tolerance, self.tempo_tight_tolerance
            )));
        }
        Ok(())
    }
}

/// Returns the platform-appropriate configuration file path, if the
/// platform has a configuration directory at all.
///
/// Unlike a database path, nothing is created here: a missing file simply
/// means defaults apply.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("segue").join("config.json"))
}
