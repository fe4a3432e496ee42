//! Optimisation objectives.
//!
//! An [`Objective`] resolves to the four per-factor weights used by the
//! compatibility scorer plus how strongly enrichment data may refine them.

use crate::error::{Result, SegueError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Allowed drift when checking that weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-factor weights for the composite compatibility score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub harmonic: f64,
    pub tempo: f64,
    pub energy: f64,
    pub emotional: f64,
}

impl FactorWeights {
    #[must_use]
    pub const fn new(harmonic: f64, tempo: f64, energy: f64, emotional: f64) -> Self {
        Self {
            harmonic,
            tempo,
            energy,
            emotional,
        }
    }

    pub fn sum(&self) -> f64 {
        self.harmonic + self.tempo + self.energy + self.emotional
    }

    /// Rejects negative or non-finite weights, and weights not summing to 1.0
    ///
    /// # Errors
    ///
    /// Returns [`SegueError::InvalidRequest`] describing the offending weights
    pub fn validate(&self) -> Result<()> {
        let all = [self.harmonic, self.tempo, self.energy, self.emotional];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SegueError::invalid_request(format!(
                "factor weights must be finite and non-negative: {self}"
            )));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(SegueError::invalid_request(format!(
                "factor weights must sum to 1.0, got {:.4} ({self})",
                self.sum()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for FactorWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "harmonic={:.2} tempo={:.2} energy={:.2} emotional={:.2}",
            self.harmonic, self.tempo, self.energy, self.emotional
        )
    }
}

/// Named weight presets, or caller-supplied weights.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    #[default]
    Balanced,
    Narrative,
    EnergyFlow,
    CulturalJourney,
    Custom(FactorWeights),
}

impl Objective {
    /// Factor weights for this objective
    #[must_use]
    pub fn weights(&self) -> FactorWeights {
        match self {
            Objective::Balanced => FactorWeights::new(0.4, 0.3, 0.2, 0.1),
            Objective::Narrative => FactorWeights::new(0.2, 0.1, 0.2, 0.5),
            Objective::EnergyFlow => FactorWeights::new(0.2, 0.2, 0.5, 0.1),
            Objective::CulturalJourney => FactorWeights::new(0.25, 0.25, 0.25, 0.25),
            Objective::Custom(weights) => *weights,
        }
    }

    /// How much enrichment refinements may move a factor score
    #[must_use]
    pub fn enrichment_strength(&self) -> f64 {
        match self {
            Objective::Balanced | Objective::EnergyFlow | Objective::Custom(_) => 0.1,
            Objective::Narrative => 0.15,
            Objective::CulturalJourney => 0.25,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Objective::Balanced => "balanced",
            Objective::Narrative => "narrative",
            Objective::EnergyFlow => "energy-flow",
            Objective::CulturalJourney => "cultural-journey",
            Objective::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Objective {
    type Err = SegueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "balanced" | "compatibility" => Ok(Objective::Balanced),
            "narrative" => Ok(Objective::Narrative),
            "energy-flow" | "energy" => Ok(Objective::EnergyFlow),
            "cultural-journey" | "cultural" => Ok(Objective::CulturalJourney),
            other => Err(SegueError::invalid_request(format!(
                "unknown objective '{other}' (expected balanced, narrative, energy-flow or cultural-journey)"
            ))),
        }
    }
}
