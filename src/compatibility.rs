//! Pairwise compatibility scoring.
//!
//! Turns a pair of tracks into four factor scores (harmonic, tempo, energy,
//! emotional), each in 0..=1, and a weighted composite.
//!
//! # Factor rules
//!
//! ```text
//! harmonic:  same key 1.0 | wheel neighbour 0.8 | else max(0, 0.5 - 0.1 * wheel distance)
//! tempo:     |Δ| <= tight 1.0 | <= wide  1.0 -> 0.5 linearly | half/double 0.6
//!            | else max(0, 0.3 - 0.02 * (|Δ| - wide))
//! energy:    |Δ| <= 1 1.0 | <= tolerance 0.8 | else max(0, 0.5 - 0.1 * (|Δ| - tolerance))
//! emotional: max(0, 1 - |Δ| / 10)
//! ```
//!
//! A missing or unparseable key, tempo or energy scores
//! [`MISSING_FACTOR_SCORE`] for that factor. Emotional intensity is optional:
//! when either track lacks it the factor drops out and the remaining weights
//! are renormalised.
//!
//! Every rule is symmetric, so `score(a, b) == score(b, a)`.

use crate::camelot::CamelotKey;
use crate::config::OptimizerConfig;
use crate::enrichment::EnrichmentScorer;
use crate::objective::{FactorWeights, Objective};
use crate::track::Track;
use serde::Serialize;
use std::fmt;

/// Score given to a required factor when either track lacks the attribute
pub const MISSING_FACTOR_SCORE: f64 = 0.0;

/// Immutable scoring parameters for one optimisation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    pub weights: FactorWeights,
    pub tempo_tight_tolerance: f64,
    pub tempo_wide_tolerance: f64,
    pub half_double_tolerance: f64,
    pub energy_tolerance: f64,
    pub enrichment_strength: f64,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::new(&Objective::default(), &OptimizerConfig::default())
    }
}

impl ScoringContext {
    #[must_use]
    pub fn new(objective: &Objective, config: &OptimizerConfig) -> Self {
        Self {
            weights: objective.weights(),
            tempo_tight_tolerance: config.tempo_tight_tolerance,
            tempo_wide_tolerance: config.tempo_wide_tolerance,
            half_double_tolerance: config.half_double_tolerance,
            energy_tolerance: config.energy_tolerance,
            enrichment_strength: objective.enrichment_strength(),
        }
    }

    #[must_use]
    pub fn with_weights(self, weights: FactorWeights) -> Self {
        Self { weights, ..self }
    }
}

/// Per-factor scores for one transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorBreakdown {
    pub harmonic: f64,
    pub tempo: f64,
    pub energy: f64,
    /// `None` when either track has no emotional intensity
    pub emotional: Option<f64>,
    pub composite: f64,
}

/// Required attributes a track may lack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Key,
    Tempo,
    Energy,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Key => "key",
            Attribute::Tempo => "tempo",
            Attribute::Energy => "energy",
        })
    }
}

/// Required attributes that are absent or unusable on this track
pub fn missing_attributes(track: &Track) -> Vec<Attribute> {
    let mut missing = Vec::new();
    if parsed_key(track).is_none() {
        missing.push(Attribute::Key);
    }
    if usable_bpm(track).is_none() {
        missing.push(Attribute::Tempo);
    }
    if track.energy.filter(|e| e.is_finite()).is_none() {
        missing.push(Attribute::Energy);
    }
    missing
}

fn parsed_key(track: &Track) -> Option<CamelotKey> {
    track.key.as_deref().and_then(CamelotKey::parse)
}

fn usable_bpm(track: &Track) -> Option<f64> {
    track.bpm.filter(|bpm| bpm.is_finite() && *bpm > 0.0)
}

/// Harmonic factor for two wheel positions
#[must_use]
pub fn harmonic_score(a: CamelotKey, b: CamelotKey) -> f64 {
    if a == b {
        1.0
    } else if a.is_wheel_neighbor(b) {
        0.8
    } else {
        (0.5 - 0.1 * f64::from(a.wheel_distance(b))).max(0.0)
    }
}

/// Tempo factor.
///
/// The half/double-time score is a flat 0.6 however close the ratio is to 2x.
#[must_use]
pub fn tempo_score(a: f64, b: f64, context: &ScoringContext) -> f64 {
    let diff = (a - b).abs();
    let (tight, wide) = (context.tempo_tight_tolerance, context.tempo_wide_tolerance);

    if diff <= tight {
        1.0
    } else if diff <= wide {
        1.0 - 0.5 * (diff - tight) / (wide - tight)
    } else if is_half_double(a, b, context.half_double_tolerance) {
        0.6
    } else {
        (0.3 - (diff - wide) * 0.02).max(0.0)
    }
}

fn is_half_double(a: f64, b: f64, tolerance: f64) -> bool {
    (a * 2.0 - b).abs() <= tolerance || (a - b * 2.0).abs() <= tolerance
}

/// Energy factor on the 0-10 energy scale
#[must_use]
pub fn energy_score(a: f64, b: f64, tolerance: f64) -> f64 {
    let diff = (a - b).abs();
    match diff {
        d if d <= 1.0 => 1.0,
        d if d <= tolerance => 0.8,
        d => (0.5 - (d - tolerance) * 0.1).max(0.0),
    }
}

/// Emotional factor on the 0-10 intensity scale
#[must_use]
pub fn emotional_score(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs() / 10.0).max(0.0)
}

/// Score one transition.
///
/// Pure: the result depends only on the two tracks and the context.
#[must_use]
pub fn score_pair(
    from: &Track,
    to: &Track,
    context: &ScoringContext,
    enrichment: &dyn EnrichmentScorer,
) -> FactorBreakdown {
    let mut harmonic = parsed_key(from)
        .zip(parsed_key(to))
        .map_or(MISSING_FACTOR_SCORE, |(a, b)| harmonic_score(a, b));
    let tempo = usable_bpm(from)
        .zip(usable_bpm(to))
        .map_or(MISSING_FACTOR_SCORE, |(a, b)| tempo_score(a, b, context));
    let energy = from
        .energy
        .zip(to.energy)
        .map_or(MISSING_FACTOR_SCORE, |(a, b)| energy_score(a, b, context.energy_tolerance));
    let mut emotional = from
        .emotional_intensity
        .zip(to.emotional_intensity)
        .map(|(a, b)| emotional_score(a, b));

    if enrichment.is_active() {
        let refinement = enrichment.refine(from, to);
        let strength = context.enrichment_strength;
        harmonic = (harmonic + strength * refinement.harmonic).clamp(0.0, 1.0);
        // Without an emotional factor the cultural refinement lands on harmonic
        match emotional.as_mut() {
            Some(e) => *e = (*e + strength * refinement.auxiliary).clamp(0.0, 1.0),
            None => harmonic = (harmonic + strength * refinement.auxiliary).clamp(0.0, 1.0),
        }
    }

    let w = context.weights;
    let mut weighted = w.harmonic * harmonic + w.tempo * tempo + w.energy * energy;
    let mut total_weight = w.harmonic + w.tempo + w.energy;
    if let Some(e) = emotional {
        weighted += w.emotional * e;
        total_weight += w.emotional;
    }

    let composite = if total_weight > 0.0 {
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        MISSING_FACTOR_SCORE
    };

    FactorBreakdown {
        harmonic,
        tempo,
        energy,
        emotional,
        composite,
    }
}

/// Composite scores for every ordered pair of a track pool.
///
/// Built once per optimisation call and dropped with it. Indices follow the
/// pool order; self-transitions score 0.
#[derive(Debug, Clone)]
pub struct CompatibilityMatrix {
    size: usize,
    scores: Vec<f64>,
    means: Vec<f64>,
}

impl CompatibilityMatrix {
    #[must_use]
    pub fn build(
        tracks: &[Track],
        context: &ScoringContext,
        enrichment: &dyn EnrichmentScorer,
    ) -> Self {
        let size = tracks.len();
        let mut scores = vec![0.0; size * size];

        for i in 0..size {
            for j in (i + 1)..size {
                let score = score_pair(&tracks[i], &tracks[j], context, enrichment).composite;
                scores[i * size + j] = score;
                scores[j * size + i] = score;
            }
        }

        let means = (0..size)
            .map(|i| {
                if size < 2 {
                    return 0.5;
                }
                let row = &scores[i * size..(i + 1) * size];
                #[allow(clippy::cast_precision_loss)]
                let mean = row.iter().sum::<f64>() / (size - 1) as f64;
                mean
            })
            .collect();

        log::trace!("Built {size}x{size} compatibility matrix");
        Self { size, scores, means }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Composite score for the transition `from -> to`
    #[inline]
    pub fn score(&self, from: usize, to: usize) -> f64 {
        self.scores[from * self.size + to]
    }

    /// All scores out of one track
    pub fn row(&self, from: usize) -> &[f64] {
        &self.scores[from * self.size..(from + 1) * self.size]
    }

    /// Mean score from one track to every other track
    pub fn mean(&self, from: usize) -> f64 {
        self.means[from]
    }
}
