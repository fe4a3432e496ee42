//! Result assembly.
//!
//! Turns index sequences back into tracks and re-scores the finished
//! primary sequence: path cost, per-objective breakdown and constraint
//! violations.

use crate::compatibility::{score_pair, Attribute, ScoringContext};
use crate::constraints::{cultural_clusters, ConstraintSet, Violation};
use crate::cost::{total_score, CostModel};
use crate::enrichment::EnrichmentScorer;
use crate::search::SearchOutcome;
use crate::track::{Track, TrackId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Eras tolerated before temporal coherence starts to drop
const COHERENT_ERAS: usize = 3;
/// Languages tolerated before linguistic coherence starts to drop
const COHERENT_LANGUAGES: usize = 2;
/// Lowest coherence reported for very mixed sequences
const COHERENCE_FLOOR: f64 = 0.3;

/// A track lacking required attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingAttributes {
    pub track_id: TrackId,
    pub attributes: Vec<Attribute>,
}

/// How the result was reached and what degraded along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub outcome: SearchOutcome,
    /// The primary sequence came from the greedy fallback
    pub fallback_used: bool,
    pub missing_attributes: Vec<MissingAttributes>,
    pub notes: Vec<String>,
}

impl Diagnostics {
    pub fn new(outcome: SearchOutcome) -> Self {
        Self {
            outcome,
            fallback_used: false,
            missing_attributes: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// The sequenced playlist and everything measured about it.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub tracks: Vec<Track>,
    /// Normalised quality, 0..=1
    pub total_score: f64,
    /// Mean per-dimension scores across adjacent pairs
    pub objective_scores: BTreeMap<String, f64>,
    /// Edge-cost sum, without constraint penalties
    pub path_cost: f64,
    pub nodes_explored: usize,
    pub elapsed: Duration,
    pub violations: Vec<Violation>,
    pub alternatives: Vec<Vec<Track>>,
    pub diagnostics: Diagnostics,
}

impl OptimizationResult {
    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Everything about one call the assembler needs besides the sequences
pub struct ResultAssembler<'a> {
    pub cost: &'a CostModel<'a>,
    pub constraints: &'a ConstraintSet,
    pub scoring: &'a ScoringContext,
    pub enrichment: &'a dyn EnrichmentScorer,
}

impl ResultAssembler<'_> {
    fn tracks(&self) -> &[Track] {
        self.cost.context().tracks
    }

    fn materialise(&self, sequence: &[usize]) -> Vec<Track> {
        sequence.iter().map(|&i| self.tracks()[i].clone()).collect()
    }

    /// Build the final result around `primary`.
    pub fn assemble(
        &self,
        primary: &[usize],
        alternatives: &[Vec<usize>],
        nodes_explored: usize,
        elapsed: Duration,
        diagnostics: Diagnostics,
    ) -> OptimizationResult {
        let context = self.cost.context();
        let path_cost = self.cost.path_cost(primary);
        let violations = self.constraints.violations(primary, context);
        let penalty: f64 = violations.iter().map(|v| v.penalty).sum();

        OptimizationResult {
            tracks: self.materialise(primary),
            total_score: total_score(path_cost + penalty, primary.len()),
            objective_scores: self.breakdown(primary),
            path_cost,
            nodes_explored,
            elapsed,
            violations,
            alternatives: alternatives.iter().map(|s| self.materialise(s)).collect(),
            diagnostics,
        }
    }

    /// Per-dimension means over adjacent pairs; empty with fewer than two tracks.
    ///
    /// Enrichment dimensions only appear when some track carries the data.
    pub fn breakdown(&self, sequence: &[usize]) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        if sequence.len() < 2 {
            return scores;
        }
        let tracks = self.tracks();
        let pairs: Vec<_> = sequence
            .windows(2)
            .map(|pair| score_pair(&tracks[pair[0]], &tracks[pair[1]], self.scoring, self.enrichment))
            .collect();

        scores.insert("compatibility".to_string(), mean(pairs.iter().map(|p| p.composite)));
        scores.insert("harmonic".to_string(), mean(pairs.iter().map(|p| p.harmonic)));
        scores.insert("tempo".to_string(), mean(pairs.iter().map(|p| p.tempo)));
        scores.insert("energy".to_string(), mean(pairs.iter().map(|p| p.energy)));
        if pairs.iter().any(|p| p.emotional.is_some()) {
            scores.insert("emotional".to_string(), mean(pairs.iter().filter_map(|p| p.emotional)));
        }

        let (eras, languages) = cultural_clusters(sequence, self.cost.context());
        if !eras.is_empty() {
            scores.insert(
                "temporal_coherence".to_string(),
                coherence(eras.len(), COHERENT_ERAS, 0.15),
            );
        }
        if !languages.is_empty() {
            scores.insert(
                "linguistic_coherence".to_string(),
                coherence(languages.len(), COHERENT_LANGUAGES, 0.2),
            );
        }

        let dance_pairs: Vec<f64> = sequence
            .windows(2)
            .filter_map(|pair| {
                let a = tracks[pair[0]].danceability()?;
                let b = tracks[pair[1]].danceability()?;
                Some(1.0 - (a - b).abs())
            })
            .collect();
        if !dance_pairs.is_empty() {
            scores.insert("danceability_flow".to_string(), mean(dance_pairs.into_iter()));
        }

        let appeal: Vec<f64> = sequence.iter().filter_map(|&i| tracks[i].crowd_appeal()).collect();
        if !appeal.is_empty() {
            scores.insert("crowd_appeal".to_string(), mean(appeal.into_iter()));
        }

        scores
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / count as f64;
        mean
    }
}

/// 1.0 up to `tolerated` clusters, then `step` less per extra cluster
fn coherence(clusters: usize, tolerated: usize, step: f64) -> f64 {
    if clusters <= tolerated {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let extra = (clusters - tolerated) as f64;
    (1.0 - extra * step).max(COHERENCE_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::CompatibilityMatrix;
    use crate::config::OptimizerConfig;
    use crate::constraints::SequenceContext;
    use crate::enrichment::MetadataEnrichment;
    use crate::track::keys;

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("a")
                .with_key("8A")
                .with_bpm(120.0)
                .with_energy(4.0)
                .with_emotional_intensity(5.0)
                .with_enrichment(keys::ERA, "80s")
                .with_enrichment(keys::DANCEABILITY, "60%"),
            Track::new("b")
                .with_key("9A")
                .with_bpm(121.0)
                .with_energy(6.0)
                .with_enrichment(keys::ERA, "90s")
                .with_enrichment(keys::DANCEABILITY, "80%"),
            Track::new("c").with_key("9A").with_bpm(122.0).with_energy(7.0),
        ]
    }

    #[test]
    fn test_coherence_steps_down_to_floor() {
        assert_eq!(coherence(2, 3, 0.15), 1.0);
        assert!((coherence(4, 3, 0.15) - 0.85).abs() < 1e-9);
        assert_eq!(coherence(9, 2, 0.2), COHERENCE_FLOOR);
    }

    #[test]
    fn test_assemble_primary_and_alternatives() {
        let tracks = tracks();
        let config = OptimizerConfig::default();
        let scoring = ScoringContext::default();
        let matrix = CompatibilityMatrix::build(&tracks, &scoring, &MetadataEnrichment);
        let cost = CostModel::new(SequenceContext::new(&tracks, &matrix), 3, &config);
        let constraints = ConstraintSet::from_config(&config);
        let assembler = ResultAssembler {
            cost: &cost,
            constraints: &constraints,
            scoring: &scoring,
            enrichment: &MetadataEnrichment,
        };

        let result = assembler.assemble(
            &[0, 1, 2],
            &[vec![0, 2, 1]],
            12,
            Duration::from_millis(3),
            Diagnostics::new(SearchOutcome::Completed),
        );
        assert_eq!(result.track_ids(), vec!["a", "b", "c"]);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0][1].id, "c");
        assert!(result.violations.is_empty());
        assert!((result.path_cost - cost.path_cost(&[0, 1, 2])).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&result.total_score));
        assert_eq!(result.nodes_explored, 12);
    }

    #[test]
    fn test_breakdown_dimensions() {
        let tracks = tracks();
        let config = OptimizerConfig::default();
        let scoring = ScoringContext::default();
        let matrix = CompatibilityMatrix::build(&tracks, &scoring, &MetadataEnrichment);
        let cost = CostModel::new(SequenceContext::new(&tracks, &matrix), 3, &config);
        let constraints = ConstraintSet::from_config(&config);
        let assembler = ResultAssembler {
            cost: &cost,
            constraints: &constraints,
            scoring: &scoring,
            enrichment: &MetadataEnrichment,
        };

        let breakdown = assembler.breakdown(&[0, 1, 2]);
        for key in ["compatibility", "harmonic", "tempo", "energy", "temporal_coherence", "danceability_flow"] {
            assert!(breakdown.contains_key(key), "missing {key}");
        }
        assert!(!breakdown.contains_key("emotional"));
        assert!(!breakdown.contains_key("linguistic_coherence"));
        assert!((breakdown["danceability_flow"] - 0.8).abs() < 1e-9);
        assert_eq!(breakdown["temporal_coherence"], 1.0);
        assert!(assembler.breakdown(&[0]).is_empty());
    }
}
