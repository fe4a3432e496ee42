//! Cost model shared by search, greedy fallback and result assembly.
//!
//! ```text
//! edge(a -> b at p) = (1 - compatibility(a, b)) + position(b, p) + diversity(b | window)
//! path(s)           = position(s0, 0) + sum of edge costs
//! ```
//!
//! Lower is better. The energy curve rises from 0.3 to 0.9 up to the peak
//! position, then eases back to 0.5 by the last track.

use crate::config::OptimizerConfig;
use crate::constraints::{SequenceContext, TrackFeatures};

const CURVE_START: f64 = 0.3;
const CURVE_PEAK: f64 = 0.9;
const CURVE_END: f64 = 0.5;
/// Weight of energy deviation in position cost
const POSITION_WEIGHT: f64 = 0.5;
/// Share of position cost forgiven for a track with full crowd appeal
const CROWD_APPEAL_DISCOUNT: f64 = 0.2;

const SAME_SUBGENRE_PENALTY: f64 = 0.1;
const SAME_ARTIST_PENALTY: f64 = 0.2;
const SAME_KEY_PENALTY: f64 = 0.05;
const SAME_ERA_PENALTY: f64 = 0.05;
const MAX_DIVERSITY_PENALTY: f64 = 0.5;

/// Normalised quality of a sequence: `1 - cost / (length - 1)`, clamped to 0..=1
pub fn total_score(cost: f64, length: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let transitions = length.saturating_sub(1).max(1) as f64;
    (1.0 - cost / transitions).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct CostModel<'a> {
    context: SequenceContext<'a>,
    length: usize,
    peak_position: f64,
    diversity_window: usize,
}

impl<'a> CostModel<'a> {
    pub fn new(context: SequenceContext<'a>, length: usize, config: &OptimizerConfig) -> Self {
        Self {
            context,
            length,
            peak_position: config.peak_position,
            diversity_window: config.diversity_window,
        }
    }

    pub fn context(&self) -> &SequenceContext<'a> {
        &self.context
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Desired energy (0..=1) at a position
    pub fn target_energy(&self, position: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = if self.length > 1 {
            position as f64 / (self.length - 1) as f64
        } else {
            0.0
        };
        let peak = self.peak_position;

        if ratio <= peak {
            let rise = if peak > 0.0 { ratio / peak } else { 1.0 };
            CURVE_START + (CURVE_PEAK - CURVE_START) * rise
        } else {
            let ease = (ratio - peak) / (1.0 - peak);
            CURVE_PEAK - (CURVE_PEAK - CURVE_END) * ease
        }
    }

    /// Distance from the energy curve; zero for tracks without energy data
    pub fn position_cost(&self, item: usize, position: usize) -> f64 {
        let track = &self.context.tracks[item];
        let Some(energy) = track.energy_ratio() else {
            return 0.0;
        };
        let cost = (energy - self.target_energy(position)).abs() * POSITION_WEIGHT;
        match track.crowd_appeal() {
            Some(appeal) => cost * (1.0 - CROWD_APPEAL_DISCOUNT * appeal),
            None => cost,
        }
    }

    /// Penalty for repeating subgenre, artist, key or era within the trailing
    /// window of `prefix`
    pub fn diversity_cost(&self, item: usize, prefix: &[usize]) -> f64 {
        let features = self.context.features(item);
        let window_start = prefix.len().saturating_sub(self.diversity_window);

        let penalty: f64 = prefix[window_start..]
            .iter()
            .map(|&previous| repeat_penalty(features, self.context.features(previous)))
            .sum();
        penalty.min(MAX_DIVERSITY_PENALTY)
    }

    /// Cost of appending `item` at `position` to `prefix`
    pub fn edge_cost(&self, prefix: &[usize], item: usize, position: usize) -> f64 {
        let compatibility = prefix
            .last()
            .map_or(1.0, |&from| self.context.matrix.score(from, item));
        (1.0 - compatibility) + self.position_cost(item, position) + self.diversity_cost(item, prefix)
    }

    /// Estimated remaining cost from `item` at `position`
    pub fn heuristic(&self, item: usize, position: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let remaining = self.length.saturating_sub(position + 1) as f64;
        (1.0 - self.context.matrix.mean(item)) * remaining
    }

    /// Position cost of the first track plus every edge cost
    pub fn path_cost(&self, sequence: &[usize]) -> f64 {
        let Some(&first) = sequence.first() else {
            return 0.0;
        };
        (1..sequence.len()).fold(self.position_cost(first, 0), |cost, position| {
            cost + self.edge_cost(&sequence[..position], sequence[position], position)
        })
    }
}

fn repeat_penalty(track: &TrackFeatures, previous: &TrackFeatures) -> f64 {
    let mut penalty = 0.0;
    if same(&track.subgenre, &previous.subgenre) {
        penalty += SAME_SUBGENRE_PENALTY;
    }
    if same(&track.artist, &previous.artist) {
        penalty += SAME_ARTIST_PENALTY;
    }
    if same(&track.key, &previous.key) {
        penalty += SAME_KEY_PENALTY;
    }
    if same(&track.era, &previous.era) {
        penalty += SAME_ERA_PENALTY;
    }
    penalty
}

/// Both present and equal
fn same<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    a.is_some() && a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::{CompatibilityMatrix, ScoringContext};
    use crate::enrichment::NoEnrichment;
    use crate::track::{keys, Track};

    fn fixture() -> (Vec<Track>, CompatibilityMatrix) {
        let tracks = vec![
            Track::new("a").with_artist("Band").with_key("8A").with_bpm(124.0).with_energy(3.0),
            Track::new("b").with_artist("band").with_key("Am").with_bpm(124.0).with_energy(9.0),
            Track::new("c").with_artist("Other").with_key("3B").with_bpm(124.0).with_energy(5.0),
            Track::new("d").with_key("8A").with_bpm(124.0),
        ];
        let matrix = CompatibilityMatrix::build(&tracks, &ScoringContext::default(), &NoEnrichment);
        (tracks, matrix)
    }

    #[test]
    fn test_total_score() {
        assert_eq!(total_score(0.0, 5), 1.0);
        assert!((total_score(1.0, 5) - 0.75).abs() < 1e-12);
        assert_eq!(total_score(9.0, 3), 0.0);
        assert_eq!(total_score(0.2, 1), 0.8);
    }

    #[test]
    fn test_energy_curve_peaks_at_configured_position() {
        let (tracks, matrix) = fixture();
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 11, &OptimizerConfig::default());
        assert!((model.target_energy(0) - 0.3).abs() < 1e-9);
        assert!((model.target_energy(7) - 0.9).abs() < 1e-9);
        assert!((model.target_energy(10) - 0.5).abs() < 1e-9);
        assert!(model.target_energy(3) < model.target_energy(6));
        assert!(model.target_energy(9) < model.target_energy(8));
    }

    #[test]
    fn test_position_cost() {
        let (tracks, matrix) = fixture();
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 11, &OptimizerConfig::default());
        // Energy 3/10 sits exactly on the curve at the start
        assert!(model.position_cost(0, 0).abs() < 1e-9);
        assert!((model.position_cost(1, 0) - 0.3).abs() < 1e-9);
        // No energy data costs nothing
        assert_eq!(model.position_cost(3, 5), 0.0);
    }

    #[test]
    fn test_crowd_appeal_discounts_position_cost() {
        let tracks = vec![
            Track::new("a").with_energy(9.0),
            Track::new("b").with_energy(9.0).with_enrichment(keys::CROWD_APPEAL, 1.0),
        ];
        let matrix = CompatibilityMatrix::build(&tracks, &ScoringContext::default(), &NoEnrichment);
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 2, &OptimizerConfig::default());
        let plain = model.position_cost(0, 0);
        let discounted = model.position_cost(1, 0);
        assert!((discounted - plain * 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_diversity_penalises_repeats_in_window() {
        let (tracks, matrix) = fixture();
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 4, &OptimizerConfig::default());
        // Same artist (case-insensitive) and same key in another notation
        assert!((model.diversity_cost(1, &[0]) - 0.25).abs() < 1e-9);
        assert_eq!(model.diversity_cost(2, &[0]), 0.0);
        assert_eq!(model.diversity_cost(1, &[]), 0.0);
    }

    #[test]
    fn test_diversity_window_and_cap() {
        let tracks: Vec<Track> = (0..6)
            .map(|i| {
                Track::new(format!("t{i}"))
                    .with_artist("Same")
                    .with_key("8A")
                    .with_enrichment(keys::SUBGENRE, "deep house")
            })
            .collect();
        let matrix = CompatibilityMatrix::build(&tracks, &ScoringContext::default(), &NoEnrichment);
        let config = OptimizerConfig {
            diversity_window: 1,
            ..OptimizerConfig::default()
        };
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 6, &config);
        assert!((model.diversity_cost(5, &[0, 1, 2]) - 0.35).abs() < 1e-9);

        let wide = CostModel::new(SequenceContext::new(&tracks, &matrix), 6, &OptimizerConfig::default());
        assert_eq!(wide.diversity_cost(5, &[0, 1, 2, 3]), 0.5);
    }

    #[test]
    fn test_diversity_compares_canonical_eras() {
        let tracks = vec![
            Track::new("a").with_enrichment(keys::ERA, "Eighties"),
            Track::new("b").with_enrichment(keys::ERA, "1980s"),
            Track::new("c").with_enrichment(keys::ERA, "90s"),
            Track::new("d").with_key("H dorian"),
            Track::new("e").with_key("h DORIAN"),
        ];
        let matrix = CompatibilityMatrix::build(&tracks, &ScoringContext::default(), &NoEnrichment);
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 5, &OptimizerConfig::default());
        assert!((model.diversity_cost(1, &[0]) - 0.05).abs() < 1e-9);
        assert_eq!(model.diversity_cost(2, &[0]), 0.0);
        // Unparsed keys still match on their label
        assert!((model.diversity_cost(4, &[3]) - 0.05).abs() < 1e-9);
        assert_eq!(model.diversity_cost(3, &[0]), 0.0);
    }

    #[test]
    fn test_path_cost_matches_edge_sum() {
        let (tracks, matrix) = fixture();
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 3, &OptimizerConfig::default());
        let sequence = [0, 2, 1];
        let expected = model.position_cost(0, 0)
            + model.edge_cost(&[0], 2, 1)
            + model.edge_cost(&[0, 2], 1, 2);
        assert!((model.path_cost(&sequence) - expected).abs() < 1e-12);
        assert_eq!(model.path_cost(&[]), 0.0);
    }

    #[test]
    fn test_heuristic_shrinks_towards_last_layer() {
        let (tracks, matrix) = fixture();
        let model = CostModel::new(SequenceContext::new(&tracks, &matrix), 4, &OptimizerConfig::default());
        assert!(model.heuristic(0, 0) >= model.heuristic(0, 1));
        assert_eq!(model.heuristic(0, 3), 0.0);
    }
}
