//! # Playlist Optimizer
//!
//! The public entry point. One call to [`PlaylistOptimizer::optimize`] runs
//! the whole pipeline on call-local state:
//!
//! 1. Validate the request and deduplicate the pool
//! 2. Score every pair once into a [`CompatibilityMatrix`]
//! 3. Build the layered graph and run the bounded A*/beam search
//! 4. Compute the greedy sequence as an incumbent
//! 5. Rank candidates by (hard violations, cost, discovery order)
//! 6. Assemble the result and diagnostics
//!
//! Nothing outlives the call, so independent requests can run on separate
//! threads; [`PlaylistOptimizer::optimize_batch`] does exactly that.
//!
//! ## Example
//!
//! ```
//! use segue::{PlaylistOptimizer, PlaylistRequest, Track};
//!
//! let tracks = vec![
//!     Track::new("a").with_key("8A").with_bpm(124.0).with_energy(5.0),
//!     Track::new("b").with_key("9A").with_bpm(125.0).with_energy(6.0),
//!     Track::new("c").with_key("9B").with_bpm(126.0).with_energy(7.0),
//! ];
//! let request = PlaylistRequest::new(tracks, 3).with_start("a");
//!
//! let result = PlaylistOptimizer::default().optimize(&request).unwrap();
//! assert_eq!(result.tracks[0].id, "a");
//! assert_eq!(result.len(), 3);
//! ```

use crate::compatibility::{missing_attributes, score_pair, CompatibilityMatrix, FactorBreakdown, ScoringContext};
use crate::config::OptimizerConfig;
use crate::constraints::{ConstraintSet, SequenceContext};
use crate::cost::CostModel;
use crate::enrichment::{EnrichmentScorer, MetadataEnrichment};
use crate::error::{Result, SegueError};
use crate::fallback::greedy_sequence;
use crate::graph::PlaylistGraph;
use crate::objective::{FactorWeights, Objective};
use crate::result::{Diagnostics, MissingAttributes, OptimizationResult, ResultAssembler};
use crate::search::{search, SearchOutcome, SearchParams};
use crate::track::Track;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// One sequencing request.
#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub tracks: Vec<Track>,
    pub target_length: usize,
    /// Id of the track to pin at position 0
    pub start_track: Option<String>,
    pub objective: Objective,
    /// Replaces the objective's factor weights when set
    pub weights_override: Option<FactorWeights>,
    /// Replaces the built-in constraint set when set
    pub constraints: Option<ConstraintSet>,
    /// How many alternative sequences to return
    pub alternatives: usize,
}

impl PlaylistRequest {
    pub fn new(tracks: Vec<Track>, target_length: usize) -> Self {
        Self {
            tracks,
            target_length,
            start_track: None,
            objective: Objective::default(),
            weights_override: None,
            constraints: None,
            alternatives: 0,
        }
    }

    #[must_use]
    pub fn with_start(mut self, id: impl Into<String>) -> Self {
        self.start_track = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: FactorWeights) -> Self {
        self.weights_override = Some(weights);
        self
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = Some(constraints);
        self
    }

    #[must_use]
    pub fn with_alternatives(mut self, count: usize) -> Self {
        self.alternatives = count;
        self
    }

    /// Reject requests no sequence can be built for.
    ///
    /// # Errors
    ///
    /// Returns [`SegueError::InvalidRequest`] for a zero target length, an
    /// empty pool, or factor weights that do not sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        if self.target_length == 0 {
            return Err(SegueError::invalid_request("target length must be at least 1"));
        }
        if self.tracks.is_empty() {
            return Err(SegueError::invalid_request("track pool is empty"));
        }
        self.objective.weights().validate()?;
        if let Some(weights) = &self.weights_override {
            weights.validate()?;
        }
        Ok(())
    }

    /// Factor weights in effect for this request
    pub fn weights(&self) -> FactorWeights {
        self.weights_override.unwrap_or_else(|| self.objective.weights())
    }
}

/// Strategy seam for anything that turns a request into a playlist
pub trait Sequencer {
    /// Sequence the request's tracks.
    ///
    /// # Errors
    ///
    /// Returns [`SegueError::InvalidRequest`] for malformed requests.
    fn sequence(&self, request: &PlaylistRequest) -> Result<OptimizationResult>;

    fn name(&self) -> &'static str;
}

/// A*/beam search optimiser with a greedy safety net.
#[derive(Debug, Clone)]
pub struct PlaylistOptimizer {
    config: OptimizerConfig,
    enrichment: Arc<dyn EnrichmentScorer>,
}

impl Default for PlaylistOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default(), Arc::new(MetadataEnrichment))
    }
}

/// A candidate complete sequence
struct Candidate {
    sequence: Vec<usize>,
    cost: f64,
    hard_violations: usize,
    from_greedy: bool,
}

impl PlaylistOptimizer {
    pub fn new(config: OptimizerConfig, enrichment: Arc<dyn EnrichmentScorer>) -> Self {
        Self { config, enrichment }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Factor breakdown for a single transition under an objective
    pub fn score_pair(&self, from: &Track, to: &Track, objective: &Objective) -> FactorBreakdown {
        let context = ScoringContext::new(objective, &self.config);
        score_pair(from, to, &context, self.enrichment.as_ref())
    }

    /// Run independent requests in parallel
    pub fn optimize_batch(&self, requests: &[PlaylistRequest]) -> Vec<Result<OptimizationResult>> {
        requests.par_iter().map(|request| self.optimize(request)).collect()
    }

    /// Sequence one request.
    ///
    /// # Errors
    ///
    /// Returns [`SegueError::InvalidRequest`] for a zero target length, an
    /// empty pool, or invalid factor weights. Every other problem is
    /// reported in the result's diagnostics.
    pub fn optimize(&self, request: &PlaylistRequest) -> Result<OptimizationResult> {
        self.run(request, true)
    }

    fn run(&self, request: &PlaylistRequest, use_search: bool) -> Result<OptimizationResult> {
        let started = Instant::now();
        request.validate()?;

        let mut diagnostics = Diagnostics::new(SearchOutcome::Completed);
        let pool = deduplicate(&request.tracks, &mut diagnostics);
        let start = resolve_start(&pool, request.start_track.as_deref(), &mut diagnostics);
        let length = request.target_length.min(pool.len());

        log::debug!(
            "Optimizing {} tracks into {length} positions (objective {}, start {:?})",
            pool.len(),
            request.objective,
            request.start_track
        );

        for track in &pool {
            let attributes = missing_attributes(track);
            if !attributes.is_empty() {
                log::debug!("Track '{}' is missing {attributes:?}", track.id);
                diagnostics.missing_attributes.push(MissingAttributes {
                    track_id: track.id.clone(),
                    attributes,
                });
            }
        }

        let scoring = ScoringContext::new(&request.objective, &self.config).with_weights(request.weights());
        let matrix = CompatibilityMatrix::build(&pool, &scoring, self.enrichment.as_ref());
        let constraints = request
            .constraints
            .clone()
            .unwrap_or_else(|| ConstraintSet::from_config(&self.config));
        let cost = CostModel::new(SequenceContext::new(&pool, &matrix), length, &self.config);
        let context = cost.context();

        let report = if use_search {
            let graph = PlaylistGraph::build(&matrix, length, start);
            if graph.validate() {
                Some(search(&graph, &cost, &constraints, SearchParams::from(&self.config)))
            } else {
                log::warn!("Search graph failed validation; using greedy sequence");
                diagnostics.note("search graph failed validation");
                None
            }
        } else {
            None
        };
        let mut candidates: Vec<Candidate> = report
            .iter()
            .flat_map(|r| {
                r.terminals.iter().map(move |t| Candidate {
                    sequence: r.tree.path(t.node),
                    cost: t.cost,
                    hard_violations: t.hard_violations,
                    from_greedy: false,
                })
            })
            .collect();

        let nodes_explored = report.as_ref().map_or(0, |r| r.nodes_explored);
        diagnostics.outcome = report.as_ref().map_or(SearchOutcome::Completed, |r| r.outcome);
        if use_search && candidates.is_empty() {
            log::warn!(
                "Search reached no complete sequence ({}); falling back to greedy",
                diagnostics.outcome
            );
        }

        let greedy = greedy_sequence(&matrix, length, start);
        candidates.push(Candidate {
            cost: cost.path_cost(&greedy) + constraints.violation_penalty(&greedy, context),
            hard_violations: constraints.hard_violations(&greedy, context),
            sequence: greedy,
            from_greedy: true,
        });

        // Stable sort keeps discovery order on ties, greedy last
        candidates.sort_by(|a, b| {
            a.hard_violations
                .cmp(&b.hard_violations)
                .then_with(|| a.cost.total_cmp(&b.cost))
        });
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.sequence.clone()));

        let mut ranked = candidates.into_iter();
        let primary = ranked.next().unwrap_or_else(Candidate::empty);
        let alternatives: Vec<Vec<usize>> = if length > 1 {
            ranked.take(request.alternatives).map(|c| c.sequence).collect()
        } else {
            Vec::new()
        };

        diagnostics.fallback_used = primary.from_greedy;
        if primary.hard_violations > 0 {
            log::warn!(
                "No sequence satisfies every hard constraint ({} still failing)",
                primary.hard_violations
            );
            diagnostics.outcome = SearchOutcome::Unsatisfiable;
        }

        let assembler = ResultAssembler {
            cost: &cost,
            constraints: &constraints,
            scoring: &scoring,
            enrichment: self.enrichment.as_ref(),
        };
        let result = assembler.assemble(
            &primary.sequence,
            &alternatives,
            nodes_explored,
            started.elapsed(),
            diagnostics,
        );

        log::debug!(
            "Sequenced {} tracks: score {:.3}, {} nodes, {} violations{}",
            result.len(),
            result.total_score,
            result.nodes_explored,
            result.violations.len(),
            if result.diagnostics.fallback_used { " (greedy)" } else { "" }
        );
        Ok(result)
    }
}

impl Candidate {
    fn empty() -> Self {
        Self {
            sequence: Vec::new(),
            cost: 0.0,
            hard_violations: 0,
            from_greedy: true,
        }
    }
}

impl Sequencer for PlaylistOptimizer {
    fn sequence(&self, request: &PlaylistRequest) -> Result<OptimizationResult> {
        self.optimize(request)
    }

    fn name(&self) -> &'static str {
        "search"
    }
}

/// Greedy-only sequencing, for comparison and very large pools
#[derive(Debug, Clone)]
pub struct GreedySequencer {
    optimizer: PlaylistOptimizer,
}

impl GreedySequencer {
    pub fn new(config: OptimizerConfig, enrichment: Arc<dyn EnrichmentScorer>) -> Self {
        Self {
            optimizer: PlaylistOptimizer::new(config, enrichment),
        }
    }
}

impl Sequencer for GreedySequencer {
    fn sequence(&self, request: &PlaylistRequest) -> Result<OptimizationResult> {
        self.optimizer.run(request, false)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

/// Keep the first track for each id
fn deduplicate(tracks: &[Track], diagnostics: &mut Diagnostics) -> Vec<Track> {
    let mut seen = HashSet::new();
    let mut pool = Vec::with_capacity(tracks.len());
    for track in tracks {
        if seen.insert(track.id.as_str()) {
            pool.push(track.clone());
        } else {
            log::debug!("Dropping duplicate track id '{}'", track.id);
            diagnostics.note(format!("duplicate track id '{}' ignored", track.id));
        }
    }
    pool
}

fn resolve_start(pool: &[Track], start: Option<&str>, diagnostics: &mut Diagnostics) -> Option<usize> {
    let id = start?;
    let index = pool.iter().position(|t| t.id == id);
    if index.is_none() {
        log::warn!("Start track '{id}' is not in the pool; ignoring it");
        diagnostics.note(format!("start track '{id}' not found; sequence starts freely"));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraint, ConstraintClass, Rule};

    fn pool() -> Vec<Track> {
        vec![
            Track::new("a").with_key("8A").with_bpm(124.0).with_energy(4.0),
            Track::new("b").with_key("9A").with_bpm(125.0).with_energy(5.0),
            Track::new("c").with_key("9B").with_bpm(126.0).with_energy(6.0),
            Track::new("d").with_key("10A").with_bpm(127.0).with_energy(7.0),
            Track::new("e").with_key("10B").with_bpm(128.0).with_energy(8.0),
        ]
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let optimizer = PlaylistOptimizer::default();
        let zero = PlaylistRequest::new(pool(), 0);
        assert!(matches!(optimizer.optimize(&zero), Err(SegueError::InvalidRequest { .. })));
        let empty = PlaylistRequest::new(Vec::new(), 3);
        assert!(optimizer.optimize(&empty).is_err());
        let bad_weights = PlaylistRequest::new(pool(), 3).with_weights(FactorWeights::new(0.5, 0.5, 0.5, 0.5));
        assert!(optimizer.optimize(&bad_weights).is_err());
        let bad_custom = PlaylistRequest::new(pool(), 3)
            .with_objective(Objective::Custom(FactorWeights::new(0.1, 0.1, 0.1, 0.1)));
        assert!(optimizer.optimize(&bad_custom).is_err());
    }

    #[test]
    fn test_start_track_leads() {
        let request = PlaylistRequest::new(pool(), 4).with_start("c");
        let result = PlaylistOptimizer::default().optimize(&request).unwrap();
        assert_eq!(result.tracks[0].id, "c");
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_unknown_start_is_noted() {
        let request = PlaylistRequest::new(pool(), 3).with_start("zzz");
        let result = PlaylistOptimizer::default().optimize(&request).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.diagnostics.notes.iter().any(|n| n.contains("zzz")));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut tracks = pool();
        tracks.push(Track::new("a").with_key("1B").with_bpm(90.0).with_energy(1.0));
        let request = PlaylistRequest::new(tracks, 10);
        let result = PlaylistOptimizer::default().optimize(&request).unwrap();
        assert_eq!(result.len(), 5);
        let a = result.tracks.iter().find(|t| t.id == "a").unwrap();
        assert_eq!(a.key.as_deref(), Some("8A"));
        assert!(result.diagnostics.notes.iter().any(|n| n.contains("duplicate")));
    }

    #[test]
    fn test_alternatives_are_distinct() {
        let request = PlaylistRequest::new(pool(), 4).with_start("a").with_alternatives(2);
        let config = OptimizerConfig {
            early_termination_score: 1.0,
            ..OptimizerConfig::default()
        };
        let optimizer = PlaylistOptimizer::new(config, Arc::new(MetadataEnrichment));
        let result = optimizer.optimize(&request).unwrap();
        assert_eq!(result.alternatives.len(), 2);
        let primary = result.track_ids();
        for alternative in &result.alternatives {
            let ids: Vec<&str> = alternative.iter().map(|t| t.id.as_str()).collect();
            assert_ne!(ids, primary);
            assert_eq!(ids[0], "a");
        }
    }

    #[test]
    fn test_single_track_has_no_alternatives() {
        let request = PlaylistRequest::new(pool(), 1).with_alternatives(3);
        let result = PlaylistOptimizer::default().optimize(&request).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.alternatives.is_empty());
        assert!(result.objective_scores.is_empty());
    }

    #[test]
    fn test_tiny_budget_falls_back_to_greedy() {
        let config = OptimizerConfig {
            max_nodes: 1,
            ..OptimizerConfig::default()
        };
        let optimizer = PlaylistOptimizer::new(config, Arc::new(MetadataEnrichment));
        let result = optimizer.optimize(&PlaylistRequest::new(pool(), 5)).unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.diagnostics.fallback_used);
        assert_eq!(result.diagnostics.outcome, SearchOutcome::BudgetExhausted);
        assert_eq!(result.nodes_explored, 1);
    }

    #[derive(Debug)]
    struct NeverFirst(&'static str);

    impl Rule for NeverFirst {
        fn name(&self) -> &str {
            "never_first"
        }

        fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
            sequence.first().map_or(true, |&i| context.tracks[i].id != self.0)
        }

        fn describe(&self, _sequence: &[usize], _context: &SequenceContext<'_>) -> String {
            format!("'{}' may not open the set", self.0)
        }
    }

    #[test]
    fn test_unsatisfiable_hard_rule_is_reported() {
        let constraints = ConstraintSet::from_config(&OptimizerConfig::default())
            .with(Constraint::new(NeverFirst("a"), ConstraintClass::Hard, 1.0, 5.0));
        let request = PlaylistRequest::new(pool(), 3)
            .with_start("a")
            .with_constraints(constraints);
        let result = PlaylistOptimizer::default().optimize(&request).unwrap();
        assert_eq!(result.tracks[0].id, "a");
        assert_eq!(result.diagnostics.outcome, SearchOutcome::Unsatisfiable);
        assert!(result.diagnostics.fallback_used);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "never_first" && v.class == ConstraintClass::Hard));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let optimizer = PlaylistOptimizer::default();
        let requests = vec![
            PlaylistRequest::new(pool(), 3).with_start("a"),
            PlaylistRequest::new(pool(), 0),
            PlaylistRequest::new(pool(), 5).with_objective(Objective::EnergyFlow),
        ];
        let batch = optimizer.optimize_batch(&requests);
        assert_eq!(batch.len(), 3);
        assert!(batch[1].is_err());
        for (request, result) in requests.iter().zip(&batch) {
            if let Ok(result) = result {
                let sequential = optimizer.optimize(request).unwrap();
                assert_eq!(result.track_ids(), sequential.track_ids());
            }
        }
    }

    #[test]
    fn test_greedy_sequencer() {
        let greedy = GreedySequencer::new(OptimizerConfig::default(), Arc::new(MetadataEnrichment));
        let result = greedy.sequence(&PlaylistRequest::new(pool(), 4).with_start("b")).unwrap();
        assert_eq!(greedy.name(), "greedy");
        assert_eq!(result.tracks[0].id, "b");
        assert!(result.diagnostics.fallback_used);
        assert_eq!(result.nodes_explored, 0);
    }
}
