//! Sequence constraints.
//!
//! A [`ConstraintSet`] is an explicit value handed to each optimisation call.
//! Rules come in three classes:
//!
//! - **hard**: a sequence (or prefix) breaking the rule is pruned from search
//! - **soft**: breaking the rule adds `weight * penalty` to the sequence cost
//! - **preference**: same as soft, with smaller default weights
//!
//! ## Built-in rules
//!
//! | Rule | Class | Weight | Penalty |
//! |------|-------|--------|---------|
//! | `no_duplicates` | hard | 1.0 | 10.0 |
//! | `min_compatibility` | soft | 0.8 | 2.0 |
//! | `energy_flow` | soft | 0.6 | 1.5 |
//! | `cultural_coherence` | preference | 0.4 | 0.5 |

use crate::camelot::CamelotKey;
use crate::compatibility::CompatibilityMatrix;
use crate::config::OptimizerConfig;
use crate::enrichment::{canonical_era, canonical_language};
use crate::track::Track;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Elimination strength of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintClass {
    Hard,
    Soft,
    Preference,
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintClass::Hard => "hard",
            ConstraintClass::Soft => "soft",
            ConstraintClass::Preference => "preference",
        })
    }
}

/// A track key as compared for repeats: on the wheel when it parses,
/// otherwise the lowercased label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLabel {
    Wheel(CamelotKey),
    Raw(String),
}

/// Track attributes compared on every search step, normalised once per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFeatures {
    /// Trimmed, ASCII-lowercased; `None` when blank
    pub artist: Option<String>,
    pub key: Option<KeyLabel>,
    /// Canonical era name
    pub era: Option<String>,
    /// Canonical language name
    pub language: Option<String>,
    pub subgenre: Option<String>,
}

impl TrackFeatures {
    pub fn of(track: &Track) -> Self {
        let artist = track.artist.trim();
        Self {
            artist: (!artist.is_empty()).then(|| artist.to_ascii_lowercase()),
            key: track.key.as_deref().map(|label| match CamelotKey::parse(label) {
                Some(key) => KeyLabel::Wheel(key),
                None => KeyLabel::Raw(label.trim().to_ascii_lowercase()),
            }),
            era: track.era().map(|era| canonical_era(&era)),
            language: track.language().map(|language| canonical_language(&language)),
            subgenre: track.subgenre(),
        }
    }
}

/// What a rule can see: the deduplicated pool, its compatibility matrix and
/// the normalised features of every track.
/// Sequences are slices of indices into `tracks`.
#[derive(Debug, Clone)]
pub struct SequenceContext<'a> {
    pub tracks: &'a [Track],
    pub matrix: &'a CompatibilityMatrix,
    features: Vec<TrackFeatures>,
}

impl<'a> SequenceContext<'a> {
    pub fn new(tracks: &'a [Track], matrix: &'a CompatibilityMatrix) -> Self {
        Self {
            tracks,
            matrix,
            features: tracks.iter().map(TrackFeatures::of).collect(),
        }
    }

    #[inline]
    pub fn features(&self, item: usize) -> &TrackFeatures {
        &self.features[item]
    }
}

/// Which pool items a search prefix already holds
#[derive(Debug, Clone, Default)]
pub struct PrefixMembers {
    present: Vec<bool>,
}

impl PrefixMembers {
    pub fn new(pool_size: usize) -> Self {
        Self {
            present: vec![false; pool_size],
        }
    }

    #[inline]
    pub fn contains(&self, item: usize) -> bool {
        self.present.get(item).copied().unwrap_or(false)
    }

    pub fn insert_all(&mut self, items: &[usize]) {
        for &item in items {
            if let Some(slot) = self.present.get_mut(item) {
                *slot = true;
            }
        }
    }

    pub fn remove_all(&mut self, items: &[usize]) {
        for &item in items {
            if let Some(slot) = self.present.get_mut(item) {
                *slot = false;
            }
        }
    }
}

/// A predicate over a sequence prefix or full sequence.
pub trait Rule: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// `true` when the sequence satisfies the rule
    fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool;

    /// Human-readable account of why the sequence breaks the rule
    fn describe(&self, sequence: &[usize], context: &SequenceContext<'_>) -> String;

    /// `check` for a sequence whose prefix (all but the last item) is known
    /// to pass. `members` holds the items of that prefix.
    fn check_extension(&self, extended: &[usize], members: &PrefixMembers, context: &SequenceContext<'_>) -> bool {
        let _ = members;
        self.check(extended, context)
    }
}

/// Every track appears at most once
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDuplicates;

impl NoDuplicates {
    fn repeated<'a>(sequence: &[usize], context: &SequenceContext<'a>) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        sequence
            .iter()
            .filter(|&&i| !seen.insert(i))
            .map(|&i| context.tracks[i].id.as_str())
            .collect()
    }
}

impl Rule for NoDuplicates {
    fn name(&self) -> &str {
        "no_duplicates"
    }

    fn check(&self, sequence: &[usize], _context: &SequenceContext<'_>) -> bool {
        let mut seen = HashSet::with_capacity(sequence.len());
        sequence.iter().all(|i| seen.insert(*i))
    }

    fn describe(&self, sequence: &[usize], context: &SequenceContext<'_>) -> String {
        format!(
            "Tracks repeated in sequence: {}",
            Self::repeated(sequence, context).join(", ")
        )
    }

    fn check_extension(&self, extended: &[usize], members: &PrefixMembers, _context: &SequenceContext<'_>) -> bool {
        extended.last().map_or(true, |&item| !members.contains(item))
    }
}

/// Every adjacent pair scores at least `threshold`
#[derive(Debug, Clone, Copy)]
pub struct MinCompatibility {
    pub threshold: f64,
}

impl MinCompatibility {
    fn weak_transitions(&self, sequence: &[usize], context: &SequenceContext<'_>) -> Vec<(usize, usize, f64)> {
        sequence
            .windows(2)
            .map(|pair| (pair[0], pair[1], context.matrix.score(pair[0], pair[1])))
            .filter(|(_, _, score)| *score < self.threshold)
            .collect()
    }
}

impl Rule for MinCompatibility {
    fn name(&self) -> &str {
        "min_compatibility"
    }

    fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        self.weak_transitions(sequence, context).is_empty()
    }

    fn describe(&self, sequence: &[usize], context: &SequenceContext<'_>) -> String {
        let transitions: Vec<String> = self
            .weak_transitions(sequence, context)
            .into_iter()
            .map(|(from, to, score)| {
                format!(
                    "'{}' -> '{}' scores {score:.2}",
                    context.tracks[from].label(),
                    context.tracks[to].label()
                )
            })
            .collect();
        format!(
            "Low-compatibility transitions (minimum {:.2}): {}",
            self.threshold,
            transitions.join("; ")
        )
    }
}

/// No more than `max_jump_ratio` of transitions jump by over `jump_threshold`
/// energy units. Sequences shorter than three tracks always pass.
#[derive(Debug, Clone, Copy)]
pub struct EnergyFlow {
    pub jump_threshold: f64,
    pub max_jump_ratio: f64,
}

impl EnergyFlow {
    /// (abrupt jumps, transitions with energy on both sides)
    fn jumps(&self, sequence: &[usize], context: &SequenceContext<'_>) -> (usize, usize) {
        sequence
            .windows(2)
            .filter_map(|pair| {
                let a = context.tracks[pair[0]].energy?;
                let b = context.tracks[pair[1]].energy?;
                Some((a - b).abs() > self.jump_threshold)
            })
            .fold((0, 0), |(jumps, total), jump| (jumps + usize::from(jump), total + 1))
    }
}

impl Rule for EnergyFlow {
    fn name(&self) -> &str {
        "energy_flow"
    }

    fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        if sequence.len() < 3 {
            return true;
        }
        let (jumps, total) = self.jumps(sequence, context);
        #[allow(clippy::cast_precision_loss)]
        let ratio = if total == 0 { 0.0 } else { jumps as f64 / total as f64 };
        ratio <= self.max_jump_ratio
    }

    fn describe(&self, sequence: &[usize], context: &SequenceContext<'_>) -> String {
        let (jumps, total) = self.jumps(sequence, context);
        format!(
            "{jumps} of {total} transitions jump more than {:.1} energy units",
            self.jump_threshold
        )
    }
}

/// Bounds the number of distinct eras and languages in a sequence
#[derive(Debug, Clone, Copy)]
pub struct CulturalCoherence {
    pub max_eras: usize,
    pub max_languages: usize,
}

/// Distinct canonical eras and languages across a sequence
pub(crate) fn cultural_clusters<'c>(
    sequence: &[usize],
    context: &'c SequenceContext<'_>,
) -> (HashSet<&'c str>, HashSet<&'c str>) {
    let eras = sequence
        .iter()
        .filter_map(|&i| context.features(i).era.as_deref())
        .collect();
    let languages = sequence
        .iter()
        .filter_map(|&i| context.features(i).language.as_deref())
        .collect();
    (eras, languages)
}

impl Rule for CulturalCoherence {
    fn name(&self) -> &str {
        "cultural_coherence"
    }

    fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        let (eras, languages) = cultural_clusters(sequence, context);
        eras.len() <= self.max_eras && languages.len() <= self.max_languages
    }

    fn describe(&self, sequence: &[usize], context: &SequenceContext<'_>) -> String {
        let (eras, languages) = cultural_clusters(sequence, context);
        format!(
            "{} eras (max {}) and {} languages (max {}) in sequence",
            eras.len(),
            self.max_eras,
            languages.len(),
            self.max_languages
        )
    }
}

/// A rule with its class and cost.
#[derive(Debug, Clone)]
pub struct Constraint {
    rule: Arc<dyn Rule>,
    class: ConstraintClass,
    weight: f64,
    penalty: f64,
}

impl Constraint {
    pub fn new(rule: impl Rule + 'static, class: ConstraintClass, weight: f64, penalty: f64) -> Self {
        Self {
            rule: Arc::new(rule),
            class,
            weight,
            penalty,
        }
    }

    pub fn name(&self) -> &str {
        self.rule.name()
    }

    pub fn class(&self) -> ConstraintClass {
        self.class
    }

    pub fn is_hard(&self) -> bool {
        self.class == ConstraintClass::Hard
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Cost added to a sequence that breaks this constraint
    pub fn cost(&self) -> f64 {
        self.weight * self.penalty
    }

    pub fn check(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        self.rule.check(sequence, context)
    }

    pub fn check_extension(&self, extended: &[usize], members: &PrefixMembers, context: &SequenceContext<'_>) -> bool {
        self.rule.check_extension(extended, members, context)
    }
}

/// A failing rule on a finished sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: String,
    pub class: ConstraintClass,
    pub penalty: f64,
    pub description: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (+{:.2}): {}",
            self.class, self.rule, self.penalty, self.description
        )
    }
}

/// An ordered set of constraints.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// A set with no constraints at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The four built-in rules with thresholds from `config`
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self::empty()
            .with(Constraint::new(NoDuplicates, ConstraintClass::Hard, 1.0, 10.0))
            .with(Constraint::new(
                MinCompatibility {
                    threshold: config.min_compatibility,
                },
                ConstraintClass::Soft,
                0.8,
                2.0,
            ))
            .with(Constraint::new(
                EnergyFlow {
                    jump_threshold: config.energy_jump_threshold,
                    max_jump_ratio: config.max_energy_jump_ratio,
                },
                ConstraintClass::Soft,
                0.6,
                1.5,
            ))
            .with(Constraint::new(
                CulturalCoherence {
                    max_eras: config.max_eras,
                    max_languages: config.max_languages,
                },
                ConstraintClass::Preference,
                0.4,
                0.5,
            ))
    }

    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Check one rule by name; `None` if the set has no such rule
    pub fn check(&self, name: &str, sequence: &[usize], context: &SequenceContext<'_>) -> Option<bool> {
        self.iter()
            .find(|c| c.name() == name)
            .map(|c| c.check(sequence, context))
    }

    /// Whether every rule of every class passes
    pub fn check_all(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        self.iter().all(|c| c.check(sequence, context))
    }

    /// Whether every hard rule passes; used to prune search prefixes
    pub fn satisfies_hard(&self, sequence: &[usize], context: &SequenceContext<'_>) -> bool {
        self.iter()
            .filter(|c| c.is_hard())
            .all(|c| c.check(sequence, context))
    }

    /// `satisfies_hard` for a prefix already known to pass, extended by one
    /// item; `members` holds the items of the unextended prefix
    pub fn admits(&self, extended: &[usize], members: &PrefixMembers, context: &SequenceContext<'_>) -> bool {
        self.iter()
            .filter(|c| c.is_hard())
            .all(|c| c.check_extension(extended, members, context))
    }

    pub fn hard_violations(&self, sequence: &[usize], context: &SequenceContext<'_>) -> usize {
        self.iter()
            .filter(|c| c.is_hard() && !c.check(sequence, context))
            .count()
    }

    /// Summed `weight * penalty` of every failing rule
    pub fn violation_penalty(&self, sequence: &[usize], context: &SequenceContext<'_>) -> f64 {
        self.iter()
            .filter(|c| !c.check(sequence, context))
            .map(Constraint::cost)
            .sum()
    }

    /// Every failing rule with its penalty and an explanation
    pub fn violations(&self, sequence: &[usize], context: &SequenceContext<'_>) -> Vec<Violation> {
        self.iter()
            .filter(|c| !c.check(sequence, context))
            .map(|c| Violation {
                rule: c.name().to_string(),
                class: c.class(),
                penalty: c.cost(),
                description: c.rule.describe(sequence, context),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::ScoringContext;
    use crate::enrichment::NoEnrichment;
    use crate::track::keys;

    fn pool() -> Vec<Track> {
        vec![
            Track::new("a").with_key("8A").with_bpm(124.0).with_energy(5.0),
            Track::new("b").with_key("8A").with_bpm(124.0).with_energy(5.0),
            Track::new("c").with_key("2B").with_bpm(200.0).with_energy(9.5),
            Track::new("d").with_key("9A").with_bpm(125.0).with_energy(1.0),
        ]
    }

    fn matrix(tracks: &[Track]) -> CompatibilityMatrix {
        CompatibilityMatrix::build(tracks, &ScoringContext::default(), &NoEnrichment)
    }

    #[test]
    fn test_no_duplicates() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        assert!(NoDuplicates.check(&[0, 1, 2], &ctx));
        assert!(!NoDuplicates.check(&[0, 1, 0], &ctx));
        assert!(NoDuplicates.describe(&[0, 1, 0], &ctx).contains('a'));
    }

    #[test]
    fn test_min_compatibility_names_weak_transition() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let rule = MinCompatibility { threshold: 0.3 };
        assert!(rule.check(&[0, 1], &ctx));
        assert!(!rule.check(&[0, 2], &ctx));
        let description = rule.describe(&[0, 1, 2], &ctx);
        assert!(description.contains("'b' -> 'c'"), "{description}");
    }

    #[test]
    fn test_energy_flow_ratio() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let rule = EnergyFlow {
            jump_threshold: 3.0,
            max_jump_ratio: 0.5,
        };
        // Short sequences always pass
        assert!(rule.check(&[2, 3], &ctx));
        // 5 -> 5 -> 9.5: one jump of two transitions
        assert!(rule.check(&[0, 1, 2], &ctx));
        // 5 -> 9.5 -> 1: two jumps of two
        assert!(!rule.check(&[0, 2, 3], &ctx));
    }

    #[test]
    fn test_cultural_coherence_uses_canonical_names() {
        let tracks = vec![
            Track::new("a").with_enrichment(keys::ERA, "80s").with_enrichment(keys::LANGUAGE, "english"),
            Track::new("b").with_enrichment(keys::ERA, "eighties").with_enrichment(keys::LANGUAGE, "English"),
            Track::new("c").with_enrichment(keys::ERA, "1990s").with_enrichment(keys::LANGUAGE, "spanish"),
            Track::new("d").with_enrichment(keys::ERA, "2020s").with_enrichment(keys::LANGUAGE, "español"),
        ];
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let strict = CulturalCoherence {
            max_eras: 2,
            max_languages: 2,
        };
        assert!(strict.check(&[0, 1, 2], &ctx));
        assert!(!strict.check(&[0, 1, 2, 3], &ctx));
    }

    #[test]
    fn test_violation_penalty_sums_failing_rules() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let set = ConstraintSet::from_config(&OptimizerConfig::default());
        assert_eq!(set.len(), 4);

        assert_eq!(set.violation_penalty(&[0, 1], &ctx), 0.0);
        assert!(set.check_all(&[0, 1], &ctx));

        // 0 -> 2 -> 3: weak transitions and two energy jumps
        let penalty = set.violation_penalty(&[0, 2, 3], &ctx);
        assert!((penalty - (0.8 * 2.0 + 0.6 * 1.5)).abs() < 1e-9);
        let violations = set.violations(&[0, 2, 3], &ctx);
        let names: Vec<&str> = violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(names, vec!["min_compatibility", "energy_flow"]);
        assert_eq!(violations[0].class, ConstraintClass::Soft);
    }

    #[test]
    fn test_hard_rules_separate_from_soft() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let set = ConstraintSet::from_config(&OptimizerConfig::default());
        assert!(set.satisfies_hard(&[0, 2, 3], &ctx));
        assert!(!set.satisfies_hard(&[0, 1, 0], &ctx));
        assert_eq!(set.hard_violations(&[0, 1, 0], &ctx), 1);
        assert_eq!(set.check("no_duplicates", &[0, 0], &ctx), Some(false));
        assert_eq!(set.check("missing_rule", &[0], &ctx), None);
    }

    #[test]
    fn test_features_normalise_notation() {
        let tracks = vec![
            Track::new("a").with_artist(" Band ").with_key("Am").with_enrichment(keys::ERA, "eighties"),
            Track::new("b").with_artist("BAND").with_key("8A").with_enrichment(keys::ERA, "80s"),
            Track::new("c").with_artist("  ").with_key("H dorian").with_enrichment(keys::LANGUAGE, "Español"),
        ];
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        assert_eq!(ctx.features(0).artist, ctx.features(1).artist);
        assert_eq!(ctx.features(0).key, ctx.features(1).key);
        assert_eq!(ctx.features(0).era, ctx.features(1).era);
        assert_eq!(ctx.features(2).artist, None);
        assert_eq!(ctx.features(2).key, Some(KeyLabel::Raw("h dorian".to_string())));
        assert_eq!(ctx.features(2).language.as_deref(), Some(canonical_language("spanish").as_str()));
    }

    #[test]
    fn test_admits_agrees_with_full_hard_check() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let set = ConstraintSet::from_config(&OptimizerConfig::default());
        let prefix = [0, 2];
        let mut members = PrefixMembers::new(tracks.len());
        members.insert_all(&prefix);
        for item in 0..tracks.len() {
            let extended = [prefix[0], prefix[1], item];
            assert_eq!(set.admits(&extended, &members, &ctx), set.satisfies_hard(&extended, &ctx));
        }
        members.remove_all(&prefix);
        assert!(!members.contains(0));
        assert!(!members.contains(99));
    }

    #[derive(Debug)]
    struct NoTrack(usize);

    impl Rule for NoTrack {
        fn name(&self) -> &str {
            "no_track"
        }

        fn check(&self, sequence: &[usize], _context: &SequenceContext<'_>) -> bool {
            !sequence.contains(&self.0)
        }

        fn describe(&self, _sequence: &[usize], _context: &SequenceContext<'_>) -> String {
            format!("track {} is banned", self.0)
        }
    }

    #[test]
    fn test_admits_runs_full_check_for_custom_rules() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let set = ConstraintSet::empty().with(Constraint::new(NoTrack(3), ConstraintClass::Hard, 1.0, 1.0));
        let mut members = PrefixMembers::new(tracks.len());
        members.insert_all(&[0]);
        assert!(set.admits(&[0, 2], &members, &ctx));
        assert!(!set.admits(&[0, 3], &members, &ctx));
    }

    #[test]
    fn test_empty_set_never_fails() {
        let tracks = pool();
        let matrix = matrix(&tracks);
        let ctx = SequenceContext::new(&tracks, &matrix);
        let set = ConstraintSet::empty();
        assert!(set.check_all(&[0, 0, 0], &ctx));
        assert!(set.violations(&[0, 0], &ctx).is_empty());
    }
}
