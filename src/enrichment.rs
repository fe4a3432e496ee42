//! Enrichment-aware refinements to compatibility scores.
//!
//! Era, language, danceability and crowd appeal come from an external
//! metadata collaborator and may be missing entirely. The scorer queries an
//! [`EnrichmentScorer`] for additive refinements; [`NoEnrichment`] contributes
//! nothing, so the core four-factor result is unchanged without metadata.

use crate::track::Track;
use std::collections::HashMap;
use std::fmt;

/// Years over which era proximity decays to zero
const ERA_DECAY_YEARS: f64 = 40.0;
/// Score for language pairs the transition table does not know
const NEUTRAL_LANGUAGE_SCORE: f64 = 0.5;

/// Signed refinements, each in -1..=1, to add to factor scores.
///
/// The scorer scales them by the objective's enrichment strength.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Refinement {
    /// Danceability and crowd appeal: how mixable the pair is on the floor
    pub harmonic: f64,
    /// Era and language: how well the pair reads as one story
    pub auxiliary: f64,
}

impl Refinement {
    pub fn is_neutral(&self) -> bool {
        self.harmonic == 0.0 && self.auxiliary == 0.0
    }
}

/// Optional capability queried by the compatibility scorer.
pub trait EnrichmentScorer: Send + Sync + fmt::Debug {
    /// Refinements for the transition between two tracks. Must be symmetric.
    fn refine(&self, from: &Track, to: &Track) -> Refinement;

    /// Whether this scorer can contribute anything at all
    fn is_active(&self) -> bool {
        true
    }
}

/// Scorer used when no enrichment collaborator is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl EnrichmentScorer for NoEnrichment {
    fn refine(&self, _from: &Track, _to: &Track) -> Refinement {
        Refinement::default()
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Reads era, language, danceability and crowd appeal from each track's
/// enrichment map.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataEnrichment;

impl EnrichmentScorer for MetadataEnrichment {
    fn refine(&self, from: &Track, to: &Track) -> Refinement {
        let cultural = [
            both(from.era(), to.era()).and_then(|(a, b)| era_proximity(&a, &b)),
            both(from.language(), to.language()).map(|(a, b)| language_transition(&a, &b)),
        ];
        let groove = [
            both(from.danceability(), to.danceability()).map(|(a, b)| 1.0 - (a - b).abs()),
            both(from.crowd_appeal(), to.crowd_appeal()).map(|(a, b)| a.min(b)),
        ];

        Refinement {
            harmonic: centered_mean(&groove),
            auxiliary: centered_mean(&cultural),
        }
    }
}

fn both<T>(a: Option<T>, b: Option<T>) -> Option<(T, T)> {
    a.zip(b)
}

/// Mean of the present scores mapped from 0..=1 onto -1..=1; 0 when none present
fn centered_mean(scores: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = scores.iter().flatten().copied().collect();
    if present.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    (mean - 0.5) * 2.0
}

/// A named era resolved to a span of years
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraSpan {
    pub canonical: &'static str,
    pub start: u16,
    pub end: u16,
}

impl EraSpan {
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.start) + f64::from(self.end)) / 2.0
    }
}

/// Directional language transition scores
const LANGUAGE_TRANSITIONS: &[(&str, &str, f64)] = &[
    ("Spanish", "Portuguese", 0.8),
    ("Spanish", "Instrumental", 0.9),
    ("Spanish", "English", 0.4),
    ("Spanish", "French", 0.5),
    ("Spanish", "Italian", 0.6),
    ("English", "Instrumental", 0.9),
    ("English", "Spanish", 0.4),
    ("English", "Portuguese", 0.3),
    ("English", "French", 0.5),
    ("Portuguese", "Spanish", 0.8),
    ("Portuguese", "Instrumental", 0.9),
    ("Portuguese", "English", 0.3),
    ("Instrumental", "Spanish", 0.9),
    ("Instrumental", "English", 0.9),
    ("Instrumental", "Portuguese", 0.9),
    ("Instrumental", "French", 0.9),
    ("Instrumental", "Italian", 0.9),
    ("French", "Instrumental", 0.9),
    ("French", "Italian", 0.7),
    ("French", "Spanish", 0.5),
    ("French", "English", 0.5),
    ("Italian", "Instrumental", 0.9),
    ("Italian", "French", 0.7),
    ("Italian", "Spanish", 0.6),
];

lazy_static::lazy_static! {
    static ref ERAS: HashMap<&'static str, EraSpan> = {
        let span = |canonical, start, end| EraSpan { canonical, start, end };
        let mut m = HashMap::new();
        for alias in ["60s", "1960s", "sixties"] {
            m.insert(alias, span("1960s", 1960, 1969));
        }
        for alias in ["70s", "1970s", "seventies"] {
            m.insert(alias, span("1970s", 1970, 1979));
        }
        for alias in ["80s", "1980s", "eighties"] {
            m.insert(alias, span("1980s", 1980, 1989));
        }
        for alias in ["90s", "1990s", "nineties"] {
            m.insert(alias, span("1990s", 1990, 1999));
        }
        m.insert("2000s", span("2000s", 2000, 2009));
        m.insert("2010s", span("2010s", 2010, 2019));
        m.insert("2020s", span("2020s", 2020, 2029));
        m.insert("classic", span("Classic", 1960, 1985));
        m.insert("vintage", span("Vintage", 1960, 1980));
        m.insert("golden", span("Golden Age", 1970, 1990));
        m.insert("golden age", span("Golden Age", 1970, 1990));
        m.insert("modern", span("Modern", 2010, 2025));
        m.insert("contemporary", span("Contemporary", 2015, 2025));
        m
    };

    static ref LANGUAGES: HashMap<&'static str, &'static str> = [
        ("spanish", "Spanish"),
        ("español", "Spanish"),
        ("english", "English"),
        ("portuguese", "Portuguese"),
        ("instrumental", "Instrumental"),
        ("french", "French"),
        ("italian", "Italian"),
    ]
    .into_iter()
    .collect();
}

/// Resolve an era label (`80s`, `1985`, `golden age`, `2030s`) to a span of years
pub fn resolve_era(label: &str) -> Option<EraSpan> {
    let label = label.trim().to_lowercase();
    if let Some(span) = ERAS.get(label.as_str()) {
        return Some(*span);
    }
    // Bare years and decades outside the table
    let digits = label.strip_suffix('s').unwrap_or(&label);
    let year: u16 = digits.parse().ok().filter(|y| (1900..=2100).contains(y))?;
    let (start, end) = if label.ends_with('s') { (year, year + 9) } else { (year, year) };
    Some(EraSpan {
        canonical: "",
        start,
        end,
    })
}

/// Canonical era name for clustering; unknown labels are kept as written
pub fn canonical_era(label: &str) -> String {
    match resolve_era(label) {
        Some(span) if !span.canonical.is_empty() => span.canonical.to_string(),
        _ => label.trim().to_lowercase(),
    }
}

/// How close two eras are in time, 0..=1
pub fn era_proximity(a: &str, b: &str) -> Option<f64> {
    let (a, b) = (resolve_era(a)?, resolve_era(b)?);
    let gap = (a.midpoint() - b.midpoint()).abs();
    Some((1.0 - gap / ERA_DECAY_YEARS).max(0.0))
}

/// Canonical language name for clustering; unknown languages are kept as written
pub fn canonical_language(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    LANGUAGES
        .get(lower.as_str())
        .map_or(lower, |canonical| (*canonical).to_string())
}

/// Symmetric language transition score, 0..=1
pub fn language_transition(a: &str, b: &str) -> f64 {
    let (a, b) = (canonical_language(a), canonical_language(b));
    if a == b {
        return 1.0;
    }
    let lookup = |from: &str, to: &str| {
        LANGUAGE_TRANSITIONS
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, score)| *score)
    };
    let forward = lookup(&a, &b);
    let backward = lookup(&b, &a);
    match (forward, backward) {
        (Some(f), Some(r)) => (f + r) / 2.0,
        (Some(s), None) | (None, Some(s)) => s,
        (None, None) => NEUTRAL_LANGUAGE_SCORE,
    }
}
