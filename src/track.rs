//! Track data model.
//!
//! A [`Track`] is an immutable input owned by the caller for the duration of
//! an optimisation call. Core attributes (key, tempo, energy, emotional
//! intensity) are precomputed by an external analyser; the free-form
//! `enrichment` map is supplied by an external metadata collaborator.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Track identity, unique within one request
pub type TrackId = String;

/// Free-form enrichment attributes (era, language, danceability, crowd appeal, subgenre, ...)
pub type Enrichment = HashMap<String, Value>;

/// Well-known enrichment keys
pub mod keys {
    pub const ERA: &str = "era";
    pub const LANGUAGE: &str = "language";
    pub const DANCEABILITY: &str = "danceability";
    pub const CROWD_APPEAL: &str = "crowd_appeal";
    pub const SUBGENRE: &str = "subgenre";
}

/// A track with precomputed musical attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Harmonic key label, e.g. `8A`, `1d` or `A minor`
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Energy level, 0-10
    #[serde(default)]
    pub energy: Option<f64>,
    /// Emotional intensity, 0-10
    #[serde(default)]
    pub emotional_intensity: Option<f64>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub enrichment: Enrichment,
}

impl Track {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    #[must_use]
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    #[must_use]
    pub fn with_emotional_intensity(mut self, intensity: f64) -> Self {
        self.emotional_intensity = Some(intensity);
        self
    }

    #[must_use]
    pub fn with_enrichment(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.enrichment.insert(key.to_string(), value.into());
        self
    }

    /// Lowercased, trimmed text value for an enrichment key.
    ///
    /// Empty strings and the `-` placeholder count as absent.
    pub fn enrichment_text(&self, key: &str) -> Option<String> {
        match self.enrichment.get(key)? {
            Value::String(s) => {
                let s = s.trim().to_lowercase();
                (!s.is_empty() && s != "-").then_some(s)
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Enrichment value normalised to a 0..=1 ratio
    pub fn enrichment_ratio(&self, key: &str) -> Option<f64> {
        self.enrichment.get(key).and_then(normalize_percentage)
    }

    pub fn era(&self) -> Option<String> {
        self.enrichment_text(keys::ERA)
    }

    pub fn language(&self) -> Option<String> {
        self.enrichment_text(keys::LANGUAGE)
    }

    pub fn subgenre(&self) -> Option<String> {
        self.enrichment_text(keys::SUBGENRE)
    }

    pub fn danceability(&self) -> Option<f64> {
        self.enrichment_ratio(keys::DANCEABILITY)
    }

    pub fn crowd_appeal(&self) -> Option<f64> {
        self.enrichment_ratio(keys::CROWD_APPEAL)
    }

    /// Energy on a 0..=1 scale.
    ///
    /// Uses the core energy attribute when present and falls back to
    /// enrichment danceability otherwise.
    pub fn energy_ratio(&self) -> Option<f64> {
        self.energy
            .map(|e| (e / 10.0).clamp(0.0, 1.0))
            .or_else(|| self.danceability())
    }

    /// Human-readable label used in diagnostics
    pub fn label(&self) -> String {
        match (self.artist.is_empty(), self.title.is_empty()) {
            (false, false) => format!("{} - {}", self.artist, self.title),
            (true, false) => self.title.clone(),
            _ => self.id.clone(),
        }
    }
}

/// Track files hold either a bare array or an object with a `tracks` array
#[derive(Deserialize)]
#[serde(untagged)]
enum TrackFile {
    List(Vec<Track>),
    Wrapped { tracks: Vec<Track> },
}

/// Read tracks from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold tracks.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    let text = fs::read_to_string(path)?;
    let tracks = match serde_json::from_str(&text)? {
        TrackFile::List(tracks) | TrackFile::Wrapped { tracks } => tracks,
    };
    log::debug!("Loaded {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Convert a percentage-like value to a 0..=1 ratio.
///
/// Numbers above 1 are read as percentages; strings may carry a `%` suffix.
pub fn normalize_percentage(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return None;
            }
            if let Some(pct) = s.strip_suffix('%') {
                return pct.trim().parse::<f64>().ok().map(|p| (p / 100.0).clamp(0.0, 1.0));
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };

    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    Some(if raw > 1.0 { (raw / 100.0).min(1.0) } else { raw })
}
