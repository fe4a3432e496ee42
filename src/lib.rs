//! Harmonic playlist sequencing.
//!
//! Orders a pool of tracks with precomputed key, tempo and energy into a
//! playlist that maximises compatibility between consecutive tracks.
//!
//! Core modules:
//! - [`compatibility`] - Pairwise factor scoring and the per-call compatibility matrix
//! - [`constraints`] - Hard, soft and preference rules over sequences
//! - [`graph`] - Layered (item, position) search graph
//! - [`search`] - Bounded A* search with beam pruning
//! - [`fallback`] - Greedy nearest-neighbour sequencing
//! - [`result`] - Result assembly, score breakdown and diagnostics
//! - [`optimizer`] - The public entry point tying these together
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track data model and enrichment accessors
//! - [`camelot`] - Key parsing and Camelot wheel geometry
//! - [`enrichment`] - Optional era/language/danceability/crowd-appeal refinements
//! - [`objective`] - Weight presets
//! - [`cost`] - Edge, position and diversity costs
//! - [`config`] - Tunable constants and configuration files
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use segue::{Objective, PlaylistOptimizer, PlaylistRequest, Track};
//!
//! let tracks = vec![
//!     Track::new("intro").with_key("8A").with_bpm(122.0).with_energy(3.0),
//!     Track::new("build").with_key("9A").with_bpm(124.0).with_energy(6.0),
//!     Track::new("peak").with_key("9B").with_bpm(125.0).with_energy(9.0),
//!     Track::new("outro").with_key("8B").with_bpm(124.0).with_energy(5.0),
//! ];
//!
//! let request = PlaylistRequest::new(tracks, 4)
//!     .with_start("intro")
//!     .with_objective(Objective::EnergyFlow)
//!     .with_alternatives(1);
//!
//! let result = PlaylistOptimizer::default().optimize(&request)?;
//! assert_eq!(result.track_ids()[0], "intro");
//! println!("score {:.3} after {} nodes", result.total_score, result.nodes_explored);
//! # Ok::<(), segue::SegueError>(())
//! ```
//!
//! ## Algorithm Details
//!
//! ### Compatibility
//! - Harmonic: Camelot wheel distance (same key, neighbours, relative key)
//! - Tempo: tight and wide tolerances, half/double-time recognised
//! - Energy and emotional intensity: linear decay with the difference
//! - Weighted by an [`Objective`] preset or custom [`FactorWeights`]
//!
//! ### Search
//! - Frontier ordered by `f = g + h`, ties by insertion order
//! - Hard constraints prune prefixes; soft ones only add cost
//! - Node budget and near-optimal threshold bound the work
//! - The greedy sequence is always computed and competes with search results
//!
//! ## Error Handling
//!
//! Only malformed requests fail, with [`SegueError::InvalidRequest`]. An
//! exhausted budget, unsatisfiable hard rules and tracks missing attributes
//! are reported through [`result::Diagnostics`].

pub mod camelot;
pub mod cli;
pub mod compatibility;
pub mod completion;
pub mod config;
pub mod constraints;
pub mod cost;
pub mod enrichment;
pub mod error;
pub mod fallback;
pub mod graph;
pub mod objective;
pub mod optimizer;
pub mod result;
pub mod search;
pub mod track;

pub use compatibility::{CompatibilityMatrix, FactorBreakdown, ScoringContext};
pub use config::OptimizerConfig;
pub use constraints::{Constraint, ConstraintClass, ConstraintSet, Rule, Violation};
pub use enrichment::{EnrichmentScorer, MetadataEnrichment, NoEnrichment};
pub use error::{Result, SegueError};
pub use objective::{FactorWeights, Objective};
pub use optimizer::{GreedySequencer, PlaylistOptimizer, PlaylistRequest, Sequencer};
pub use result::{Diagnostics, OptimizationResult};
pub use search::SearchOutcome;
pub use track::{load_tracks, Track, TrackId};
