//! # Segue - Harmonic Playlist Sequencer
//!
//! Command-line front end for the `segue` library. Reads a JSON track list
//! with precomputed key, tempo and energy, and prints an ordered playlist.
//!
//! ## Usage
//!
//! ```bash
//! # Sequence twelve tracks starting from a given one
//! segue optimize tracks.json --length 12 --start intro
//!
//! # Full result with diagnostics and alternatives as JSON
//! segue optimize tracks.json --alternatives 2 --json
//!
//! # Inspect one transition
//! segue score tracks.json intro peak-time
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use segue::cli::{Args, Command};
use segue::completion;
use segue::config::{self, OptimizerConfig};
use segue::{load_tracks, FactorWeights, Objective, OptimizationResult, PlaylistOptimizer, PlaylistRequest, Track};
use std::path::Path;
use std::sync::Arc;

/// Main entry point for the Segue application.
///
/// Initializes logging, parses command-line arguments, and routes commands.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug segue optimize tracks.json` - Search summaries
/// - `RUST_LOG=segue::search=trace segue optimize tracks.json` - Every expansion
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Optimize {
            tracks,
            length,
            start,
            objective,
            weights,
            alternatives,
            config,
            max_nodes,
            beam_width,
            json,
        } => {
            let mut optimizer_config = load_config(config.as_deref())?;
            if let Some(max_nodes) = max_nodes {
                optimizer_config.max_nodes = max_nodes;
            }
            if let Some(beam_width) = beam_width {
                optimizer_config.beam_width = beam_width;
            }
            optimizer_config
                .validate()
                .context("Invalid optimizer settings")?;

            let pool = read_tracks(&tracks)?;
            let mut request = PlaylistRequest::new(pool, length)
                .with_objective(parse_objective(&objective)?)
                .with_alternatives(alternatives);
            if let Some(start) = start {
                request = request.with_start(start);
            }
            if let Some(weights) = weights {
                request = request.with_weights(parse_weights(&weights)?);
            }

            info!("Sequencing {} tracks from {}", request.tracks.len(), tracks.display());
            let optimizer = PlaylistOptimizer::new(optimizer_config, Arc::new(segue::MetadataEnrichment));
            let result = optimizer
                .optimize(&request)
                .context("Failed to sequence playlist")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Command::Score {
            tracks,
            from,
            to,
            objective,
        } => {
            let pool = read_tracks(&tracks)?;
            let a = find_track(&pool, &from)?;
            let b = find_track(&pool, &to)?;
            let objective = parse_objective(&objective)?;
            let optimizer = PlaylistOptimizer::new(load_config(None)?, Arc::new(segue::MetadataEnrichment));
            let breakdown = optimizer.score_pair(a, b, &objective);

            println!("{} -> {} ({objective})", a.label(), b.label());
            println!("  harmonic   {:.3}", breakdown.harmonic);
            println!("  tempo      {:.3}", breakdown.tempo);
            println!("  energy     {:.3}", breakdown.energy);
            match breakdown.emotional {
                Some(emotional) => println!("  emotional  {emotional:.3}"),
                None => println!("  emotional  -"),
            }
            println!("  composite  {:.3}", breakdown.composite);
        }
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
        Command::CompletionEnhanced => {
            completion::generate_enhanced_bash_completion();
        }
        Command::CompleteIds { tracks } => {
            completion::print_track_id_completions(&tracks);
        }
    }

    Ok(())
}

/// Explicit file, else the platform config file, else defaults
fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    match path {
        Some(path) => OptimizerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            debug!("Config path: {:?}", config::default_config_path());
            OptimizerConfig::load_or_default().context("Failed to load default config")
        }
    }
}

fn read_tracks(path: &Path) -> Result<Vec<Track>> {
    load_tracks(path).with_context(|| format!("Failed to read tracks from {}", path.display()))
}

fn find_track<'a>(pool: &'a [Track], id: &str) -> Result<&'a Track> {
    pool.iter()
        .find(|t| t.id == id)
        .with_context(|| format!("No track with id '{id}'"))
}

fn parse_objective(name: &str) -> Result<Objective> {
    name.parse::<Objective>()
        .with_context(|| format!("Unknown objective: {name}"))
}

fn parse_weights(values: &[f64]) -> Result<FactorWeights> {
    let [harmonic, tempo, energy, emotional] = values else {
        bail!("Expected 4 weights (harmonic,tempo,energy,emotional), got {}", values.len());
    };
    Ok(FactorWeights::new(*harmonic, *tempo, *energy, *emotional))
}

fn print_result(result: &OptimizationResult) {
    for (position, track) in result.tracks.iter().enumerate() {
        let key = track.key.as_deref().unwrap_or("-");
        let bpm = track.bpm.map_or_else(|| "-".to_string(), |b| format!("{b:.0}"));
        println!("{:>3}. {:<40} {key:>4} {bpm:>5}", position + 1, track.label());
    }

    println!();
    println!(
        "Score {:.3} | cost {:.3} | {} nodes | {:.1?}{}",
        result.total_score,
        result.path_cost,
        result.nodes_explored,
        result.elapsed,
        if result.diagnostics.fallback_used { " | greedy" } else { "" }
    );
    for (name, score) in &result.objective_scores {
        println!("  {name:<22} {score:.3}");
    }

    for violation in &result.violations {
        println!("! {violation}");
    }
    for note in &result.diagnostics.notes {
        println!("note: {note}");
    }
    for missing in &result.diagnostics.missing_attributes {
        let attributes: Vec<String> = missing.attributes.iter().map(ToString::to_string).collect();
        println!("note: '{}' is missing {}", missing.track_id, attributes.join(", "));
    }

    for (i, alternative) in result.alternatives.iter().enumerate() {
        let ids: Vec<&str> = alternative.iter().map(|t| t.id.as_str()).collect();
        println!("alt {}: {}", i + 1, ids.join(" -> "));
    }
}
