//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Segue using Clap derive
//! macros. The binary is a thin shell around the library: it reads a JSON
//! track list, builds a request and prints the result.
//!
//! ## Commands
//!
//! - `optimize`: Sequence a track list into a playlist
//! - `score`: Show the factor breakdown for one transition
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! segue optimize tracks.json --length 12 --start intro
//! segue optimize tracks.json --objective narrative --alternatives 2 --json
//! segue score tracks.json intro peak-time
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// The main structure contains only a subcommand since all functionality is
/// accessed through specific commands.
#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(about = "Segue: harmonic playlist sequencing")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sequence a track list into a playlist
    ///
    /// Reads tracks with precomputed key, tempo and energy from a JSON file
    /// (an array of tracks, or an object with a `tracks` array) and orders
    /// them for smooth transitions.
    Optimize {
        /// Path to the JSON track list
        #[arg(value_hint = clap::ValueHint::FilePath)]
        tracks: PathBuf,

        /// Number of tracks in the playlist (capped at the pool size)
        #[arg(short, long, default_value = "10")]
        length: usize,

        /// Id of the track to open the playlist with
        #[arg(short, long)]
        start: Option<String>,

        /// Weight preset: balanced, narrative, energy-flow or cultural-journey
        #[arg(short, long, default_value = "balanced")]
        objective: String,

        /// Custom factor weights as HARMONIC,TEMPO,ENERGY,EMOTIONAL (must sum to 1.0)
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,

        /// Number of alternative playlists to print
        #[arg(short, long, default_value = "0")]
        alternatives: usize,

        /// Optimizer configuration file (JSON)
        ///
        /// Defaults to the platform config directory, e.g.
        /// ~/.config/segue/config.json on Linux. Missing files mean defaults.
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,

        /// Override the node expansion budget
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Override the beam width
        #[arg(long)]
        beam_width: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the factor breakdown for one transition
    Score {
        /// Path to the JSON track list
        #[arg(value_hint = clap::ValueHint::FilePath)]
        tracks: PathBuf,

        /// Id of the outgoing track
        from: String,

        /// Id of the incoming track
        to: String,

        /// Weight preset used for the composite score
        #[arg(short, long, default_value = "balanced")]
        objective: String,
    },

    /// Generate shell completions
    ///
    /// Usage: segue completion bash > ~/.local/share/bash-completion/completions/segue
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Generate bash completion that also completes track ids for --start
    ///
    /// Usage: segue completion-enhanced > ~/.local/share/bash-completion/completions/segue
    CompletionEnhanced,

    /// List track ids in a file for completion (hidden command)
    #[command(hide = true)]
    CompleteIds {
        /// Path to the JSON track list
        tracks: PathBuf,
    },
}
