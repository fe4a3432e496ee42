//! # Shell Completion Module
//!
//! This module provides shell completion functionality for Segue, including:
//! - Generation of completion scripts for various shells
//! - Track id completion for `--start`, read from the track file on the command line
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! segue completion bash > ~/.local/share/bash-completion/completions/segue
//!
//! # Generate zsh completions
//! segue completion zsh > ~/.config/zsh/completions/_segue
//! ```

use crate::error::Result;
use crate::track::load_tracks;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate_completions_to(gen, cmd, &mut io::stdout());
}

/// Generate shell completions into any writer
pub fn generate_completions_to<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Bash completion script that completes `--start` with ids from the track file
pub const ENHANCED_BASH_COMPLETION: &str = r#"# Enhanced Segue completion script for Bash with track id completion
# Install with: segue completion-enhanced > ~/.local/share/bash-completion/completions/segue

_segue_track_file() {
    local i
    for (( i=2; i < COMP_CWORD; i++ )); do
        case "${COMP_WORDS[i]}" in
            -*) ;;
            *.json) echo "${COMP_WORDS[i]}"; return ;;
        esac
    done
}

_segue() {
    local cur prev file
    COMPREPLY=()
    cur="${COMP_WORDS[COMP_CWORD]}"
    prev="${COMP_WORDS[COMP_CWORD-1]}"

    if [[ ${COMP_CWORD} -eq 1 ]]; then
        COMPREPLY=( $(compgen -W "optimize score completion completion-enhanced help" -- "${cur}") )
        return 0
    fi

    case "${prev}" in
        -s|--start)
            file=$(_segue_track_file)
            if [[ -n "${file}" ]]; then
                local IFS=$'\n'
                COMPREPLY=( $(compgen -W "$(segue complete-ids "${file}" 2>/dev/null)" -- "${cur}") )
            fi
            return 0
            ;;
        -o|--objective)
            COMPREPLY=( $(compgen -W "balanced narrative energy-flow cultural-journey" -- "${cur}") )
            return 0
            ;;
        -c|--config)
            COMPREPLY=( $(compgen -f -- "${cur}") )
            return 0
            ;;
    esac

    case "${COMP_WORDS[1]}" in
        optimize)
            if [[ "${cur}" == -* ]]; then
                COMPREPLY=( $(compgen -W "--length --start --objective --weights --alternatives --config --max-nodes --beam-width --json --help" -- "${cur}") )
            else
                COMPREPLY=( $(compgen -f -X '!*.json' -- "${cur}") $(compgen -d -- "${cur}") )
            fi
            ;;
        score)
            file=$(_segue_track_file)
            if [[ -n "${file}" && "${cur}" != -* ]]; then
                local IFS=$'\n'
                COMPREPLY=( $(compgen -W "$(segue complete-ids "${file}" 2>/dev/null)" -- "${cur}") )
            else
                COMPREPLY=( $(compgen -f -X '!*.json' -- "${cur}") $(compgen -d -- "${cur}") )
            fi
            ;;
        completion)
            COMPREPLY=( $(compgen -W "bash zsh fish power-shell elvish" -- "${cur}") )
            ;;
    esac
}

complete -F _segue segue
"#;

/// Print the enhanced bash completion script
pub fn generate_enhanced_bash_completion() {
    print!("{ENHANCED_BASH_COMPLETION}");
}

/// Convert CLI shell enum to clap_complete shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Track ids in a track file, sorted and without duplicates
///
/// # Errors
///
/// Returns an error if the file cannot be read as a track list.
pub fn track_id_completions(path: &Path) -> Result<Vec<String>> {
    let mut ids: Vec<String> = load_tracks(path)?.into_iter().map(|t| t.id).collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Print track ids one per line for shell completion.
///
/// Unreadable files print nothing so completion never shows an error.
pub fn print_track_id_completions(path: &Path) {
    match track_id_completions(path) {
        Ok(ids) => {
            for id in ids {
                println!("{id}");
            }
        }
        Err(e) => log::debug!("No track id completions for {}: {e}", path.display()),
    }
}
