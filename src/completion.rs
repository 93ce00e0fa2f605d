//! # Shell Completion Module
//!
//! Completion scripts generated by clap_complete from the clap definitions,
//! so `--mood` values and subcommands complete without a hand-written
//! script.
//!
//! ## Usage
//!
//! ```bash
//! moodplay completion bash > ~/.local/share/bash-completion/completions/moodplay
//! moodplay completion zsh > ~/.config/zsh/completions/_moodplay
//! moodplay completion fish > ~/.config/fish/completions/moodplay.fish
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell on stdout
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate_to_writer(gen, cmd, &mut io::stdout());
}

/// Generate completions into any writer.
pub fn generate_to_writer<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    fn script(shell: Shell) -> String {
        let mut cmd = Args::command();
        let mut out = Vec::new();
        generate_to_writer(shell_to_completion_shell(shell), &mut cmd, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_bash_script_names_binary() {
        let bash = script(Shell::Bash);
        assert!(bash.contains("moodplay"));
        assert!(bash.contains("tracks"));
    }

    #[test]
    fn test_fish_script_offers_moods() {
        let fish = script(Shell::Fish);
        assert!(fish.contains("energetic"));
    }

    #[test]
    fn test_every_shell_generates() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            assert!(!script(shell).is_empty(), "{shell:?} produced nothing");
        }
    }
}
