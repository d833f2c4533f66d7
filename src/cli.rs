//! CLI argument parsing and command handling.
//!
//! The binary runs in hook mode when invoked without a subcommand; the
//! subcommands here exist for humans - testing a command against the guard,
//! auditing what the flattener sees, and inspecting aliases and config.

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::alias::AliasResolver;
use crate::classify::Guard;
use crate::config::Config;
use crate::shell;

/// Claude Code hook that blocks rm invocations.
///
/// rm-guard decomposes compound shell commands (chaining operators, `$()`
/// and backtick substitutions, shell aliases) and blocks any fragment that
/// would invoke rm, steering deletions into a reviewable TRASH directory.
#[derive(Parser, Debug)]
#[command(name = "rm-guard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (omit to run in hook mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a command the way the hook would
    #[command(name = "check")]
    Check {
        /// The shell command to classify
        command: String,
    },

    /// Print the atomic commands the flattener extracts
    #[command(name = "extract")]
    Extract {
        /// The shell command to decompose
        command: String,
    },

    /// Load and print the resolved shell aliases
    #[command(name = "aliases")]
    Aliases,

    /// Show the effective configuration
    #[command(name = "config")]
    ConfigCmd {
        /// Write a sample config to the user config path instead
        #[arg(long)]
        init: bool,
    },
}

/// Dispatch a parsed subcommand. Returns the process exit code.
#[must_use]
pub fn run_command(command: Command, config: &Config) -> i32 {
    match command {
        Command::Check { command } => run_check(&command, config),
        Command::Extract { command } => run_extract(&command),
        Command::Aliases => run_aliases(config),
        Command::ConfigCmd { init } => run_config(config, init),
    }
}

/// `rm-guard check`: classify and pretty-print; exit 1 when blocked so the
/// verdict is scriptable.
fn run_check(command: &str, config: &Config) -> i32 {
    let guard = Guard::new(config);
    let decision = guard.classify(command);

    if config.general.verbose {
        eprintln!("{}", "Atomic commands:".bright_black());
        let expanded = guard.expand_leading_alias(command);
        for atomic in shell::extract_all_commands(&expanded) {
            eprintln!("  {atomic}");
        }
    }

    if decision.blocked {
        println!("{} {command}", "BLOCKED:".red().bold());
        if let Some(reason) = &decision.reason {
            println!("{reason}");
        }
        1
    } else {
        println!("{} {command}", "ALLOWED:".green().bold());
        0
    }
}

/// `rm-guard extract`: one atomic command per line.
fn run_extract(command: &str) -> i32 {
    for atomic in shell::extract_all_commands(command) {
        println!("{atomic}");
    }
    0
}

/// `rm-guard aliases`: sourced alias map, sorted by name.
fn run_aliases(config: &Config) -> i32 {
    let resolver = AliasResolver::new(config.alias.clone());
    let aliases = resolver.aliases();

    if aliases.is_empty() {
        eprintln!("No aliases loaded (shell sourcing disabled, failed, or none defined).");
        return 0;
    }

    let mut names: Vec<&String> = aliases.keys().collect();
    names.sort();
    for name in names {
        if let Some(expansion) = aliases.get(name) {
            println!("{name}='{expansion}'");
        }
    }
    0
}

/// `rm-guard config`: print effective config, or write the sample file.
fn run_config(config: &Config, init: bool) -> i32 {
    if init {
        let Some(path) = Config::user_config_path() else {
            eprintln!("Error: could not determine the user config directory");
            return 1;
        };
        if path.exists() {
            eprintln!("Error: {} already exists, not overwriting", path.display());
            return 1;
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create {}: {e}", parent.display());
                return 1;
            }
        }
        return match std::fs::write(&path, Config::generate_sample()) {
            Ok(()) => {
                println!("Wrote sample config to {}", path.display());
                0
            }
            Err(e) => {
                eprintln!("Error: failed to write {}: {e}", path.display());
                1
            }
        };
    }

    match toml::to_string_pretty(config) {
        Ok(rendered) => {
            print!("{rendered}");
            0
        }
        Err(e) => {
            eprintln!("Error: failed to render config: {e}");
            1
        }
    }
}
