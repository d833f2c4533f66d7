#![forbid(unsafe_code)]
//! rm-guard hook entry point for Claude Code.
//!
//! Blocks Bash commands that would invoke `rm`, including invocations hidden
//! behind chaining operators, command substitutions, and shell aliases.
//!
//! Exit behavior:
//!   - Exit 0 with JSON `{"decision":"block","reason":...}` = block
//!   - Exit 0 with JSON `{"decision":"approve"}` = allow
//!
//! The hook never fails the host process: malformed input, config problems,
//! and alias-loading failures all degrade to a best-effort decision.

use clap::Parser;
use rm_guard::classify::Guard;
use rm_guard::cli::{self, Cli};
use rm_guard::config::Config;
use rm_guard::hook;
use rm_guard::logging::{DecisionLogger, LogEntry};

/// Upper bound on hook input size. Claude Code requests are a few KB; this
/// bound keeps a runaway stdin from ballooning memory.
const MAX_HOOK_INPUT_BYTES: usize = 1024 * 1024;

fn main() {
    hook::configure_colors();

    // Parse CLI arguments (subcommands). If parsing fails (e.g., unknown
    // flags), print the clap error and exit instead of falling into hook
    // mode and blocking on stdin.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Also covers --help/--version, which clap reports as "errors".
        Err(e) => e.exit(),
    };

    let config = Config::load();

    if let Some(command) = cli.command {
        std::process::exit(cli::run_command(command, &config));
    }

    run_hook(&config);
}

/// Hook mode: read one JSON request from stdin, write one decision to
/// stdout, exit zero.
fn run_hook(config: &Config) {
    // Stdin is consumed even when bypassed so the host never sees a broken
    // pipe writing the request.
    let input = match hook::read_hook_input(MAX_HOOK_INPUT_BYTES) {
        Ok(input) => input,
        Err(_) => {
            // Unparseable input carries no command to inspect; the hook
            // contract is to emit a decision and exit zero regardless.
            hook::output_approve();
            return;
        }
    };

    // Escape hatch: approve everything without analysis.
    if Config::is_bypassed() {
        hook::output_approve();
        return;
    }

    let Some(command) = hook::extract_command(&input) else {
        // Not a Bash invocation (or no command): outside our remit.
        hook::output_approve();
        return;
    };

    let guard = Guard::new(config);
    let decision = guard.classify(&command);

    // Allows are the overwhelmingly common case; only blocks are logged.
    if decision.blocked {
        if let Some(logger) = DecisionLogger::from_config(&config.general) {
            logger.log(&LogEntry::from_decision(&decision, &command));
        }
    }

    match &decision.reason {
        Some(reason) if decision.blocked => hook::output_block(&command, reason),
        _ => hook::output_approve(),
    }
}
