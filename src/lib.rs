// Forbid unsafe code in production, but allow in tests for env var manipulation
#![cfg_attr(not(test), forbid(unsafe_code))]
//! rm-guard library.
//!
//! Core of the rm-guard Claude Code hook: decompose a possibly compound,
//! possibly adversarially obfuscated shell command into every atomic
//! invocation it reaches, and block any that would run `rm`.
//!
//! # Architecture
//!
//! ```text
//! raw command
//!     │
//!     ▼
//! ┌─────────────────────┐   alias cache built once per process by
//! │   Alias Resolver    │   sourcing the user's shell (fail-open)
//! └─────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────┐   operator splitting + balanced-delimiter
//! │ Recursive Flattener │   substitution scanning, applied recursively
//! └─────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────┐   leading-token forbidden patterns over
//! │     Classifier      │   every atomic command (fail-closed)
//! └─────────────────────┘
//!     │
//!     ▼
//! Decision { blocked, reason }
//! ```
//!
//! The soundness property: for any input string, the flattened set is a
//! superset, in execution-intent terms, of everything the shell would run.
//! Chaining operators, nested `$( ... )` substitutions, backticks, and
//! aliases cannot hide a forbidden invocation. False positives are
//! acceptable; false negatives are the failure mode this crate exists to
//! eliminate.
//!
//! # Usage
//!
//! ```
//! use rm_guard::classify::Guard;
//! use rm_guard::config::Config;
//!
//! let mut config = Config::default();
//! config.alias.enabled = false; // skip shell sourcing in the example
//! let guard = Guard::new(&config);
//!
//! assert!(guard.classify("echo ok | rm foo").blocked);
//! assert!(!guard.classify("rmdir empty_dir").blocked);
//! ```

pub mod alias;
pub mod classify;
pub mod cli;
pub mod config;
pub mod hook;
pub mod logging;
pub mod shell;

// Re-export commonly used types
pub use alias::{AliasMap, AliasResolver};
pub use classify::{Decision, ForbiddenPattern, Guard};
pub use config::Config;
pub use hook::{HookInput, HookOutput, extract_command, read_hook_input};
pub use shell::{extract_all_commands, extract_substitutions, split_operators};
