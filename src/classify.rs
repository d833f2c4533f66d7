//! Forbidden-pattern classification over decomposed commands.
//!
//! The classifier ties the pipeline together: alias-expand the raw command,
//! flatten it into atomic commands, and test each one against the forbidden
//! patterns. The first match blocks with a remediation reason.
//!
//! Detection fails closed: the flattener over-approximates the command set,
//! and a match on any fragment blocks the whole line. Alias expansion is the
//! only fail-open step - if it cannot run, the unexpanded command is still
//! inspected.

use crate::alias::AliasResolver;
use crate::config::{BlockedBinary, Config};
use crate::shell;
use memchr::memmem;
use regex::Regex;

/// Remediation guidance for blocked `rm` invocations.
const RM_REASON: &str = "Instead of using 'rm':\n \
    - MOVE files using `mv` to the TRASH directory in the CURRENT folder (create it if needed), \n\
    - Add an entry in a markdown file called 'TRASH-FILES.md' in the current directory, \
    where you show a one-liner with the file name, where it moved, and the reason to trash it, e.g.:\n\n\
    ```\n\
    test_script.py - moved to TRASH/ - temporary test script\n\
    data/junk.txt - moved to TRASH/ - data file we don't need\n\
    ```";

/// The block/allow outcome for one command line.
///
/// Invariant: `reason` is `Some` if and only if `blocked` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the command must not execute.
    pub blocked: bool,
    /// Remediation guidance, present exactly when blocked.
    pub reason: Option<String>,
}

impl Decision {
    /// An "allowed" decision.
    #[inline]
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }

    /// A "blocked" decision with remediation guidance.
    #[inline]
    #[must_use]
    pub const fn block(reason: String) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }
}

/// A predicate over a single atomic command.
///
/// Patterns match the forbidden binary as the leading token only - either
/// bare (`rm`, `rm -rf x`) or as an absolute path whose final component is
/// the binary (`/bin/rm foo`). Substring occurrences (`rmdir`, `firmware`)
/// and quoted mentions in argument position never match.
#[derive(Debug)]
pub struct ForbiddenPattern {
    /// Stable name for logs and the `check` subcommand.
    pub name: String,
    /// Substring whose absence proves the pattern cannot match.
    keyword: String,
    regex: Regex,
    /// Remediation guidance shown when the pattern blocks.
    pub reason: String,
}

impl ForbiddenPattern {
    /// Build a pattern blocking `binary` as the leading token of a command.
    ///
    /// Returns `None` for names that cannot form a valid pattern (empty or
    /// whitespace-containing).
    #[must_use]
    pub fn leading_binary(binary: &str, reason: &str) -> Option<Self> {
        if binary.is_empty() || binary.chars().any(char::is_whitespace) {
            return None;
        }

        let escaped = regex::escape(binary);
        let regex = Regex::new(&format!(r"^(?:{escaped}|/\S*/{escaped})(?:\s|$)")).ok()?;

        Some(Self {
            name: binary.to_string(),
            keyword: binary.to_string(),
            regex,
            reason: reason.to_string(),
        })
    }

    /// Test a single atomic command against this pattern.
    ///
    /// The command is whitespace-collapsed first so spacing tricks
    /// (`rm<TAB>-rf`, doubled spaces) cannot dodge the leading-token match.
    #[must_use]
    pub fn matches(&self, atomic_command: &str) -> bool {
        let normalized = normalize_whitespace(atomic_command);
        !normalized.is_empty() && self.regex.is_match(&normalized)
    }
}

/// Collapse all whitespace runs to single spaces and trim the ends.
fn normalize_whitespace(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The consumer-facing classification engine.
///
/// Owns the compiled forbidden patterns and the alias resolver. One `Guard`
/// is built per process; classification itself is a pure computation and is
/// safe to call from multiple threads once the alias map is initialized.
#[derive(Debug)]
pub struct Guard {
    patterns: Vec<ForbiddenPattern>,
    resolver: AliasResolver,
}

impl Guard {
    /// Build a guard from configuration: the built-in `rm` pattern plus any
    /// extra binaries configured under `[patterns]`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let resolver = AliasResolver::new(config.alias.clone());
        Self::with_patterns(compile_patterns(config), resolver)
    }

    /// Build a guard from explicit parts.
    #[must_use]
    pub fn with_patterns(patterns: Vec<ForbiddenPattern>, resolver: AliasResolver) -> Self {
        Self { patterns, resolver }
    }

    /// The compiled forbidden patterns, in evaluation order.
    #[must_use]
    pub fn patterns(&self) -> &[ForbiddenPattern] {
        &self.patterns
    }

    /// Expand the leading alias of a single command (see [`AliasResolver`]).
    #[must_use]
    pub fn expand_leading_alias(&self, command: &str) -> String {
        self.resolver.expand_leading_alias(command)
    }

    /// Classify a command line end to end.
    ///
    /// Pipeline: alias expansion (fail-open) -> recursive flattening ->
    /// forbidden-pattern test on every atomic command. Returns a blocking
    /// decision on the first match, an allow otherwise. Never errors, even
    /// on adversarial input.
    #[must_use]
    pub fn classify(&self, command: &str) -> Decision {
        if command.trim().is_empty() {
            return Decision::allow();
        }

        // Expansion happens before the quick-reject gate: an alias body can
        // introduce a forbidden binary that the raw command never mentions.
        let expanded = self.resolver.expand_command_aliases(command);

        if self.quick_reject(&expanded) {
            return Decision::allow();
        }

        for atomic in shell::extract_all_commands(&expanded) {
            for pattern in &self.patterns {
                if pattern.matches(&atomic) {
                    return Decision::block(pattern.reason.clone());
                }
            }
        }

        Decision::allow()
    }

    /// True when no pattern keyword occurs anywhere in the command, which
    /// proves no atomic fragment can match. A leading token is always a
    /// substring of the line, so this gate cannot produce a false negative.
    fn quick_reject(&self, command: &str) -> bool {
        self.patterns
            .iter()
            .all(|pattern| memmem::find(command.as_bytes(), pattern.keyword.as_bytes()).is_none())
    }
}

/// Compile the configured pattern set: built-in `rm` plus `[patterns] block`.
fn compile_patterns(config: &Config) -> Vec<ForbiddenPattern> {
    let mut patterns = Vec::with_capacity(1 + config.patterns.block.len());

    if let Some(rm) = ForbiddenPattern::leading_binary("rm", RM_REASON) {
        patterns.push(rm);
    }

    for entry in &config.patterns.block {
        let (name, reason) = match entry {
            BlockedBinary::Simple(name) => (name.as_str(), None),
            BlockedBinary::Detailed { name, reason } => (name.as_str(), reason.as_deref()),
        };
        if patterns.iter().any(|p| p.name == name) {
            continue;
        }
        let reason = reason
            .map(str::to_string)
            .unwrap_or_else(|| format!("'{name}' is blocked by rm-guard configuration."));
        if let Some(pattern) = ForbiddenPattern::leading_binary(name, &reason) {
            patterns.push(pattern);
        }
    }

    patterns
}
