//! Lexical decomposition of compound shell commands.
//!
//! This module is the heart of the guard: it takes a raw command line and
//! produces every atomic invocation the shell would actually run, so that a
//! forbidden command cannot hide behind a chaining operator or inside a
//! command substitution.
//!
//! Three layers build on each other:
//!
//! 1. [`split_operators`] - splits on `&&`, `||`, `;`, `|`, `&`
//! 2. [`extract_substitutions`] - finds `$( ... )` and backtick spans
//! 3. [`extract_all_commands`] - recursive union of the two
//!
//! This is a best-effort lexical pass, not a shell grammar. Quoting is not
//! interpreted, so an operator character inside a quoted argument still
//! splits the command. The resulting set over-approximates what the shell
//! runs, which is the safe direction for a blocking decision.

use regex::Regex;
use std::sync::LazyLock;

/// Chaining operators together with their surrounding whitespace.
///
/// Multi-character operators (`&&`, `||`) come first in the alternation so
/// `&&` is consumed as one operator instead of two `&` splits.
pub(crate) static OPERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:&&|\|\||[;&|])\s*").expect("operator regex is valid"));

/// Legacy backtick substitution. Backticks cannot nest, so a direct
/// pair match suffices.
static BACKTICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("backtick regex is valid"));

/// Upper bound on substitution nesting before recursion stops.
///
/// Real commands nest a handful of levels at most. Input deeper than this is
/// adversarial or corrupt; flattening keeps whatever was gathered up to the
/// cap instead of recursing without bound.
const MAX_SUBSTITUTION_DEPTH: usize = 128;

/// Split a compound command into its operator-separated segments.
///
/// Segments are trimmed and empty segments (leading/trailing or doubled
/// operators) are dropped. Internal whitespace and quoting are preserved
/// verbatim; no further interpretation happens here.
///
/// Empty or whitespace-only input yields an empty vector.
///
/// ```
/// use rm_guard::shell::split_operators;
///
/// let segments = split_operators("cd /tmp && git add . | tee log");
/// assert_eq!(segments, vec!["cd /tmp", "git add .", "tee log"]);
/// ```
#[must_use]
pub fn split_operators(command: &str) -> Vec<&str> {
    OPERATOR_RE
        .split(command)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Extract the content of a balanced parenthesis group.
///
/// `open` is the byte index of the opening `(`. Returns the content between
/// the parentheses (exclusive), or `None` when no balancing `)` exists.
/// Depth tracking handles nested groups: the returned content still contains
/// any inner `$( ... )` text, which the flattener recovers recursively.
fn balanced_paren_content(command: &str, open: usize) -> Option<&str> {
    let bytes = command.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    for (i, &byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&command[open + 1..i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Find every command embedded in a substitution, in order of appearance.
///
/// Handles both `$( ... )` (balanced, may nest) and backticks (legacy,
/// cannot nest). Inner commands are returned as-is: a nested substitution
/// inside an extracted span is left intact for recursive reprocessing by
/// [`extract_all_commands`].
///
/// An unmatched `$(` contributes nothing for that occurrence; scanning
/// continues so later valid substitutions are still found.
#[must_use]
pub fn extract_substitutions(command: &str) -> Vec<&str> {
    let bytes = command.as_bytes();
    let mut found = Vec::new();

    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'(' {
            if let Some(inner) = balanced_paren_content(command, i + 1) {
                let trimmed = inner.trim();
                if !trimmed.is_empty() {
                    found.push(trimmed);
                }
                // Resume after the whole `$( ... )` span so an outer match
                // is not re-entered at the nested opener.
                i += inner.len() + 3;
                continue;
            }
        }
        i += 1;
    }

    for captures in BACKTICK_RE.captures_iter(command) {
        if let Some(inner) = captures.get(1) {
            let trimmed = inner.as_str().trim();
            if !trimmed.is_empty() {
                found.push(trimmed);
            }
        }
    }

    found
}

/// Recursively flatten a command line into every atomic command it reaches.
///
/// The result is the union of:
/// - the top-level operator-separated segments of the input, verbatim
///   (substitution text intact, so the literal form is still classifiable),
/// - every command recovered by recursive descent into `$( ... )` and
///   backtick substitutions.
///
/// Substitutions are scanned on the *original, unsplit* input: a substitution
/// may itself contain operators that the splitter would otherwise separate
/// prematurely.
///
/// ```
/// use rm_guard::shell::extract_all_commands;
///
/// let commands = extract_all_commands("echo $(rm foo) && ls");
/// assert_eq!(commands, vec!["echo $(rm foo)", "ls", "rm foo"]);
/// ```
#[must_use]
pub fn extract_all_commands(command: &str) -> Vec<String> {
    let mut commands = Vec::new();
    flatten_into(command, 0, &mut commands);
    commands
}

fn flatten_into(command: &str, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_SUBSTITUTION_DEPTH {
        // Pathological nesting: keep the partial result gathered so far.
        return;
    }

    for segment in split_operators(command) {
        out.push(segment.to_string());
    }

    for inner in extract_substitutions(command) {
        flatten_into(inner, depth + 1, out);
    }
}
