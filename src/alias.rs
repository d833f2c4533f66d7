//! Shell alias resolution with a process-lifetime cache.
//!
//! Aliases let a forbidden command hide behind an innocent-looking first
//! token (`alias cleanup='rm -rf'`). The resolver loads the user's aliases
//! once per process by sourcing their shell startup file, then rewrites the
//! leading token of each subcommand before classification.
//!
//! Alias expansion is a convenience, not a security boundary: every failure
//! mode (missing shell, timeout, non-zero exit, unparseable output) degrades
//! to an empty map and the classifier still inspects the unexpanded command.

use crate::config::AliasConfig;
use crate::shell::OPERATOR_RE;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::{LazyLock, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Alias name to expansion text. Last definition wins.
pub type AliasMap = HashMap<String, String>;

/// Interval between liveness checks on the alias-listing subprocess.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// OSC escape sequences (terminal title writes and friends).
static ANSI_OSC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\][^\x07]*\x07").expect("OSC regex is valid"));

/// CSI escape sequences (colors, cursor movement).
static ANSI_CSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("CSI regex is valid"));

/// Resolves shell aliases against a lazily-built, process-lifetime cache.
///
/// The cache is single-assignment: [`OnceLock`] guarantees the shell is
/// sourced at most once even under concurrent first access, and the map is
/// read-only afterwards. There is no invalidation short of process restart.
#[derive(Debug)]
pub struct AliasResolver {
    cache: OnceLock<AliasMap>,
    config: AliasConfig,
}

impl AliasResolver {
    /// Create a resolver. The shell is not sourced until the first lookup.
    #[must_use]
    pub fn new(config: AliasConfig) -> Self {
        Self {
            cache: OnceLock::new(),
            config,
        }
    }

    /// Create a resolver with a pre-populated map, bypassing shell sourcing.
    ///
    /// Used by tests and by embedders that manage alias definitions
    /// themselves.
    #[must_use]
    pub fn with_map(config: AliasConfig, map: AliasMap) -> Self {
        let cache = OnceLock::new();
        let _ = cache.set(map);
        Self { cache, config }
    }

    /// The alias map, loading it on first access.
    pub fn aliases(&self) -> &AliasMap {
        self.cache.get_or_init(|| {
            if self.config.enabled {
                load_shell_aliases(&self.config)
            } else {
                AliasMap::new()
            }
        })
    }

    /// Expand the leading token of a single (already-atomic) command.
    ///
    /// The remainder of the command text is preserved unchanged. Tokens in
    /// the configured skip set, or containing a path separator, are already
    /// unambiguous and are never substituted.
    #[must_use]
    pub fn expand_leading_alias(&self, command: &str) -> String {
        let trimmed = command.trim();
        let (first, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (trimmed, ""),
        };

        if first.is_empty()
            || first.contains('/')
            || self.config.skip_commands.iter().any(|c| c == first)
        {
            return command.to_string();
        }

        match self.aliases().get(first) {
            Some(expansion) if rest.is_empty() => expansion.clone(),
            Some(expansion) => format!("{expansion} {rest}"),
            None => command.to_string(),
        }
    }

    /// Expand aliases in a possibly compound command, preserving operators.
    ///
    /// The command is split on chaining operators, each subcommand's leading
    /// token is expanded, and the operators (with their surrounding
    /// whitespace) are reproduced verbatim between the expanded parts.
    ///
    /// ```
    /// use rm_guard::alias::AliasResolver;
    /// use rm_guard::config::AliasConfig;
    ///
    /// let mut map = rm_guard::alias::AliasMap::new();
    /// map.insert("gco".into(), "git checkout".into());
    /// let resolver = AliasResolver::with_map(AliasConfig::default(), map);
    ///
    /// assert_eq!(
    ///     resolver.expand_command_aliases("gco -f && ls"),
    ///     "git checkout -f && ls"
    /// );
    /// ```
    #[must_use]
    pub fn expand_command_aliases(&self, command: &str) -> String {
        if command.is_empty() {
            return String::new();
        }

        let mut result = String::with_capacity(command.len());
        let mut cursor = 0;

        for operator in OPERATOR_RE.find_iter(command) {
            self.push_expanded(&mut result, &command[cursor..operator.start()]);
            result.push_str(operator.as_str());
            cursor = operator.end();
        }
        self.push_expanded(&mut result, &command[cursor..]);

        result
    }

    fn push_expanded(&self, out: &mut String, segment: &str) {
        if segment.trim().is_empty() {
            out.push_str(segment);
        } else {
            out.push_str(&self.expand_leading_alias(segment.trim()));
        }
    }
}

/// Source the user's shell startup file and collect its alias definitions.
///
/// The shell runs non-interactively (no `-i`, which would grab terminal
/// control when invoked from a background hook): stdin is closed, the child
/// gets its own process group, and `PS1`/`TERM` are neutralized. Returns an
/// empty map on any failure.
fn load_shell_aliases(config: &AliasConfig) -> AliasMap {
    let shell = config
        .shell
        .clone()
        .or_else(|| env::var("SHELL").ok())
        .unwrap_or_else(|| "/bin/bash".to_string());

    // Source the rc file explicitly to pick up aliases without interactive
    // mode. Both bash and zsh print `alias` definitions one per line.
    let script = if shell.contains("zsh") {
        "source ~/.zshrc 2>/dev/null; alias"
    } else {
        "source ~/.bashrc 2>/dev/null; alias"
    };

    let timeout = Duration::from_millis(config.timeout_ms);
    match run_shell_with_timeout(&shell, script, timeout) {
        Some(output) => parse_alias_output(&strip_ansi(&output)),
        None => AliasMap::new(),
    }
}

/// Run `shell -c script` and return its stdout, bounded by `timeout`.
///
/// A reader thread drains stdout while the parent polls `try_wait` against
/// the deadline; a child that outlives the deadline is killed. Returns `None`
/// on spawn failure, timeout, or non-zero exit.
fn run_shell_with_timeout(shell: &str, script: &str, timeout: Duration) -> Option<String> {
    let mut command = Command::new(shell);
    command
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env("PS1", "")
        .env("TERM", "dumb");

    // Detach from the hook's terminal so the shell cannot stop on tty I/O.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().ok()?;
    let mut stdout = child.stdout.take()?;

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = String::new();
        let _ = stdout.read_to_string(&mut buffer);
        let _ = sender.send(buffer);
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return None,
        }
    };

    if !status.success() {
        return None;
    }

    // The pipe is at EOF once the child exits; grant a small grace period
    // for the reader thread to deliver.
    let remaining = deadline
        .saturating_duration_since(Instant::now())
        .max(Duration::from_millis(100));
    receiver.recv_timeout(remaining).ok()
}

/// Strip OSC and CSI escape sequences that decorated shells emit even when
/// `TERM=dumb`.
fn strip_ansi(output: &str) -> Cow<'_, str> {
    match ANSI_OSC_RE.replace_all(output, "") {
        Cow::Borrowed(_) => ANSI_CSI_RE.replace_all(output, ""),
        Cow::Owned(without_osc) => Cow::Owned(ANSI_CSI_RE.replace_all(&without_osc, "").into_owned()),
    }
}

/// Parse `alias` output into a map.
///
/// Handles both formats:
/// - bash: `alias gcam='git commit -am'`
/// - zsh:  `gcam='git commit -a -m'` or `gcam="git commit -a -m"`
fn parse_alias_output(output: &str) -> AliasMap {
    let mut map = AliasMap::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line = line.strip_prefix("alias ").unwrap_or(line);

        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        map.insert(name.to_string(), unquote(value.trim()).to_string());
    }

    map
}

/// Remove one matching pair of surrounding quotes, if present.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
