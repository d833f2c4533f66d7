//! Claude Code hook protocol handling.
//!
//! This module handles the JSON input/output for the `PreToolUse` hook: it
//! parses the incoming request from stdin and writes a
//! `{"decision": "block", "reason": ...}` or `{"decision": "approve"}`
//! object to stdout. The hook process itself always exits zero; a blocked
//! command is a normal outcome, not a failure.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{self, IsTerminal, Read, Write};

/// Input structure from Claude Code's `PreToolUse` hook.
#[derive(Debug, Deserialize)]
pub struct HookInput {
    /// The name of the tool being invoked (e.g., "Bash", "Read", "Write").
    pub tool_name: Option<String>,

    /// Tool-specific input parameters.
    pub tool_input: Option<ToolInput>,
}

/// Tool-specific input containing the command to execute.
#[derive(Debug, Deserialize)]
pub struct ToolInput {
    /// The command string (for Bash tools).
    pub command: Option<serde_json::Value>,
}

/// Output structure for the hook decision.
#[derive(Debug, Serialize)]
pub struct HookOutput<'a> {
    /// "block" or "approve".
    pub decision: &'static str,

    /// Remediation guidance; present only when blocking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Cow<'a, str>>,
}

impl<'a> HookOutput<'a> {
    /// An "approve" response.
    #[must_use]
    pub const fn approve() -> Self {
        Self {
            decision: "approve",
            reason: None,
        }
    }

    /// A "block" response with remediation guidance.
    #[must_use]
    pub const fn block(reason: Cow<'a, str>) -> Self {
        Self {
            decision: "block",
            reason: Some(reason),
        }
    }
}

/// Error type for reading and parsing hook input.
#[derive(Debug)]
pub enum HookReadError {
    /// Failed to read from stdin.
    Io(io::Error),
    /// Input exceeded the configured size limit.
    InputTooLarge(usize),
    /// Failed to parse JSON input.
    Json(serde_json::Error),
}

/// Read and parse hook input from stdin.
///
/// # Errors
///
/// Returns [`HookReadError::Io`] if stdin cannot be read, [`HookReadError::Json`]
/// if the input is not valid hook JSON, or [`HookReadError::InputTooLarge`] if
/// the input exceeds `max_bytes`.
pub fn read_hook_input(max_bytes: usize) -> Result<HookInput, HookReadError> {
    let mut input = String::with_capacity(256);
    {
        let stdin = io::stdin();
        // Read up to limit + 1 to detect overflow
        let mut handle = stdin.lock().take(max_bytes as u64 + 1);
        handle
            .read_to_string(&mut input)
            .map_err(HookReadError::Io)?;
    }

    if input.len() > max_bytes {
        return Err(HookReadError::InputTooLarge(input.len()));
    }

    serde_json::from_str(&input).map_err(HookReadError::Json)
}

/// Extract the command string from hook input.
///
/// Only `Bash` tool invocations carry a shell command; anything else is
/// outside this hook's remit.
#[must_use]
pub fn extract_command(input: &HookInput) -> Option<String> {
    if input.tool_name.as_deref() != Some("Bash") {
        return None;
    }

    let tool_input = input.tool_input.as_ref()?;
    let command_value = tool_input.command.as_ref()?;

    match command_value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Configure colored output based on TTY detection.
pub fn configure_colors() {
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }
}

/// Write an "approve" decision to stdout.
pub fn output_approve() {
    write_output(&HookOutput::approve());
}

/// Write a "block" decision to stdout and a human-visible warning to stderr.
#[cold]
#[inline(never)]
pub fn output_block(command: &str, reason: &str) {
    print_block_warning(command, reason);
    write_output(&HookOutput::block(Cow::Borrowed(reason)));
}

fn write_output(output: &HookOutput<'_>) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = serde_json::to_writer(&mut handle, output);
    let _ = writeln!(handle);
}

/// Print a colorful warning box to stderr for human visibility.
pub fn print_block_warning(command: &str, reason: &str) {
    // Box width (content area, excluding border characters)
    const WIDTH: usize = 70;

    let stderr = io::stderr();
    let mut handle = stderr.lock();

    let _ = writeln!(handle);
    let _ = writeln!(
        handle,
        "{}{}{}",
        "╭".red(),
        "─".repeat(WIDTH).red(),
        "╮".red()
    );

    let _ = writeln!(
        handle,
        "{}  🛡  {}  {}{}",
        "│".red(),
        "BLOCKED".white().on_red().bold(),
        " ".repeat(WIDTH - 16),
        "│".red()
    );

    let title_line = "   rm-guard";
    let _ = writeln!(
        handle,
        "{}{}{}{}",
        "│".red(),
        title_line.bright_black(),
        " ".repeat(WIDTH - title_line.len()),
        "│".red()
    );

    let _ = writeln!(
        handle,
        "{}{}{}",
        "├".red(),
        "─".repeat(WIDTH).red().dimmed(),
        "┤".red()
    );

    // Command line - truncate long commands for display (char-safe for UTF-8)
    let display_cmd = if command.chars().count() > 50 {
        let truncated: String = command.chars().take(47).collect();
        format!("{truncated}...")
    } else {
        command.to_string()
    };
    let _ = write!(handle, "{}", "│".red());
    let _ = write!(handle, "  {} ", "Command:".cyan().bold());
    let _ = write!(handle, "{}", display_cmd.bright_white().bold());
    let cmd_line_len = "  Command: ".len() + display_cmd.chars().count();
    let _ = writeln!(
        handle,
        "{}{}",
        " ".repeat(WIDTH.saturating_sub(cmd_line_len)),
        "│".red()
    );

    let _ = writeln!(handle, "{}{}{}", "│".red(), " ".repeat(WIDTH), "│".red());

    // Reason section - wrap long reasons
    let reason_label = "  Reason: ";
    let reason_width = WIDTH - reason_label.len() - 1;
    for (i, line) in wrap_text(reason, reason_width).iter().enumerate() {
        let _ = write!(handle, "{}", "│".red());
        if i == 0 {
            let _ = write!(handle, "  {} ", "Reason:".yellow().bold());
            let _ = write!(handle, "{}", line.white());
            let padding = WIDTH.saturating_sub(reason_label.len() + line.chars().count());
            let _ = writeln!(handle, "{}{}", " ".repeat(padding), "│".red());
        } else {
            let indent = " ".repeat(reason_label.len());
            let padding = WIDTH.saturating_sub(indent.len() + line.chars().count());
            let _ = write!(handle, "{indent}{}", line.white());
            let _ = writeln!(handle, "{}{}", " ".repeat(padding), "│".red());
        }
    }

    let _ = writeln!(
        handle,
        "{}{}{}",
        "╰".red(),
        "─".repeat(WIDTH).red(),
        "╯".red()
    );
    let _ = writeln!(handle);
}

/// Wrap text to fit within a given width.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_bash_input() {
        let json = r#"{"tool_name": "Bash", "tool_input": {"command": "git status"}}"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.tool_name.as_deref(), Some("Bash"));
        assert_eq!(extract_command(&input), Some("git status".to_string()));
    }

    #[test]
    fn test_extract_command_non_bash() {
        let json = r#"{"tool_name": "Read", "tool_input": {"file_path": "/tmp/foo"}}"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(extract_command(&input), None);
    }

    #[test]
    fn test_extract_command_empty() {
        let json = r#"{"tool_name": "Bash", "tool_input": {"command": ""}}"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(extract_command(&input), None);
    }

    #[test]
    fn test_extract_command_non_string() {
        let json = r#"{"tool_name": "Bash", "tool_input": {"command": 42}}"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(extract_command(&input), None);
    }

    #[test]
    fn test_approve_serialization() {
        let json = serde_json::to_string(&HookOutput::approve()).unwrap();
        assert_eq!(json, r#"{"decision":"approve"}"#);
    }

    #[test]
    fn test_block_serialization() {
        let output = HookOutput::block(Cow::Borrowed("use mv to TRASH/ instead"));
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains(r#""decision":"block""#));
        assert!(json.contains("use mv to TRASH/ instead"));
    }

    #[test]
    fn test_block_warning_utf8_truncation_does_not_panic() {
        // Multi-byte characters would panic with byte slicing at char 47.
        let long_command = "rm -rf /home/用户/文件夹/子文件夹/另一个文件夹/更多更多内容/最终最终目录/深层嵌套/额外路径";
        assert!(long_command.chars().count() > 50);
        print_block_warning(long_command, "test reason");
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
