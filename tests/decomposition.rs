//! Library-level properties of the decomposition and classification pipeline.
//!
//! Exercises the public API end to end with an injected alias map, so no
//! test here depends on the invoking user's shell environment.

use rm_guard::alias::{AliasMap, AliasResolver};
use rm_guard::classify::{Decision, ForbiddenPattern, Guard};
use rm_guard::config::{AliasConfig, Config};
use rm_guard::shell::{extract_all_commands, split_operators};

fn guard_without_aliases() -> Guard {
    let mut config = Config::default();
    config.alias.enabled = false;
    Guard::new(&config)
}

fn guard_with_aliases(entries: &[(&str, &str)]) -> Guard {
    let map: AliasMap = entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let resolver = AliasResolver::with_map(AliasConfig::default(), map);
    let patterns = vec![
        ForbiddenPattern::leading_binary("rm", "move files to TRASH/ instead").expect("rm pattern"),
    ];
    Guard::with_patterns(patterns, resolver)
}

// ============================================================================
// Operator splitting
// ============================================================================

#[test]
fn splitting_is_exact_on_operator_enumeration() {
    assert_eq!(
        split_operators("cmd1 && cmd2 | cmd3; cmd4 || cmd5 & cmd6"),
        vec!["cmd1", "cmd2", "cmd3", "cmd4", "cmd5", "cmd6"]
    );
}

#[test]
fn operator_count_bounds_segment_count() {
    // 3 operators, so at most 4 segments even with empty ones dropped.
    let segments = split_operators("a && b || ; c");
    assert!(segments.len() <= 4);
    assert_eq!(segments, vec!["a", "b", "c"]);
}

// ============================================================================
// Substitution recovery
// ============================================================================

#[test]
fn nested_substitution_recovers_inner_command() {
    let commands = extract_all_commands("echo $(echo $(rm foo))");
    assert!(
        commands.iter().any(|c| c == "rm foo"),
        "inner command must not truncate at the first closing paren: {commands:?}"
    );
}

#[test]
fn backtick_substitution_is_detected() {
    let commands = extract_all_commands("cat `rm bar`");
    assert!(commands.iter().any(|c| c == "rm bar"));
}

#[test]
fn top_level_segments_keep_substitution_text_verbatim() {
    let commands = extract_all_commands("echo $(rm foo) && ls");
    assert_eq!(commands, vec!["echo $(rm foo)", "ls", "rm foo"]);
}

#[test]
fn unmatched_substitution_degrades_to_partial_result() {
    let commands = extract_all_commands("echo $(broken && cat `rm bar`");
    // The dangling $( contributes nothing, but the split segments and the
    // backtick command are still recovered.
    assert!(commands.iter().any(|c| c == "rm bar"));
    assert!(!commands.is_empty());
}

// ============================================================================
// Classification: the forbidden-pattern test is idempotent on flattening
// ============================================================================

#[test]
fn any_forbidden_atomic_command_blocks_the_original() {
    let guard = guard_without_aliases();
    let pattern = ForbiddenPattern::leading_binary("rm", "no").expect("rm pattern");

    for input in [
        "rm foo",
        "echo ok | rm foo",
        "sleep 1 & rm bar",
        "true && echo $(rm baz)",
        "cat `rm qux` | grep x",
        "echo $(echo $(rm nested))",
    ] {
        let atomics = extract_all_commands(input);
        assert!(
            atomics.iter().any(|c| pattern.matches(c)),
            "expected a forbidden atomic in {input:?}: {atomics:?}"
        );
        assert!(
            guard.classify(input).blocked,
            "classify must block {input:?}"
        );
    }
}

#[test]
fn pipe_and_background_bypasses_are_blocked() {
    let guard = guard_without_aliases();
    assert!(guard.classify("echo ok | rm foo").blocked);
    assert!(guard.classify("sleep 1 & rm bar").blocked);
}

#[test]
fn negative_controls_are_allowed() {
    let guard = guard_without_aliases();
    assert_eq!(guard.classify("rmdir empty_dir"), Decision::allow());
    assert_eq!(guard.classify("echo 'do not rm this'"), Decision::allow());
    assert_eq!(guard.classify("ls -la"), Decision::allow());
}

#[test]
fn empty_input_yields_empty_set_and_allow() {
    assert!(extract_all_commands("").is_empty());
    assert!(extract_all_commands("  \t ").is_empty());
    assert_eq!(guard_without_aliases().classify(""), Decision::allow());
    assert_eq!(guard_without_aliases().classify("   "), Decision::allow());
}

#[test]
fn reason_is_present_iff_blocked() {
    let guard = guard_without_aliases();
    for input in ["rm x", "ls", "echo hi && rm y", "git status"] {
        let decision = guard.classify(input);
        assert_eq!(decision.blocked, decision.reason.is_some(), "for {input:?}");
    }
}

// ============================================================================
// Alias expansion
// ============================================================================

#[test]
fn alias_expansion_preserves_operators() {
    let guard = guard_with_aliases(&[("gco", "git checkout"), ("gcam", "git commit -am")]);
    let resolver = AliasResolver::with_map(
        AliasConfig::default(),
        [
            ("gco".to_string(), "git checkout".to_string()),
            ("gcam".to_string(), "git commit -am".to_string()),
        ]
        .into_iter()
        .collect(),
    );

    assert_eq!(
        resolver.expand_command_aliases("gco -f && gcam 'msg'"),
        "git checkout -f && git commit -am 'msg'"
    );
    // Expanded git commands are not rm; nothing blocks.
    assert!(!guard.classify("gco -f && gcam 'msg'").blocked);
}

#[test]
fn alias_hiding_rm_is_caught() {
    let guard = guard_with_aliases(&[("nuke", "rm -rf")]);
    assert!(guard.classify("nuke ./build").blocked);
    assert!(guard.classify("echo start && nuke ./build").blocked);
}

#[test]
fn alias_expanding_into_compound_rm_is_caught() {
    // The alias body itself smuggles an operator and an rm.
    let guard = guard_with_aliases(&[("tidy", "ls && rm -rf /tmp/scratch")]);
    assert!(guard.classify("tidy").blocked);
}

#[test]
fn missing_alias_map_still_blocks_direct_rm() {
    let guard = guard_with_aliases(&[]);
    assert!(guard.classify("rm foo").blocked);
    assert!(!guard.classify("nuke ./build").blocked);
}
