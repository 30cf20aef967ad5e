//! Output contracts for review and judge commands.
//!
//! Reviews report `blockers: N` / `nitpicks: N` lines. Judges report
//! `passed: true|false` and optionally `reason: ...`; without an explicit
//! verdict line the exit code decides, and stderr supplies the reason.

use std::sync::LazyLock;

use regex::Regex;

static BLOCKERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*blockers:\s*(\d+)\s*$").unwrap());

static NITPICKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*nitpicks:\s*(\d+)\s*$").unwrap());

static PASSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*passed:\s*(true|false)\s*$").unwrap());

static REASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*reason:[ \t]*(.*?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewCounts {
    pub blockers: u32,
    pub nitpicks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub passed: bool,
    pub reason: Option<String>,
}

/// Captured result of an executed command, normalized to text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process never produced an exit status (spawn failure,
    /// timeout, signal).
    pub exit_code: Option<i32>,
}

impl Captured {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub fn parse_review_counts(content: &str) -> ReviewCounts {
    ReviewCounts {
        blockers: first_number(&BLOCKERS_RE, content),
        nitpicks: first_number(&NITPICKS_RE, content),
    }
}

fn first_number(re: &Regex, content: &str) -> u32 {
    re.captures(content)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Decide a judge verdict from its output body, stderr, and exit code.
pub fn parse_judge_verdict(body: &str, captured: &Captured) -> JudgeVerdict {
    let passed = explicit_passed(body).unwrap_or_else(|| captured.succeeded());
    let reason = explicit_reason(body).or_else(|| first_line(&captured.stderr));
    JudgeVerdict { passed, reason }
}

/// Read back a verdict recorded in a persisted judge artifact.
pub fn recorded_verdict(content: &str) -> Option<JudgeVerdict> {
    let passed = explicit_passed(content)?;
    Some(JudgeVerdict {
        passed,
        reason: explicit_reason(content),
    })
}

fn explicit_passed(content: &str) -> Option<bool> {
    PASSED_RE
        .captures(content)
        .map(|caps| caps[1].eq_ignore_ascii_case("true"))
}

fn explicit_reason(content: &str) -> Option<String> {
    REASON_RE
        .captures(content)
        .map(|caps| caps[1].to_string())
        .filter(|reason| !reason.is_empty())
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Render a review artifact from the command's output body.
///
/// Failures are appended instead of replacing the body so partial output
/// survives; a command that produced nothing at all is narrated explicitly.
pub fn render_review(body: &str, captured: &Captured) -> String {
    let mut out = String::new();
    out.push_str(body);
    append_failure(&mut out, body, captured);
    out
}

/// Render a judge artifact: canonical verdict header, then the output body.
pub fn render_judge(verdict: &JudgeVerdict, body: &str, captured: &Captured) -> String {
    let mut out = format!("passed: {}\n", verdict.passed);
    if let Some(reason) = &verdict.reason {
        out.push_str(&format!("reason: {reason}\n"));
    }
    out.push('\n');
    out.push_str(body);
    append_failure(&mut out, body, captured);
    out
}

fn append_failure(out: &mut String, body: &str, captured: &Captured) {
    let exit = describe_exit(captured.exit_code);
    if body.trim().is_empty() && captured.stderr.trim().is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("command produced no output ({exit})\n"));
        return;
    }
    if captured.succeeded() && captured.stderr.trim().is_empty() {
        return;
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("\n---\n{exit}\n"));
    if !captured.stderr.trim().is_empty() {
        out.push_str("stderr:\n");
        out.push_str(&captured.stderr);
        if !captured.stderr.ends_with('\n') {
            out.push('\n');
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit status".to_string(),
    }
}
