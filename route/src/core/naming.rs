//! Stable keys for everything persisted under `.route/`.
//!
//! Keys are file names relative to the state directory. Every key for a stone
//! starts with the stone name followed by `.`; deletion matches the full key
//! shape, not just that prefix, to find a stone's records.

use std::sync::LazyLock;

use regex::Regex;

static REVIEW_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.([0-9a-f]+)\.r(\d+)\.md$").unwrap());

static PROMISE_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_-]*)\.([A-Za-z0-9]+)\.md$").unwrap());

static JUDGE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)p(\d+)\.([0-9a-f]+)\.([0-9a-f]+)\.j(\d+)\.md$").unwrap()
});

/// Parsed `{stone}.guard.review.i{iteration}.{hash}.r{index}.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewKey {
    pub iteration: u32,
    pub hash: String,
    pub index: usize,
}

/// Parsed `{stone}.guard.judge.i{review_iter}p{judge_iter}.{review_hash}.{judge_hash}.j{index}.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeKey {
    pub review_iteration: u32,
    pub judge_iteration: u32,
    pub review_hash: String,
    pub judge_hash: String,
    pub index: usize,
}

pub fn passed_key(stone: &str) -> String {
    format!("{stone}.passed")
}

pub fn approved_key(stone: &str) -> String {
    format!("{stone}.approved")
}

pub fn review_prefix(stone: &str) -> String {
    format!("{stone}.guard.review.i")
}

pub fn review_key(stone: &str, iteration: u32, hash: &str, index: usize) -> String {
    format!("{}{iteration}.{hash}.r{index}.md", review_prefix(stone))
}

pub fn parse_review_key(stone: &str, key: &str) -> Option<ReviewKey> {
    let tail = key.strip_prefix(&review_prefix(stone))?;
    let caps = REVIEW_TAIL_RE.captures(tail)?;
    Some(ReviewKey {
        iteration: caps[1].parse().ok()?,
        hash: caps[2].to_string(),
        index: caps[3].parse().ok()?,
    })
}

pub fn judge_prefix(stone: &str) -> String {
    format!("{stone}.guard.judge.i")
}

pub fn judge_key(
    stone: &str,
    review_iteration: u32,
    judge_iteration: u32,
    review_hash: &str,
    judge_hash: &str,
    index: usize,
) -> String {
    format!(
        "{}{review_iteration}p{judge_iteration}.{review_hash}.{judge_hash}.j{index}.md",
        judge_prefix(stone)
    )
}

pub fn parse_judge_key(stone: &str, key: &str) -> Option<JudgeKey> {
    let tail = key.strip_prefix(&judge_prefix(stone))?;
    let caps = JUDGE_TAIL_RE.captures(tail)?;
    Some(JudgeKey {
        review_iteration: caps[1].parse().ok()?,
        judge_iteration: caps[2].parse().ok()?,
        review_hash: caps[3].to_string(),
        judge_hash: caps[4].to_string(),
        index: caps[5].parse().ok()?,
    })
}

pub fn promise_prefix(stone: &str) -> String {
    format!("{stone}.guard.promise.")
}

pub fn promise_key(stone: &str, slug: &str, hash: &str) -> String {
    format!("{}{slug}.{hash}.md", promise_prefix(stone))
}

/// Returns `(slug, hash)` for a promise key belonging to `stone`.
pub fn parse_promise_key(stone: &str, key: &str) -> Option<(String, String)> {
    let tail = key.strip_prefix(&promise_prefix(stone))?;
    let caps = PROMISE_TAIL_RE.captures(tail)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// True if `key` is a state record owned by `stone`: its markers or a
/// well-formed review, judge or promise record. Keys of a stone whose name
/// merely extends it (`1.a` vs `1.a.b` or `1.a.guard`) never match.
pub fn is_stone_state_key(stone: &str, key: &str) -> bool {
    key == passed_key(stone)
        || key == approved_key(stone)
        || parse_review_key(stone, key).is_some()
        || parse_judge_key(stone, key).is_some()
        || parse_promise_key(stone, key).is_some()
}
