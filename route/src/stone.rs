use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A named unit of work in a route, discovered from `{name}.stone`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stone {
    pub name: String,
    pub definition_path: PathBuf,
    pub guard: Option<Guard>,
}

/// Declarative gate attached to a stone via `{name}.guard`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guard {
    pub path: PathBuf,
    pub artifacts: Vec<String>,
    pub reviews: Reviews,
    pub judges: Vec<String>,
}

/// Review declarations: either a flat list of peer commands, or split into
/// ordered self-review promises and peer commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reviews {
    Flat(Vec<String>),
    Split {
        #[serde(rename = "self", default)]
        self_reviews: Vec<SelfReview>,
        #[serde(default)]
        peer: Vec<String>,
    },
}

impl Default for Reviews {
    fn default() -> Self {
        Reviews::Flat(Vec::new())
    }
}

impl Reviews {
    pub fn peer(&self) -> &[String] {
        match self {
            Reviews::Flat(peer) => peer,
            Reviews::Split { peer, .. } => peer,
        }
    }

    pub fn self_reviews(&self) -> &[SelfReview] {
        match self {
            Reviews::Flat(_) => &[],
            Reviews::Split { self_reviews, .. } => self_reviews,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfReview {
    pub slug: String,
    pub prompt: String,
}

impl Guard {
    pub fn has_self_reviews(&self) -> bool {
        !self.reviews.self_reviews().is_empty()
    }

    /// True when the guard only asks for artifacts to exist.
    pub fn is_artifacts_only(&self) -> bool {
        self.reviews.peer().is_empty() && !self.has_self_reviews() && self.judges.is_empty()
    }
}

/// Persisted record of one peer review execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewArtifact {
    pub stone: String,
    pub input_hash: String,
    pub iteration: u32,
    pub index: usize,
    pub key: String,
    pub blockers: u32,
    pub nitpicks: u32,
}

/// Persisted record of one judge execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JudgeArtifact {
    pub stone: String,
    pub review_input_hash: String,
    pub judge_input_hash: String,
    pub review_iteration: u32,
    pub judge_iteration: u32,
    pub index: usize,
    pub key: String,
    pub passed: bool,
    pub reason: Option<String>,
}

/// A self-review promise, valid only for the hash it was made against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromiseMarker {
    pub stone: String,
    pub slug: String,
    pub review_input_hash: String,
}
