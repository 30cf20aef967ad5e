//! Typed errors callers may need to tell apart.
//!
//! Both are carried inside `anyhow::Error` and recovered with `downcast_ref`.

use thiserror::Error;

/// A guard declaration that cannot be evaluated. Raised before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardConfigError {
    #[error("guard for stone '{stone}' declares {reviews} peer review(s) but no judges")]
    ReviewsWithoutJudges { stone: String, reviews: usize },

    #[error("guard for stone '{stone}' has no self-reviews to promise")]
    NoSelfReviews { stone: String },
}

/// A rejected self-review promise. Nothing is written when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromiseError {
    #[error("stone '{stone}' has no self-review '{slug}' (remaining: {})", list(.remaining))]
    UnknownSlug {
        stone: String,
        slug: String,
        remaining: Vec<String>,
    },

    #[error("self-review '{slug}' of stone '{stone}' is already promised (remaining: {})", list(.remaining))]
    AlreadySatisfied {
        stone: String,
        slug: String,
        remaining: Vec<String>,
    },

    #[error(
        "self-review '{slug}' of stone '{stone}' is out of order (next: {expected}; remaining: {})",
        list(.remaining)
    )]
    OutOfOrder {
        stone: String,
        slug: String,
        expected: String,
        remaining: Vec<String>,
    },
}

fn list(slugs: &[String]) -> String {
    if slugs.is_empty() {
        "none".to_string()
    } else {
        slugs.join(", ")
    }
}
