//! Ordered self-review promise progress.
//!
//! Promises only count as a contiguous run from the first declared slug.
//! Callers pass in the slugs promised against the current review input hash;
//! promises made against any other hash are simply not in that set.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::PromiseError;
use crate::stone::SelfReview;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfReviewProgress {
    pub satisfied: bool,
    pub next: Option<SelfReview>,
    pub promised: usize,
    pub total: usize,
}

impl SelfReviewProgress {
    pub fn next_slug(&self) -> Option<&str> {
        self.next.as_ref().map(|review| review.slug.as_str())
    }
}

pub fn progress(reviews: &[SelfReview], promised: &HashSet<String>) -> SelfReviewProgress {
    let count = reviews
        .iter()
        .take_while(|review| promised.contains(&review.slug))
        .count();
    SelfReviewProgress {
        satisfied: count == reviews.len(),
        next: reviews.get(count).cloned(),
        promised: count,
        total: reviews.len(),
    }
}

/// Check that `slug` is the next promise due.
pub fn validate_promise(
    stone: &str,
    reviews: &[SelfReview],
    promised: &HashSet<String>,
    slug: &str,
) -> Result<(), PromiseError> {
    let current = progress(reviews, promised);
    let remaining: Vec<String> = reviews[current.promised..]
        .iter()
        .map(|review| review.slug.clone())
        .collect();

    if !reviews.iter().any(|review| review.slug == slug) {
        return Err(PromiseError::UnknownSlug {
            stone: stone.to_string(),
            slug: slug.to_string(),
            remaining,
        });
    }
    if !remaining.iter().any(|candidate| candidate == slug) {
        return Err(PromiseError::AlreadySatisfied {
            stone: stone.to_string(),
            slug: slug.to_string(),
            remaining,
        });
    }
    match current.next_slug() {
        Some(next) if next == slug => Ok(()),
        Some(next) => Err(PromiseError::OutOfOrder {
            stone: stone.to_string(),
            slug: slug.to_string(),
            expected: next.to_string(),
            remaining,
        }),
        None => Err(PromiseError::AlreadySatisfied {
            stone: stone.to_string(),
            slug: slug.to_string(),
            remaining,
        }),
    }
}
