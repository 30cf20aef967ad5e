//! Self-review promises gating peer review.
//!
//! Promise markers are never deleted when artifacts change. They are looked
//! up by the current review input hash, so an edit leaves them behind and
//! progress starts over from the first slug.

use std::collections::HashSet;

use anyhow::Result;
use tracing::info;

use crate::core::naming::{parse_promise_key, promise_key, promise_prefix};
use crate::core::self_review::{SelfReviewProgress, progress, validate_promise};
use crate::errors::GuardConfigError;
use crate::io::catalog::find_stone;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;
use crate::review::compute_review_input_hash;
use crate::stone::{Guard, PromiseMarker, Stone};

/// Promise markers for `stone` recorded against `review_input_hash`.
pub fn promises_for_hash<S: KeyValueStore>(
    store: &S,
    stone: &str,
    review_input_hash: &str,
) -> Result<Vec<PromiseMarker>> {
    Ok(store
        .list_by_prefix(&promise_prefix(stone))?
        .into_iter()
        .filter_map(|key| parse_promise_key(stone, &key))
        .filter(|(_, hash)| hash == review_input_hash)
        .map(|(slug, hash)| PromiseMarker {
            stone: stone.to_string(),
            slug,
            review_input_hash: hash,
        })
        .collect())
}

fn promised_slugs<S: KeyValueStore>(
    store: &S,
    stone: &str,
    review_input_hash: &str,
) -> Result<HashSet<String>> {
    Ok(promises_for_hash(store, stone, review_input_hash)?
        .into_iter()
        .map(|marker| marker.slug)
        .collect())
}

/// Progress through the guard's self-reviews for the current hash.
pub fn check_self_reviews<S: KeyValueStore>(
    store: &S,
    stone: &Stone,
    guard: &Guard,
    review_input_hash: &str,
) -> Result<SelfReviewProgress> {
    let promised = promised_slugs(store, &stone.name, review_input_hash)?;
    Ok(progress(guard.reviews.self_reviews(), &promised))
}

/// Record a promise for `slug` against `review_input_hash`.
///
/// Rejects slugs that are unknown, already promised, or not next in order;
/// nothing is written on rejection.
pub fn promise<S: KeyValueStore>(
    store: &S,
    stone: &Stone,
    slug: &str,
    review_input_hash: &str,
) -> Result<SelfReviewProgress> {
    let reviews = match &stone.guard {
        Some(guard) if guard.has_self_reviews() => guard.reviews.self_reviews(),
        _ => {
            return Err(GuardConfigError::NoSelfReviews {
                stone: stone.name.clone(),
            }
            .into());
        }
    };
    let mut promised = promised_slugs(store, &stone.name, review_input_hash)?;
    validate_promise(&stone.name, reviews, &promised, slug)?;

    let prompt = reviews
        .iter()
        .find(|review| review.slug == slug)
        .map(|review| review.prompt.as_str())
        .unwrap_or_default();
    let contents = format!("promised: {slug}\nhash: {review_input_hash}\n\n{prompt}\n");
    store.put(&promise_key(&stone.name, slug, review_input_hash), &contents)?;
    info!(stone = %stone.name, slug, "self-review promised");

    promised.insert(slug.to_string());
    Ok(progress(reviews, &promised))
}

/// Load `name`, hash its current artifacts, and promise `slug` against that hash.
pub fn promise_stone<S: KeyValueStore>(
    paths: &RoutePaths,
    store: &S,
    name: &str,
    slug: &str,
) -> Result<SelfReviewProgress> {
    let stone = find_stone(paths, name)?;
    let hash = compute_review_input_hash(paths.root(), &stone)?;
    promise(store, &stone, slug, &hash)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::errors::PromiseError;
    use crate::io::store::MemoryStore;
    use crate::stone::{Reviews, SelfReview};

    fn stone_with_self_reviews(slugs: &[&str]) -> Stone {
        Stone {
            name: "1.a".to_string(),
            definition_path: PathBuf::from("1.a.stone"),
            guard: Some(Guard {
                path: PathBuf::from("1.a.guard"),
                artifacts: Vec::new(),
                reviews: Reviews::Split {
                    self_reviews: slugs
                        .iter()
                        .map(|slug| SelfReview {
                            slug: slug.to_string(),
                            prompt: format!("{slug}?"),
                        })
                        .collect(),
                    peer: Vec::new(),
                },
                judges: Vec::new(),
            }),
        }
    }

    #[test]
    fn promises_advance_in_order_until_satisfied() {
        let store = MemoryStore::new();
        let stone = stone_with_self_reviews(&["first", "second"]);
        let guard = stone.guard.clone().expect("guard");

        let initial = check_self_reviews(&store, &stone, &guard, "h1").expect("check");
        assert_eq!((initial.promised, initial.total), (0, 2));

        let err = promise(&store, &stone, "second", "h1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PromiseError>(),
            Some(PromiseError::OutOfOrder { .. })
        ));
        assert!(store.keys().is_empty());

        let after_first = promise(&store, &stone, "first", "h1").expect("promise");
        assert_eq!((after_first.promised, after_first.total), (1, 2));
        assert_eq!(after_first.next_slug(), Some("second"));
        assert_eq!(
            check_self_reviews(&store, &stone, &guard, "h1").expect("check"),
            after_first
        );

        let done = promise(&store, &stone, "second", "h1").expect("promise");
        assert!(done.satisfied);
    }

    #[test]
    fn new_hash_resets_progress_without_deleting_markers() {
        let store = MemoryStore::new();
        let stone = stone_with_self_reviews(&["first", "second"]);
        let guard = stone.guard.clone().expect("guard");
        promise(&store, &stone, "first", "h1").expect("promise");
        promise(&store, &stone, "second", "h1").expect("promise");

        let reset = check_self_reviews(&store, &stone, &guard, "h2").expect("check");
        assert_eq!((reset.promised, reset.total), (0, 2));
        assert_eq!(reset.next_slug(), Some("first"));
        assert_eq!(promises_for_hash(&store, "1.a", "h1").expect("markers").len(), 2);
    }

    #[test]
    fn promising_without_self_reviews_is_a_config_error() {
        let store = MemoryStore::new();
        let mut stone = stone_with_self_reviews(&[]);
        stone.guard = None;
        let err = promise(&store, &stone, "any", "h1").unwrap_err();
        assert!(err.downcast_ref::<GuardConfigError>().is_some());
    }

    #[test]
    fn marker_key_is_hash_scoped() {
        let store = MemoryStore::new();
        let stone = stone_with_self_reviews(&["first"]);
        promise(&store, &stone, "first", "abc").expect("promise");
        assert_eq!(
            store.keys(),
            vec!["1.a.guard.promise.first.abc.md".to_string()]
        );
    }

    #[test]
    fn editing_artifacts_invalidates_promises() {
        let route = crate::test_support::TempRoute::new().expect("route");
        let guard = "artifacts:\n  - a.md\nreviews:\n  self:\n    - slug: one\n      prompt: p1\n    - slug: two\n      prompt: p2\n";
        route.write_stone("1.a", Some(guard)).expect("stone");
        route.write_file("a.md", "draft").expect("artifact");
        let store = MemoryStore::new();
        let paths = route.paths();

        let progress = promise_stone(&paths, &store, "1.a", "one").expect("promise");
        assert_eq!((progress.promised, progress.total), (1, 2));

        route.write_file("a.md", "edited").expect("artifact");
        let stone = route.stone("1.a").expect("load");
        let hash = compute_review_input_hash(route.path(), &stone).expect("hash");
        let guard = stone.guard.as_ref().expect("guard");
        let reset = check_self_reviews(&store, &stone, guard, &hash).expect("check");
        assert_eq!((reset.promised, reset.total), (0, 2));
    }
}
