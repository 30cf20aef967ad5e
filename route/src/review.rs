//! Peer review memoization keyed on the review input hash.
//!
//! A review for `(stone, hash, index)` runs at most once: any persisted
//! artifact for that triple is reused regardless of iteration.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::context::{GuardEvent, RouteContext};
use crate::core::hashing::review_input_hash;
use crate::core::naming::{ReviewKey, parse_review_key, review_key, review_prefix};
use crate::core::vars::CommandVars;
use crate::core::verdict::{parse_review_counts, render_review};
use crate::io::artifacts::{read_artifacts, resolve_artifacts};
use crate::io::command::{CommandRunner, run_captured};
use crate::io::store::KeyValueStore;
use crate::stone::{ReviewArtifact, Stone};

/// Hash the stone's current artifacts.
#[instrument(skip_all, fields(stone = %stone.name))]
pub fn compute_review_input_hash(root: &Path, stone: &Stone) -> Result<String> {
    let relative = resolve_artifacts(root, stone)?;
    let contents = read_artifacts(root, &relative)?;
    let hash = review_input_hash(&contents);
    debug!(artifacts = relative.len(), hash = %hash, "review input hash");
    Ok(hash)
}

/// Every persisted review for `stone`, sorted by key.
pub fn recorded_reviews<S: KeyValueStore>(
    store: &S,
    stone: &str,
) -> Result<Vec<(ReviewKey, String)>> {
    Ok(store
        .list_by_prefix(&review_prefix(stone))?
        .into_iter()
        .filter_map(|key| parse_review_key(stone, &key).map(|parsed| (parsed, key)))
        .collect())
}

/// Iteration a review run against `hash` belongs to.
///
/// Reuses the iteration already recorded for `hash`; otherwise one past the
/// highest iteration recorded for the stone.
pub fn next_review_iteration<S: KeyValueStore>(
    store: &S,
    stone: &str,
    hash: &str,
) -> Result<u32> {
    let recorded = recorded_reviews(store, stone)?;
    if let Some((existing, _)) = recorded.iter().find(|(parsed, _)| parsed.hash == hash) {
        return Ok(existing.iteration);
    }
    let highest = recorded
        .iter()
        .map(|(parsed, _)| parsed.iteration)
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

/// Review artifacts recorded under `hash`, as `(key, content)`.
pub fn reviews_for_hash<S: KeyValueStore>(
    store: &S,
    stone: &str,
    hash: &str,
) -> Result<Vec<(String, String)>> {
    let mut reviews = Vec::new();
    for (parsed, key) in recorded_reviews(store, stone)? {
        if parsed.hash != hash {
            continue;
        }
        let content = store.get(&key)?.unwrap_or_default();
        reviews.push((key, content));
    }
    Ok(reviews)
}

/// Run (or reuse) every peer review for `stone` against `hash`.
#[instrument(skip_all, fields(stone = %stone.name, hash = %hash, iteration = iteration))]
pub fn run_reviews<S: KeyValueStore, R: CommandRunner>(
    ctx: &RouteContext<'_, S, R>,
    stone: &Stone,
    peer: &[String],
    hash: &str,
    iteration: u32,
    on_event: &mut dyn FnMut(&GuardEvent),
) -> Result<Vec<ReviewArtifact>> {
    let recorded = recorded_reviews(ctx.store, &stone.name)?;
    let mut artifacts = Vec::with_capacity(peer.len());

    for (offset, command) in peer.iter().enumerate() {
        let index = offset + 1;

        let cached = recorded
            .iter()
            .find(|(parsed, _)| parsed.hash == hash && parsed.index == index);
        if let Some((parsed, key)) = cached {
            let content = ctx.store.get(key)?.unwrap_or_default();
            let counts = parse_review_counts(&content);
            debug!(index, key = %key, "review cache hit");
            artifacts.push(ReviewArtifact {
                stone: stone.name.clone(),
                input_hash: hash.to_string(),
                iteration: parsed.iteration,
                index,
                key: key.clone(),
                blockers: counts.blockers,
                nitpicks: counts.nitpicks,
            });
            continue;
        }

        let key = review_key(&stone.name, iteration, hash, index);
        let vars = CommandVars {
            stone: stone.name.clone(),
            route: ctx.root().to_path_buf(),
            hash: hash.to_string(),
            output: ctx.paths.state_path(&key),
        };

        on_event(&GuardEvent::ReviewBegan {
            stone: stone.name.clone(),
            index,
            command: command.clone(),
        });
        info!(index, "running review");
        let captured = run_captured(ctx.runner, command, &vars);

        // A command may write its review to `$output` itself; stdout is the fallback.
        let body = match ctx.store.get(&key)? {
            Some(written) if !written.trim().is_empty() => written,
            _ => captured.stdout.clone(),
        };
        let content = render_review(&body, &captured);
        ctx.store.put(&key, &content)?;

        let counts = parse_review_counts(&content);
        info!(
            index,
            blockers = counts.blockers,
            nitpicks = counts.nitpicks,
            exit_code = ?captured.exit_code,
            "review finished"
        );
        on_event(&GuardEvent::ReviewFinished {
            stone: stone.name.clone(),
            index,
            key: key.clone(),
            blockers: counts.blockers,
            nitpicks: counts.nitpicks,
        });
        artifacts.push(ReviewArtifact {
            stone: stone.name.clone(),
            input_hash: hash.to_string(),
            iteration,
            index,
            key,
            blockers: counts.blockers,
            nitpicks: counts.nitpicks,
        });
    }

    Ok(artifacts)
}
