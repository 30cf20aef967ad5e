//! Judge memoization keyed on the judge input hash.
//!
//! The judge input hash folds in the review outputs and the approval marker,
//! so approving a stone re-runs its judges without re-running its reviews.
//! Only passing verdicts are reused; a failing judge runs again on every
//! attempt.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::context::{GuardEvent, RouteContext};
use crate::core::hashing::judge_input_hash;
use crate::core::naming::{JudgeKey, judge_key, judge_prefix, parse_judge_key};
use crate::core::vars::CommandVars;
use crate::core::verdict::{parse_judge_verdict, recorded_verdict, render_judge};
use crate::io::command::{CommandRunner, run_captured};
use crate::io::ledger::PassageLedger;
use crate::io::store::KeyValueStore;
use crate::review::reviews_for_hash;
use crate::stone::{JudgeArtifact, Stone};

/// Hash the reviews recorded under `review_input_hash` plus approval state.
pub fn compute_judge_input_hash<S: KeyValueStore>(
    store: &S,
    stone: &str,
    review_input_hash: &str,
) -> Result<String> {
    let reviews = reviews_for_hash(store, stone, review_input_hash)?;
    let approved = PassageLedger::new(store).is_approved(stone)?;
    Ok(judge_input_hash(review_input_hash, &reviews, approved))
}

/// Every persisted judge artifact for `stone`, sorted by key.
pub fn recorded_judges<S: KeyValueStore>(
    store: &S,
    stone: &str,
) -> Result<Vec<(JudgeKey, String)>> {
    Ok(store
        .list_by_prefix(&judge_prefix(stone))?
        .into_iter()
        .filter_map(|key| parse_judge_key(stone, &key).map(|parsed| (parsed, key)))
        .collect())
}

/// Run (or reuse) every judge for `stone` against the current review set.
#[instrument(skip_all, fields(stone = %stone.name, review_hash = %review_input_hash))]
pub fn run_judges<S: KeyValueStore, R: CommandRunner>(
    ctx: &RouteContext<'_, S, R>,
    stone: &Stone,
    judges: &[String],
    review_input_hash: &str,
    review_iteration: u32,
    on_event: &mut dyn FnMut(&GuardEvent),
) -> Result<Vec<JudgeArtifact>> {
    let judge_hash = compute_judge_input_hash(ctx.store, &stone.name, review_input_hash)?;
    let recorded = recorded_judges(ctx.store, &stone.name)?;
    let judge_iteration = recorded
        .iter()
        .filter(|(parsed, _)| parsed.judge_hash == judge_hash)
        .map(|(parsed, _)| parsed.judge_iteration)
        .max()
        .unwrap_or(0)
        + 1;
    debug!(judge_hash = %judge_hash, judge_iteration, "judge input hash");

    let mut artifacts = Vec::with_capacity(judges.len());
    for (offset, command) in judges.iter().enumerate() {
        let index = offset + 1;

        let reused = find_passing(
            ctx.store,
            stone,
            &recorded,
            review_input_hash,
            &judge_hash,
            index,
        )?;
        if let Some(reused) = reused {
            debug!(index, key = %reused.key, "judge cache hit");
            artifacts.push(reused);
            continue;
        }

        let key = judge_key(
            &stone.name,
            review_iteration,
            judge_iteration,
            review_input_hash,
            &judge_hash,
            index,
        );
        let vars = CommandVars {
            stone: stone.name.clone(),
            route: ctx.root().to_path_buf(),
            hash: review_input_hash.to_string(),
            output: ctx.paths.state_path(&key),
        };

        on_event(&GuardEvent::JudgeBegan {
            stone: stone.name.clone(),
            index,
            command: command.clone(),
        });
        info!(index, judge_iteration, "running judge");
        let captured = run_captured(ctx.runner, command, &vars);

        let body = match ctx.store.get(&key)? {
            Some(written) if !written.trim().is_empty() => written,
            _ => captured.stdout.clone(),
        };
        let verdict = parse_judge_verdict(&body, &captured);
        ctx.store.put(&key, &render_judge(&verdict, &body, &captured))?;

        if verdict.passed {
            info!(index, "judge passed");
        } else {
            warn!(index, reason = ?verdict.reason, "judge failed");
        }
        on_event(&GuardEvent::JudgeFinished {
            stone: stone.name.clone(),
            index,
            key: key.clone(),
            passed: verdict.passed,
        });
        artifacts.push(JudgeArtifact {
            stone: stone.name.clone(),
            review_input_hash: review_input_hash.to_string(),
            judge_input_hash: judge_hash.clone(),
            review_iteration,
            judge_iteration,
            index,
            key,
            passed: verdict.passed,
            reason: verdict.reason,
        });
    }

    Ok(artifacts)
}

/// Latest recorded passing verdict for exactly these inputs, if any.
fn find_passing<S: KeyValueStore>(
    store: &S,
    stone: &Stone,
    recorded: &[(JudgeKey, String)],
    review_input_hash: &str,
    judge_hash: &str,
    index: usize,
) -> Result<Option<JudgeArtifact>> {
    let mut candidates: Vec<&(JudgeKey, String)> = recorded
        .iter()
        .filter(|(parsed, _)| {
            parsed.review_hash == review_input_hash
                && parsed.judge_hash == judge_hash
                && parsed.index == index
        })
        .collect();
    candidates.sort_by_key(|(parsed, _)| std::cmp::Reverse(parsed.judge_iteration));

    for (parsed, key) in candidates {
        let Some(content) = store.get(key)? else {
            continue;
        };
        let Some(verdict) = recorded_verdict(&content) else {
            continue;
        };
        if !verdict.passed {
            continue;
        }
        return Ok(Some(JudgeArtifact {
            stone: stone.name.clone(),
            review_input_hash: review_input_hash.to_string(),
            judge_input_hash: judge_hash.to_string(),
            review_iteration: parsed.review_iteration,
            judge_iteration: parsed.judge_iteration,
            index,
            key: key.clone(),
            passed: true,
            reason: verdict.reason,
        }));
    }
    Ok(None)
}
