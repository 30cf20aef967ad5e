//! Pass attempts: evaluate a stone's guard and record passage.
//!
//! Order of checks:
//! 1. at least one artifact exists
//! 2. unguarded and artifacts-only stones pass outright
//! 3. peer reviews without judges is a configuration error
//! 4. declared self-reviews must all be promised for the current hash
//! 5. peer reviews run (or are reused) for the current hash
//! 6. judges run (or passing verdicts are reused); every judge must pass
//!
//! Only a full pass writes the passage marker. A stone that already carries
//! one passes again without any check.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::context::{GuardEvent, RouteContext};
use crate::core::self_review::SelfReviewProgress;
use crate::errors::GuardConfigError;
use crate::gate::check_self_reviews;
use crate::io::artifacts::{artifact_patterns, resolve_artifacts};
use crate::io::catalog::find_stone;
use crate::io::command::CommandRunner;
use crate::io::ledger::PassageLedger;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;
use crate::judge::run_judges;
use crate::review::{compute_review_input_hash, next_review_iteration, run_reviews};
use crate::stone::{JudgeArtifact, ReviewArtifact, Stone};

/// Result of one pass attempt. Only configuration and I/O problems are errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Passed { reason: PassReason },
    ArtifactMissing { patterns: Vec<String> },
    SelfReviewPending { progress: SelfReviewProgress },
    Blocked { report: GuardReport },
}

impl PassOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassReason {
    AlreadyPassed,
    Unguarded,
    ArtifactsOnly,
    Judged { report: GuardReport },
}

/// Reviews and judges consulted by a guarded pass attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardReport {
    pub review_input_hash: String,
    pub judge_input_hash: Option<String>,
    pub reviews: Vec<ReviewArtifact>,
    pub judges: Vec<JudgeArtifact>,
}

impl GuardReport {
    pub fn failing_judges(&self) -> impl Iterator<Item = &JudgeArtifact> {
        self.judges.iter().filter(|judge| !judge.passed)
    }

    /// One line per failing judge.
    pub fn reasons(&self) -> Vec<String> {
        self.failing_judges()
            .map(|judge| match &judge.reason {
                Some(reason) => format!("judge {}: {reason}", judge.index),
                None => format!("judge {}: failed", judge.index),
            })
            .collect()
    }

    pub fn all_passed(&self) -> bool {
        self.failing_judges().next().is_none()
    }
}

/// Load `name` from the route root and attempt to pass it.
pub fn pass_stone<S: KeyValueStore, R: CommandRunner>(
    ctx: &RouteContext<'_, S, R>,
    name: &str,
    on_event: &mut dyn FnMut(&GuardEvent),
) -> Result<PassOutcome> {
    let stone = find_stone(&ctx.paths, name)?;
    evaluate_stone(ctx, &stone, on_event)
}

/// Attempt to pass an already-loaded stone.
#[instrument(skip_all, fields(stone = %stone.name))]
pub fn evaluate_stone<S: KeyValueStore, R: CommandRunner>(
    ctx: &RouteContext<'_, S, R>,
    stone: &Stone,
    on_event: &mut dyn FnMut(&GuardEvent),
) -> Result<PassOutcome> {
    if ctx.ledger().is_passed(&stone.name)? {
        debug!("already passed");
        return Ok(PassOutcome::Passed {
            reason: PassReason::AlreadyPassed,
        });
    }

    let artifacts = resolve_artifacts(ctx.root(), stone)?;
    if artifacts.is_empty() {
        let patterns = artifact_patterns(stone);
        warn!(patterns = ?patterns, "artifact not found");
        return Ok(PassOutcome::ArtifactMissing { patterns });
    }

    let Some(guard) = &stone.guard else {
        ctx.ledger().mark_passed(&stone.name)?;
        return Ok(PassOutcome::Passed {
            reason: PassReason::Unguarded,
        });
    };
    if guard.is_artifacts_only() {
        ctx.ledger().mark_passed(&stone.name)?;
        return Ok(PassOutcome::Passed {
            reason: PassReason::ArtifactsOnly,
        });
    }

    let peer = guard.reviews.peer();
    if !peer.is_empty() && guard.judges.is_empty() {
        return Err(GuardConfigError::ReviewsWithoutJudges {
            stone: stone.name.clone(),
            reviews: peer.len(),
        }
        .into());
    }

    let review_input_hash = compute_review_input_hash(ctx.root(), stone)?;

    if guard.has_self_reviews() {
        let progress = check_self_reviews(ctx.store, stone, guard, &review_input_hash)?;
        if !progress.satisfied {
            info!(
                promised = progress.promised,
                total = progress.total,
                next = ?progress.next_slug(),
                "self-review pending"
            );
            return Ok(PassOutcome::SelfReviewPending { progress });
        }
    }

    let iteration = next_review_iteration(ctx.store, &stone.name, &review_input_hash)?;
    let reviews = run_reviews(ctx, stone, peer, &review_input_hash, iteration, on_event)?;

    let judges = if guard.judges.is_empty() {
        Vec::new()
    } else {
        run_judges(ctx, stone, &guard.judges, &review_input_hash, iteration, on_event)?
    };
    let report = GuardReport {
        review_input_hash,
        judge_input_hash: judges.first().map(|judge| judge.judge_input_hash.clone()),
        reviews,
        judges,
    };

    if !report.all_passed() {
        warn!(reasons = ?report.reasons(), "stone blocked");
        return Ok(PassOutcome::Blocked { report });
    }
    ctx.ledger().mark_passed(&stone.name)?;
    Ok(PassOutcome::Passed {
        reason: PassReason::Judged { report },
    })
}

/// Record human approval for `name`. The next pass attempt re-runs its judges.
pub fn approve_stone<S: KeyValueStore>(paths: &RoutePaths, store: &S, name: &str) -> Result<()> {
    let stone = find_stone(paths, name)?;
    PassageLedger::new(store).mark_approved(&stone.name)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::store::MemoryStore;
    use crate::test_support::{ScriptedRunner, TempRoute, captured};

    const GUARDED: &str = "artifacts:\n  - a.md\nreviews:\n  - review\njudges:\n  - judge\n";

    #[test]
    fn missing_artifact_is_reported_with_patterns() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", Some(GUARDED)).expect("stone");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("pass");
        assert_eq!(
            outcome,
            PassOutcome::ArtifactMissing {
                patterns: vec!["a.md".to_string()]
            }
        );
        assert!(store.keys().is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn unguarded_stone_passes_on_default_artifact() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", None).expect("stone");
        route.write_file("1.a.notes.md", "done").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("pass");
        assert_eq!(
            outcome,
            PassOutcome::Passed {
                reason: PassReason::Unguarded
            }
        );
        assert!(ctx.ledger().is_passed("1.a").expect("ledger"));
    }

    #[test]
    fn artifacts_only_guard_passes_without_commands() {
        let route = TempRoute::new().expect("route");
        route
            .write_stone("1.a", Some("artifacts:\n  - out/*.md\n"))
            .expect("stone");
        route.write_file("out/x.md", "x").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("pass");
        assert_eq!(
            outcome,
            PassOutcome::Passed {
                reason: PassReason::ArtifactsOnly
            }
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn reviews_without_judges_fail_without_side_effects() {
        let route = TempRoute::new().expect("route");
        route
            .write_stone("1.a", Some("artifacts:\n  - a.md\nreviews:\n  - review\n"))
            .expect("stone");
        route.write_file("a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let err = pass_stone(&ctx, "1.a", &mut |_| {}).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GuardConfigError>(),
            Some(&GuardConfigError::ReviewsWithoutJudges {
                stone: "1.a".to_string(),
                reviews: 1,
            })
        );
        assert!(runner.calls().is_empty());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn failing_judge_blocks_with_reason() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", Some(GUARDED)).expect("stone");
        route.write_file("a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new()
            .respond("review", captured("blockers: 1\n", "", Some(0)))
            .respond("judge", captured("passed: false\nreason: has blockers\n", "", Some(0)));
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("pass");
        let PassOutcome::Blocked { report } = outcome else {
            panic!("expected blocked, got {outcome:?}");
        };
        assert_eq!(report.reasons(), vec!["judge 1: has blockers".to_string()]);
        assert_eq!(report.reviews[0].blockers, 1);
        assert!(!ctx.ledger().is_passed("1.a").expect("ledger"));
    }

    #[test]
    fn self_reviews_gate_peer_review() {
        let route = TempRoute::new().expect("route");
        let guard = "artifacts:\n  - a.md\nreviews:\n  self:\n    - slug: check\n      prompt: checked?\n  peer:\n    - review\njudges:\n  - judge\n";
        route.write_stone("1.a", Some(guard)).expect("stone");
        route.write_file("a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("pass");
        let PassOutcome::SelfReviewPending { progress } = outcome else {
            panic!("expected pending, got {outcome:?}");
        };
        assert_eq!(progress.next_slug(), Some("check"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn self_review_only_guard_passes_once_promised() {
        let route = TempRoute::new().expect("route");
        let guard = "reviews:\n  self:\n    - slug: check\n      prompt: checked?\n";
        route.write_stone("1.a", Some(guard)).expect("stone");
        route.write_file("1.a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new();
        let ctx = RouteContext::new(route.path(), &store, &runner);

        let stone = route.stone("1.a").expect("load");
        let hash = compute_review_input_hash(route.path(), &stone).expect("hash");
        crate::gate::promise(&store, &stone, "check", &hash).expect("promise");

        let outcome = evaluate_stone(&ctx, &stone, &mut |_| {}).expect("pass");
        assert!(outcome.is_passed());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn approval_requires_existing_stone() {
        let route = TempRoute::new().expect("route");
        let store = MemoryStore::new();
        let paths = route.paths();

        assert!(approve_stone(&paths, &store, "1.a").is_err());
        route.write_stone("1.a", None).expect("stone");
        approve_stone(&paths, &store, "1.a").expect("approve");
        approve_stone(&paths, &store, "1.a").expect("approve again");
        assert_eq!(store.keys(), vec!["1.a.approved".to_string()]);
    }

    #[test]
    fn passed_stone_passes_again_without_checks() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", Some(GUARDED)).expect("stone");
        route.write_file("a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        let runner = ScriptedRunner::new()
            .respond("judge", captured("passed: true\n", "", Some(0)));
        let ctx = RouteContext::new(route.path(), &store, &runner);

        assert!(pass_stone(&ctx, "1.a", &mut |_| {}).expect("first").is_passed());
        let calls = runner.calls().len();
        fs::remove_file(route.path().join("a.md")).expect("remove artifact");

        let outcome = pass_stone(&ctx, "1.a", &mut |_| {}).expect("second");
        assert_eq!(
            outcome,
            PassOutcome::Passed {
                reason: PassReason::AlreadyPassed
            }
        );
        assert_eq!(runner.calls().len(), calls);
        assert!(ctx.ledger().is_passed("1.a").expect("ledger"));
    }
}
