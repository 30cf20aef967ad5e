//! Pattern-based stone deletion that never touches stones with output.
//!
//! A stone with at least one resolved artifact is always retained, however
//! broad the pattern. Deleting a stone removes its definition, its guard, and
//! every state record under `.route/` that belongs to it.

use std::fs;

use anyhow::{Context, Result};
use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::naming::is_stone_state_key;
use crate::io::artifacts::resolve_artifacts;
use crate::io::catalog::load_stones;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;
use crate::stone::Stone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainedStone {
    pub name: String,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedStone {
    pub name: String,
    /// Definition files, relative to the route root.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    pub retained: Vec<RetainedStone>,
    pub deleted: Vec<DeletedStone>,
}

/// A pattern with no glob metacharacters matches any name containing it.
pub fn effective_pattern(pattern: &str) -> String {
    if pattern.contains(['*', '?', '[']) {
        pattern.to_string()
    } else {
        format!("*{}*", Pattern::escape(pattern))
    }
}

/// Classify every stone whose name matches `pattern`. Mutates nothing.
pub fn plan_deletion(paths: &RoutePaths, pattern: &str) -> Result<DeletionPlan> {
    let stones = load_stones(paths)?;
    classify(paths, &stones, pattern)
}

/// Delete matching stones that have no artifacts, with their state records.
#[instrument(skip_all, fields(pattern = %pattern))]
pub fn apply_deletion<S: KeyValueStore>(
    paths: &RoutePaths,
    store: &S,
    pattern: &str,
) -> Result<DeletionPlan> {
    let stones = load_stones(paths)?;
    let plan = classify(paths, &stones, pattern)?;

    for deleted in &plan.deleted {
        for file in &deleted.files {
            let path = paths.root.join(file);
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        let mut removed = 0;
        for key in store.list_by_prefix(&deleted.name)? {
            if is_stone_state_key(&deleted.name, &key) && store.delete(&key)? {
                removed += 1;
            }
        }
        info!(stone = %deleted.name, state_records = removed, "stone deleted");
    }
    for retained in &plan.retained {
        debug!(stone = %retained.name, artifacts = retained.artifacts.len(), "stone retained");
    }
    Ok(plan)
}

fn classify(paths: &RoutePaths, stones: &[Stone], pattern: &str) -> Result<DeletionPlan> {
    let effective = effective_pattern(pattern);
    let matcher =
        Pattern::new(&effective).with_context(|| format!("invalid deletion pattern '{pattern}'"))?;

    let mut plan = DeletionPlan::default();
    for stone in stones.iter().filter(|stone| matcher.matches(&stone.name)) {
        let artifacts = resolve_artifacts(paths.root(), stone)?;
        if !artifacts.is_empty() {
            plan.retained.push(RetainedStone {
                name: stone.name.clone(),
                artifacts,
            });
            continue;
        }
        let mut files = vec![format!("{}.stone", stone.name)];
        if stone.guard.is_some() {
            files.push(format!("{}.guard", stone.name));
        }
        plan.deleted.push(DeletedStone {
            name: stone.name.clone(),
            files,
        });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::test_support::TempRoute;

    #[test]
    fn plain_patterns_become_substring_globs() {
        assert_eq!(effective_pattern("research"), "*research*");
        assert_eq!(effective_pattern("3.*"), "3.*");
        assert_eq!(effective_pattern("1.[ab]"), "1.[ab]");
    }

    #[test]
    fn plan_retains_stones_with_artifacts_and_mutates_nothing() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", None).expect("stone");
        route.write_file("1.a.md", "output").expect("artifact");
        route.write_stone("1.b", Some("artifacts:\n  - b.md\n")).expect("stone");

        let plan = plan_deletion(&route.paths(), "*").expect("plan");
        assert_eq!(
            plan.retained,
            vec![RetainedStone {
                name: "1.a".to_string(),
                artifacts: vec!["1.a.md".to_string()],
            }]
        );
        assert_eq!(
            plan.deleted,
            vec![DeletedStone {
                name: "1.b".to_string(),
                files: vec!["1.b.stone".to_string(), "1.b.guard".to_string()],
            }]
        );
        assert!(route.exists("1.b.stone"));
        assert!(route.exists("1.b.guard"));
    }

    #[test]
    fn apply_removes_files_and_state_of_deleted_stones_only() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", None).expect("stone");
        route.write_file("1.a.md", "output").expect("artifact");
        route.write_stone("1.a.b", None).expect("stone");
        let store = MemoryStore::new();
        store.put("1.a.passed", "").expect("seed");
        store.put("1.a.b.passed", "").expect("seed");
        store.put("1.a.b.guard.review.i1.aa.r1.md", "").expect("seed");

        let plan = apply_deletion(&route.paths(), &store, "1.a.b").expect("apply");

        assert_eq!(plan.deleted.len(), 1);
        assert!(!route.exists("1.a.b.stone"));
        assert!(route.exists("1.a.stone"));
        assert_eq!(store.keys(), vec!["1.a.passed".to_string()]);
    }

    #[test]
    fn wildcard_apply_keeps_every_stone_with_output() {
        let route = TempRoute::new().expect("route");
        route.write_stone("1.a", None).expect("stone");
        route.write_file("1.a.md", "output").expect("artifact");
        route.write_stone("2.b", None).expect("stone");
        route.write_file("2.b.md", "output").expect("artifact");
        let store = MemoryStore::new();

        let plan = apply_deletion(&route.paths(), &store, "*").expect("apply");
        assert!(plan.deleted.is_empty());
        assert_eq!(plan.retained.len(), 2);
        assert!(route.exists("1.a.stone"));
        assert!(route.exists("2.b.stone"));
    }
}
