//! Selection helpers for `route next`.

use anyhow::{Context, Result};

use crate::core::selector::{SelectMode, select_next};
use crate::io::catalog::load_stones;
use crate::io::ledger::PassageLedger;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;

/// Structured selection outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    /// Every stone carries a passage marker.
    Complete,
    /// Incomplete stone(s) to work on next, in order.
    Next(Vec<String>),
}

/// Pick the next stone(s) among `names` given the ledger in `store`.
pub fn next_among<S: KeyValueStore>(
    names: &[String],
    store: &S,
    mode: SelectMode,
) -> Result<NextOutcome> {
    let passed = PassageLedger::new(store).passed_among(names.iter().map(String::as_str))?;
    let selected = select_next(names, &passed, mode);
    if selected.is_empty() {
        return Ok(NextOutcome::Complete);
    }
    Ok(NextOutcome::Next(selected))
}

/// Load the route catalog and pick the next stone(s).
pub fn next_from_root<S: KeyValueStore>(
    paths: &RoutePaths,
    store: &S,
    mode: SelectMode,
) -> Result<NextOutcome> {
    let stones = load_stones(paths).with_context(|| "load stones for selection")?;
    let names: Vec<String> = stones.into_iter().map(|stone| stone.name).collect();
    next_among(&names, store, mode)
}
