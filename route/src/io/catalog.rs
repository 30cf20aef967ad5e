//! Stone discovery: `{name}.stone` definitions and their optional `{name}.guard`.

use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::io::guard_file::load_guard;
use crate::io::paths::RoutePaths;
use crate::stone::Stone;

/// Load every stone in the route root, in lexical name order.
///
/// A stone whose guard does not parse is left out with a warning, so one bad
/// guard cannot hide the rest of the route. [`find_stone`] still fails on it.
pub fn load_stones(paths: &RoutePaths) -> Result<Vec<Stone>> {
    let entries = fs::read_dir(&paths.root)
        .with_context(|| format!("read route dir {}", paths.root.display()))?;

    let mut names = Vec::new();
    let mut guard_names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read route dir {}", paths.root.display()))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(name) = file_name.strip_suffix(".stone").filter(|n| !n.is_empty()) {
            names.push(name.to_string());
        } else if let Some(name) = file_name.strip_suffix(".guard").filter(|n| !n.is_empty()) {
            guard_names.push(name.to_string());
        }
    }
    names.sort();

    for orphan in guard_names.iter().filter(|g| !names.contains(g)) {
        warn!(guard = %orphan, "guard has no matching stone, ignoring");
    }

    let mut stones = Vec::with_capacity(names.len());
    for name in &names {
        match load_stone(paths, name) {
            Ok(stone) => stones.push(stone),
            Err(err) => {
                warn!(
                    stone = %name,
                    error = %format!("{err:#}"),
                    "skipping stone with invalid guard"
                );
            }
        }
    }
    debug!(count = stones.len(), "stones loaded");
    Ok(stones)
}

/// Load one stone by name.
pub fn find_stone(paths: &RoutePaths, name: &str) -> Result<Stone> {
    let definition_path = paths.stone_path(name);
    if !definition_path.is_file() {
        return Err(anyhow!(
            "stone '{name}' not found (expected {})",
            definition_path.display()
        ));
    }
    load_stone(paths, name)
}

fn load_stone(paths: &RoutePaths, name: &str) -> Result<Stone> {
    let guard_path = paths.guard_path(name);
    let guard = if guard_path.is_file() {
        Some(load_guard(&guard_path).with_context(|| format!("load guard for stone '{name}'"))?)
    } else {
        None
    };
    Ok(Stone {
        name: name.to_string(),
        definition_path: paths.stone_path(name),
        guard,
    })
}
