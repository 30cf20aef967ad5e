//! Resolve which files in the route root count as a stone's output.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern, glob_with};

use crate::core::hashing::ArtifactContent;
use crate::io::paths::STATE_DIR;
use crate::stone::Stone;

/// Glob patterns, relative to the route root, declaring the stone's output.
///
/// Falls back to `{name}*.md` when the stone has no guard or the guard
/// declares no artifact globs.
pub fn artifact_patterns(stone: &Stone) -> Vec<String> {
    match &stone.guard {
        Some(guard) if !guard.artifacts.is_empty() => guard
            .artifacts
            .iter()
            .map(|pattern| pattern.trim_start_matches("./").to_string())
            .collect(),
        _ => vec![format!("{}*.md", Pattern::escape(&stone.name))],
    }
}

/// Resolve the stone's artifacts as sorted, `/`-separated paths relative to `root`.
pub fn resolve_artifacts(root: &Path, stone: &Stone) -> Result<Vec<String>> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let escaped_root = Pattern::escape(&root.to_string_lossy());

    let mut found = BTreeSet::new();
    for pattern in artifact_patterns(stone) {
        let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        let matches =
            glob_with(&full, options).with_context(|| format!("invalid artifact glob '{pattern}'"))?;
        for entry in matches {
            let path = entry.with_context(|| format!("expand artifact glob '{pattern}'"))?;
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if is_state_path(relative) {
                continue;
            }
            found.insert(to_slash(relative));
        }
    }
    Ok(found.into_iter().collect())
}

/// Read resolved artifacts for hashing.
pub fn read_artifacts(root: &Path, relative: &[String]) -> Result<Vec<ArtifactContent>> {
    relative
        .iter()
        .map(|path| {
            let full = root.join(path);
            let content =
                fs::read(&full).with_context(|| format!("read artifact {}", full.display()))?;
            Ok(ArtifactContent {
                path: path.clone(),
                content,
            })
        })
        .collect()
}

fn is_state_path(relative: &Path) -> bool {
    matches!(relative.components().next(), Some(Component::Normal(first)) if first == STATE_DIR)
}

fn to_slash(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::stone::{Guard, Reviews};

    fn stone(name: &str, artifacts: Option<Vec<&str>>) -> Stone {
        Stone {
            name: name.to_string(),
            definition_path: PathBuf::from(format!("{name}.stone")),
            guard: artifacts.map(|globs| Guard {
                path: PathBuf::from(format!("{name}.guard")),
                artifacts: globs.into_iter().map(str::to_string).collect(),
                reviews: Reviews::default(),
                judges: Vec::new(),
            }),
        }
    }

    #[test]
    fn default_pattern_uses_stone_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("1.vision.md"), "v").expect("write");
        fs::write(root.join("1.vision.notes.md"), "n").expect("write");
        fs::write(root.join("2.other.md"), "o").expect("write");

        let found = resolve_artifacts(root, &stone("1.vision", None)).expect("resolve");
        assert_eq!(found, vec!["1.vision.md".to_string(), "1.vision.notes.md".to_string()]);
    }

    #[test]
    fn guard_globs_match_nested_files_and_skip_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("src/deep")).expect("mkdir");
        fs::create_dir_all(root.join(".route")).expect("mkdir");
        fs::write(root.join("src/deep/b.rs"), "b").expect("write");
        fs::write(root.join("src/a.rs"), "a").expect("write");
        fs::write(root.join(".route/x.rs"), "x").expect("write");

        let found =
            resolve_artifacts(root, &stone("2.code", Some(vec!["src/**/*.rs", "**/*.rs"])))
                .expect("resolve");
        assert_eq!(found, vec!["src/a.rs".to_string(), "src/deep/b.rs".to_string()]);
    }

    #[test]
    fn no_match_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let found = resolve_artifacts(temp.path(), &stone("1.a", Some(vec!["a.md"]))).expect("resolve");
        assert!(found.is_empty());
    }

    #[test]
    fn stone_name_metacharacters_are_literal() {
        let s = stone("1.[draft]", None);
        assert_eq!(artifact_patterns(&s), vec!["1.[[]draft[]]*.md".to_string()]);
    }
}
