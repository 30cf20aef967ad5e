//! Canonical paths within a route root.

use std::path::{Path, PathBuf};

/// Directory under the route root holding all engine-owned state.
pub const STATE_DIR: &str = ".route";

/// All canonical paths for a route root.
#[derive(Debug, Clone)]
pub struct RoutePaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
}

impl RoutePaths {
    /// A relative `root` is resolved against the current directory, since
    /// commands run with the root as their working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        let state_dir = root.join(STATE_DIR);
        Self {
            root: root.clone(),
            config_path: state_dir.join("config.toml"),
            state_dir,
        }
    }

    pub fn stone_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.stone"))
    }

    pub fn guard_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.guard"))
    }

    /// On-disk location of a state key when the directory store is in use.
    pub fn state_path(&self, key: &str) -> PathBuf {
        self.state_dir.join(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
