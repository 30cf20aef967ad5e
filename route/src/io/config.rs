//! Route configuration stored under `.route/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Route configuration (TOML).
///
/// Missing fields default to values that reproduce plain `sh -c` execution
/// with no timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouteConfig {
    /// Shell prefix used to run review and judge commands.
    pub shell: Vec<String>,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Kill a review or judge command after this many seconds. Unset means wait forever.
    pub command_timeout_secs: Option<u64>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            shell: vec!["sh".to_string(), "-c".to_string()],
            output_limit_bytes: 1_000_000,
            command_timeout_secs: None,
        }
    }
}

impl RouteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shell.is_empty() || self.shell[0].trim().is_empty() {
            return Err(anyhow!("shell must be a non-empty array"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RouteConfig::default()`.
pub fn load_config(path: &Path) -> Result<RouteConfig> {
    if !path.exists() {
        let cfg = RouteConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RouteConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RouteConfig::default());
        assert_eq!(cfg.command_timeout(), None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "command_timeout_secs = 90\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.shell, vec!["sh".to_string(), "-c".to_string()]);
        assert_eq!(cfg.command_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn rejects_empty_shell() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "shell = []\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("shell must be a non-empty array"));
    }
}
