//! Test-only helpers: temporary routes and a scripted command runner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::vars::{CommandVars, substitute};
use crate::core::verdict::Captured;
use crate::io::catalog::find_stone;
use crate::io::command::CommandRunner;
use crate::io::paths::RoutePaths;
use crate::stone::Stone;

/// Build a `Captured` result.
pub fn captured(stdout: &str, stderr: &str, exit_code: Option<i32>) -> Captured {
    Captured {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
    }
}

/// A route root in a temporary directory.
pub struct TempRoute {
    dir: TempDir,
}

impl TempRoute {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create temp route")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> RoutePaths {
        RoutePaths::new(self.path())
    }

    /// Write `{name}.stone`, plus `{name}.guard` when `guard` is given.
    pub fn write_stone(&self, name: &str, guard: Option<&str>) -> Result<()> {
        self.write_file(&format!("{name}.stone"), &format!("# {name}\n"))?;
        if let Some(guard) = guard {
            self.write_file(&format!("{name}.guard"), guard)?;
        }
        Ok(())
    }

    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }

    /// Load a stone written with [`TempRoute::write_stone`].
    pub fn stone(&self, name: &str) -> Result<Stone> {
        find_stone(&self.paths(), name)
    }

    /// An unguarded stone that exists only in memory.
    pub fn bare_stone(&self, name: &str) -> Stone {
        Stone {
            name: name.to_string(),
            definition_path: self.paths().stone_path(name),
            guard: None,
        }
    }
}

struct Rule {
    needle: String,
    responses: VecDeque<Captured>,
}

/// Command runner returning scripted results and recording every call.
///
/// Each rule matches commands containing its needle. A rule with several
/// responses hands them out in order and repeats the last one. Unmatched
/// commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, needle: &str, response: Captured) -> Self {
        self.respond_sequence(needle, vec![response])
    }

    pub fn respond_sequence(self, needle: &str, responses: Vec<Captured>) -> Self {
        self.rules.borrow_mut().push(Rule {
            needle: needle.to_string(),
            responses: responses.into(),
        });
        self
    }

    /// Every executed command, after token substitution.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.contains(needle))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, vars: &CommandVars) -> Result<Captured> {
        self.calls.borrow_mut().push(substitute(command, vars));
        let mut rules = self.rules.borrow_mut();
        let Some(rule) = rules.iter_mut().find(|rule| command.contains(&rule.needle)) else {
            return Ok(captured("", "", Some(0)));
        };
        let response = if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        };
        Ok(response.unwrap_or_else(|| captured("", "", Some(0))))
    }
}
