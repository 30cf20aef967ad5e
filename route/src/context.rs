//! Capabilities shared by guard evaluation.

use std::path::Path;

use serde::Serialize;

use crate::io::command::CommandRunner;
use crate::io::ledger::PassageLedger;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;

/// Route root plus the state store and command runner a pass attempt runs against.
pub struct RouteContext<'a, S: KeyValueStore, R: CommandRunner> {
    pub paths: RoutePaths,
    pub store: &'a S,
    pub runner: &'a R,
}

impl<'a, S: KeyValueStore, R: CommandRunner> RouteContext<'a, S, R> {
    pub fn new(root: &Path, store: &'a S, runner: &'a R) -> Self {
        Self {
            paths: RoutePaths::new(root),
            store,
            runner,
        }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn ledger(&self) -> PassageLedger<'a, S> {
        PassageLedger::new(self.store)
    }
}

/// Progress notifications for freshly executed commands. Cache hits emit nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GuardEvent {
    ReviewBegan {
        stone: String,
        index: usize,
        command: String,
    },
    ReviewFinished {
        stone: String,
        index: usize,
        key: String,
        blockers: u32,
        nitpicks: u32,
    },
    JudgeBegan {
        stone: String,
        index: usize,
        command: String,
    },
    JudgeFinished {
        stone: String,
        index: usize,
        key: String,
        passed: bool,
    },
}
