//! Gated stone pipeline engine.
//!
//! A route is a directory of stones (`{name}.stone`), each optionally guarded
//! by a `{name}.guard` declaring artifact globs, self-review promises, peer
//! review commands and judge commands. A stone passes once its artifacts
//! exist and its guard is satisfied. Review and judge runs are memoized under
//! `.route/` by content hash, so repeated attempts only re-run what changed.
//!
//! - **[`core`]**: Pure, deterministic logic (hashing, key naming, verdict
//!   parsing, selection). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (state store, guard files, artifact
//!   globbing, process execution). Isolated to enable mocking in tests.
//!
//! Orchestration modules ([`pass`], [`gate`], [`next`], [`delete`], [`status`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod context;
pub mod core;
pub mod delete;
pub mod errors;
pub mod exit_codes;
pub mod gate;
pub mod io;
pub mod judge;
pub mod logging;
pub mod next;
pub mod pass;
pub mod review;
pub mod status;
pub mod stone;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
