//! Stable exit codes for route CLI commands.

/// Command succeeded, a stone passed, or a stone was selected.
pub const OK: i32 = 0;
/// Invalid guard, rejected promise, missing stone, or any other error.
pub const INVALID: i32 = 1;
/// `route next` found no incomplete stone.
pub const COMPLETE: i32 = 2;
/// `route pass` did not pass: blocked by a judge, a missing artifact, or a pending self-review.
pub const BLOCKED: i32 = 3;
