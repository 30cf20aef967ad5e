//! Deterministic, pure logic shared by the route engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod hashing;
pub mod naming;
pub mod selector;
pub mod self_review;
pub mod vars;
pub mod verdict;
