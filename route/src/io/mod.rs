//! I/O helpers: filesystem state, guard files, subprocess execution.

pub mod artifacts;
pub mod catalog;
pub mod command;
pub mod config;
pub mod guard_file;
pub mod ledger;
pub mod paths;
pub mod process;
pub mod store;
