//! Token substitution for review and judge command strings.

use std::path::PathBuf;

/// The fixed variable set available to guard commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandVars {
    /// `$stone`: stone name.
    pub stone: String,
    /// `$route`: route root directory.
    pub route: PathBuf,
    /// `$hash`: review input hash the command runs against.
    pub hash: String,
    /// `$output`: path of the artifact this execution will be persisted to.
    pub output: PathBuf,
}

/// Replace `$stone`, `$route`, `$hash` and `$output` in `command`.
///
/// Values are inserted verbatim; commands that need quoting must quote the
/// token themselves.
pub fn substitute(command: &str, vars: &CommandVars) -> String {
    command
        .replace("$stone", &vars.stone)
        .replace("$route", &vars.route.display().to_string())
        .replace("$hash", &vars.hash)
        .replace("$output", &vars.output.display().to_string())
}
