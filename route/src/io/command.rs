//! Command runner adapter for review and judge commands.
//!
//! The [`CommandRunner`] trait decouples the caches from subprocess
//! execution. Tests use scripted runners that return predetermined outputs
//! without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{instrument, warn};

use crate::core::vars::{CommandVars, substitute};
use crate::core::verdict::Captured;
use crate::io::config::RouteConfig;
use crate::io::process::run_command;

pub trait CommandRunner {
    /// Run `command` with `vars` available for substitution.
    ///
    /// `Err` means the command could not be executed at all; a command that
    /// ran and failed is an `Ok` with a non-zero exit code.
    fn run(&self, command: &str, vars: &CommandVars) -> Result<Captured>;
}

/// Runs commands through a shell in the route root, inheriting the environment.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    pub shell: Vec<String>,
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl ShellCommandRunner {
    pub fn from_config(cfg: &RouteConfig) -> Self {
        Self {
            shell: cfg.shell.clone(),
            timeout: cfg.command_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::from_config(&RouteConfig::default())
    }
}

impl CommandRunner for ShellCommandRunner {
    #[instrument(skip_all, fields(stone = %vars.stone))]
    fn run(&self, command: &str, vars: &CommandVars) -> Result<Captured> {
        let script = substitute(command, vars);
        let (program, prefix) = self
            .shell
            .split_first()
            .context("shell must be a non-empty array")?;
        let mut cmd = Command::new(program);
        cmd.args(prefix).arg(&script).current_dir(&vars.route);

        let output = run_command(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run `{script}`"))?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        stdout.push_str(&output.truncated_notice());
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = if output.timed_out {
            let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            warn!(timeout_secs = secs, "command timed out");
            stderr.push_str(&format!("command timed out after {secs}s\n"));
            None
        } else {
            output.status.code()
        };

        Ok(Captured {
            stdout,
            stderr,
            exit_code,
        })
    }
}

/// Run a command, folding execution errors into the captured output so a
/// failure to launch is recorded like any other failed command.
pub fn run_captured<R: CommandRunner>(runner: &R, command: &str, vars: &CommandVars) -> Captured {
    match runner.run(command, vars) {
        Ok(captured) => captured,
        Err(err) => {
            warn!(stone = %vars.stone, err = %format!("{err:#}"), "command could not be executed");
            Captured {
                stdout: String::new(),
                stderr: format!("failed to execute command: {err:#}\n"),
                exit_code: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn vars(root: &std::path::Path) -> CommandVars {
        CommandVars {
            stone: "1.vision".to_string(),
            route: root.to_path_buf(),
            hash: "abc".to_string(),
            output: root.join(".route").join("out.md"),
        }
    }

    #[test]
    fn runs_in_route_root_with_substitution() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "here").expect("write");
        let runner = ShellCommandRunner::default();
        let captured = runner
            .run("cat marker.txt; echo \" $stone $hash\"", &vars(temp.path()))
            .expect("run");
        assert_eq!(captured.stdout, "here 1.vision abc\n");
        assert_eq!(captured.exit_code, Some(0));
    }

    #[test]
    fn keeps_output_of_failing_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ShellCommandRunner::default();
        let captured = runner
            .run("echo partial; echo broken >&2; exit 4", &vars(temp.path()))
            .expect("run");
        assert_eq!(captured.stdout, "partial\n");
        assert_eq!(captured.stderr, "broken\n");
        assert_eq!(captured.exit_code, Some(4));
    }

    #[test]
    fn launch_failure_becomes_captured_failure() {
        let runner = ShellCommandRunner {
            shell: vec!["/nonexistent/shell".to_string()],
            timeout: None,
            output_limit_bytes: 1024,
        };
        let captured = run_captured(&runner, "true", &vars(&PathBuf::from("/")));
        assert_eq!(captured.exit_code, None);
        assert!(captured.stderr.contains("failed to execute command"));
    }
}
