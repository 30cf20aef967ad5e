//! Gated stone pipeline runner.
//!
//! Thin CLI over the `route` library. Every command takes an explicit route
//! root (`--root`, default the current directory); state lives in
//! `{root}/.route/`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use route::context::{GuardEvent, RouteContext};
use route::core::selector::SelectMode;
use route::delete::{DeletionPlan, apply_deletion, plan_deletion};
use route::exit_codes;
use route::gate::promise_stone;
use route::io::command::ShellCommandRunner;
use route::io::config::load_config;
use route::io::paths::RoutePaths;
use route::io::store::DirStore;
use route::next::{NextOutcome, next_from_root};
use route::pass::{PassOutcome, PassReason, approve_stone, pass_stone};
use route::status::route_status;

#[derive(Parser)]
#[command(name = "route", version, about = "Gated stone pipeline runner")]
struct Cli {
    /// Route root directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Attempt to pass a stone: check artifacts, run reviews and judges.
    Pass { stone: String },
    /// Record human approval; the next pass attempt re-runs judges.
    Approve { stone: String },
    /// Promise the next self-review of a stone for its current artifacts.
    Promise { stone: String, slug: String },
    /// Print the next incomplete stone(s).
    Next {
        #[arg(long, value_enum, default_value_t = ModeArg::One)]
        mode: ModeArg,
    },
    /// Delete stones matching a pattern. Stones with artifacts are always kept.
    Del {
        pattern: String,
        /// Delete for real; without this flag only the plan is printed.
        #[arg(long)]
        apply: bool,
    },
    /// Print every stone with its artifact and passage state.
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    One,
    All,
}

impl From<ModeArg> for SelectMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::One => SelectMode::One,
            ModeArg::All => SelectMode::All,
        }
    }
}

fn main() {
    route::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = RoutePaths::new(&cli.root);
    let store = DirStore::new(&paths.state_dir);
    match cli.command {
        Command::Pass { stone } => cmd_pass(&paths, &store, &stone, cli.json),
        Command::Approve { stone } => {
            approve_stone(&paths, &store, &stone)?;
            println!("approved: {stone}");
            Ok(exit_codes::OK)
        }
        Command::Promise { stone, slug } => {
            let progress = promise_stone(&paths, &store, &stone, &slug)?;
            if cli.json {
                print_json(&progress)?;
            } else if let Some(next) = &progress.next {
                println!("promised {slug} ({}/{})", progress.promised, progress.total);
                println!("next self-review: {}\n{}", next.slug, next.prompt);
            } else {
                println!("promised {slug}; self-reviews complete");
            }
            Ok(exit_codes::OK)
        }
        Command::Next { mode } => match next_from_root(&paths, &store, mode.into())? {
            NextOutcome::Complete => {
                if cli.json {
                    print_json(&Vec::<String>::new())?;
                }
                Ok(exit_codes::COMPLETE)
            }
            NextOutcome::Next(names) => {
                if cli.json {
                    print_json(&names)?;
                } else {
                    for name in names {
                        println!("{name}");
                    }
                }
                Ok(exit_codes::OK)
            }
        },
        Command::Del { pattern, apply } => {
            let plan = if apply {
                apply_deletion(&paths, &store, &pattern)?
            } else {
                plan_deletion(&paths, &pattern)?
            };
            if cli.json {
                print_json(&plan)?;
            } else {
                print_plan(&plan, apply);
            }
            Ok(exit_codes::OK)
        }
        Command::Status => {
            let status = route_status(&paths, &store)?;
            if cli.json {
                print_json(&status)?;
            } else {
                for stone in status {
                    println!(
                        "{}\t{}\tartifacts={}{}{}",
                        stone.name,
                        if stone.passed { "passed" } else { "open" },
                        stone.artifact_count,
                        if stone.guarded { "\tguarded" } else { "" },
                        if stone.approved { "\tapproved" } else { "" },
                    );
                }
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_pass(paths: &RoutePaths, store: &DirStore, stone: &str, json: bool) -> Result<i32> {
    let config = load_config(&paths.config_path)?;
    let runner = ShellCommandRunner::from_config(&config);
    // Commands may write their result to `$output`, which lives in the state dir.
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create {}", paths.state_dir.display()))?;
    let ctx = RouteContext::new(paths.root(), store, &runner);

    let outcome = pass_stone(&ctx, stone, &mut |event| report_event(event, json))?;
    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(stone, &outcome);
    }
    Ok(if outcome.is_passed() {
        exit_codes::OK
    } else {
        exit_codes::BLOCKED
    })
}

fn report_event(event: &GuardEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            eprintln!("{line}");
        }
        return;
    }
    match event {
        GuardEvent::ReviewBegan { index, command, .. } => eprintln!("review {index}: {command}"),
        GuardEvent::ReviewFinished {
            index,
            blockers,
            nitpicks,
            ..
        } => eprintln!("review {index}: blockers={blockers} nitpicks={nitpicks}"),
        GuardEvent::JudgeBegan { index, command, .. } => eprintln!("judge {index}: {command}"),
        GuardEvent::JudgeFinished { index, passed, .. } => {
            eprintln!("judge {index}: {}", if *passed { "passed" } else { "failed" });
        }
    }
}

fn print_outcome(stone: &str, outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Passed { reason } => {
            let why = match reason {
                PassReason::AlreadyPassed => "already passed",
                PassReason::Unguarded => "unguarded",
                PassReason::ArtifactsOnly => "artifacts only",
                PassReason::Judged { .. } => "all judges passed",
            };
            println!("passed: {stone} ({why})");
        }
        PassOutcome::ArtifactMissing { patterns } => {
            println!("blocked: {stone}: artifact not found ({})", patterns.join(", "));
        }
        PassOutcome::SelfReviewPending { progress } => {
            println!(
                "blocked: {stone}: self-review {}/{} promised",
                progress.promised, progress.total
            );
            if let Some(next) = &progress.next {
                println!("next self-review: {}\n{}", next.slug, next.prompt);
                println!("then run: route promise {stone} {}", next.slug);
            }
        }
        PassOutcome::Blocked { report } => {
            println!("blocked: {stone}");
            for reason in report.reasons() {
                println!("  {reason}");
            }
        }
    }
}

fn print_plan(plan: &DeletionPlan, applied: bool) {
    let verb = if applied { "deleted" } else { "would delete" };
    for deleted in &plan.deleted {
        println!("{verb}: {} ({})", deleted.name, deleted.files.join(", "));
    }
    for retained in &plan.retained {
        println!(
            "retained: {} ({} artifact(s))",
            retained.name,
            retained.artifacts.len()
        );
    }
}

/// Serialize `value` to pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pass_with_root() {
        let cli = Cli::parse_from(["route", "--root", "/tmp/r", "pass", "1.a"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/r"));
        assert!(matches!(cli.command, Command::Pass { ref stone } if stone == "1.a"));
    }

    #[test]
    fn parse_next_defaults_to_one() {
        let cli = Cli::parse_from(["route", "next"]);
        assert!(matches!(cli.command, Command::Next { mode: ModeArg::One }));
        let cli = Cli::parse_from(["route", "next", "--mode", "all"]);
        assert!(matches!(cli.command, Command::Next { mode: ModeArg::All }));
    }

    #[test]
    fn parse_del_is_dry_run_by_default() {
        let cli = Cli::parse_from(["route", "del", "research"]);
        assert!(matches!(cli.command, Command::Del { apply: false, .. }));
        let cli = Cli::parse_from(["route", "del", "research", "--apply"]);
        assert!(matches!(cli.command, Command::Del { apply: true, .. }));
    }
}
