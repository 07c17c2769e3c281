#![forbid(unsafe_code)]

//! Speedrun moderation tool that spots runs reusing an already submitted
//! video.
//!
//! Reads one run id or run URL from stdin, fetches the run from speedrun.com
//! and compares its video against `~/.local/share/drun/runs`. New videos are
//! added to that ledger; repeats print the run that used the video first.

use anyhow::Result;
use clap::{ArgAction, Parser};
use modutils::api::{SpeedrunApi, SpeedrunSite};
use modutils::config::{LOG_ENV, load_runtime_paths};
use modutils::duplicate::{CheckOutcome, DuplicateChecker};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nLicense Unlicense: <https://unlicense.org>\n",
    "This is part of the modutils collection; see\n",
    "<https://www.github.com/MCBE-Speedrunning/modutils>"
);

const AFTER_HELP: &str = "\
Example: echo 'https://www.speedrun.com/mcbe/run/yj6wel3z' | drun

When a url is read from standard input, it will be compared against the
database file located in ~/.local/share/drun/runs.
If no match is found, the run will be added to the database.

Set DRUN_LOG=debug to trace each step on stderr.";

/// A speedrun moderation tool to find stolen videos from STDIN
#[derive(Parser, Debug)]
#[command(name = "drun", version = LONG_VERSION, disable_version_flag = true)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Display version information and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    let _cli = Cli::parse();
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", diagnostic(&err));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let site = SpeedrunSite::default();
    let checker = DuplicateChecker::new(SpeedrunApi::new(site.clone()), site, || {
        let runtime = load_runtime_paths()?;
        debug!(ledger = %runtime.ledger_path.display(), "resolved ledger path");
        Ok(runtime.ledger_path)
    });

    let Some(outcome) = checker.check_from_reader(io::stdin().lock())? else {
        return Ok(());
    };
    report(&outcome, &mut io::stdout().lock(), &mut io::stderr().lock())
}

/// One line with the whole context chain, e.g.
/// `drun: fetching run 'x': speedrun.com answered HTTP 404 for run 'x'`.
fn diagnostic(err: &anyhow::Error) -> String {
    format!("drun: {err:#}")
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

/// Prints the result the way moderators expect it: verdicts on stdout, the
/// "no video" notice on stderr.
fn report(outcome: &CheckOutcome, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    match outcome {
        CheckOutcome::NoVideo { run_id } => {
            debug!(%run_id, "run has no video");
            writeln!(err, "No video found")?;
        }
        CheckOutcome::Recorded(_) => {
            writeln!(out, "No duplicate found")?;
        }
        CheckOutcome::Duplicate(existing) => {
            writeln!(out, "Duplicate video found!")?;
            writeln!(out, "{}", existing.run_reference)?;
        }
    }
    out.flush()?;
    Ok(())
}
