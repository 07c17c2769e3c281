#![forbid(unsafe_code)]

//! Speedrun moderation helpers.
//!
//! The `drun` binary reads a run id or URL from stdin, looks up the run's
//! video on speedrun.com and checks it against a local ledger of runs that
//! were already seen.

pub mod api;
pub mod config;
pub mod duplicate;
pub mod extract;
pub mod ledger;
pub mod run_id;
