#![forbid(unsafe_code)]

//! End-to-end duplicate check for a single run.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{RunSource, SpeedrunSite};
use crate::extract::extract_video_uri;
use crate::ledger::{Ledger, LedgerRecord};
use crate::run_id::{normalize_run_id, read_run_input};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The run has no video attached; the ledger was not touched.
    NoVideo { run_id: String },
    /// First sighting of this video, now stored in the ledger.
    Recorded(LedgerRecord),
    /// The video was already in the ledger under an earlier run.
    Duplicate(LedgerRecord),
}

/// Finds the ledger file. Only called once a run with a video needs checking,
/// so empty input and video-less runs never depend on it.
type LedgerLocator = Box<dyn Fn() -> Result<PathBuf>>;

pub struct DuplicateChecker<S> {
    source: S,
    site: SpeedrunSite,
    locate_ledger: LedgerLocator,
}

impl<S: RunSource> DuplicateChecker<S> {
    pub fn new(
        source: S,
        site: SpeedrunSite,
        locate_ledger: impl Fn() -> Result<PathBuf> + 'static,
    ) -> Self {
        Self {
            source,
            site,
            locate_ledger: Box::new(locate_ledger),
        }
    }

    /// Reads one line and checks it. `None` means the input was empty and
    /// nothing was fetched.
    pub fn check_from_reader<R: BufRead>(&self, reader: R) -> Result<Option<CheckOutcome>> {
        let Some(line) = read_run_input(reader).context("reading run from input")? else {
            debug!("no input, nothing to check");
            return Ok(None);
        };
        self.check(&line).map(Some)
    }

    pub fn check(&self, raw_input: &str) -> Result<CheckOutcome> {
        let run_id = normalize_run_id(raw_input);

        let raw = self
            .source
            .fetch_run(&run_id)
            .with_context(|| format!("fetching run '{run_id}'"))?;
        let video_uri = extract_video_uri(&raw)
            .with_context(|| format!("parsing metadata for run '{run_id}'"))?;
        drop(raw);

        let Some(video_uri) = video_uri else {
            return Ok(CheckOutcome::NoVideo { run_id });
        };
        let ledger_path = (self.locate_ledger)()?;
        let mut ledger = Ledger::open(&ledger_path)?;
        debug!(ledger = %ledger.path().display(), %video_uri, "scanning ledger");
        if let Some(existing) = ledger.find_duplicate(&video_uri)? {
            return Ok(CheckOutcome::Duplicate(existing));
        }

        let record = LedgerRecord::new(video_uri, self.site.run_reference(&run_id));
        ledger.append(&record)?;
        Ok(CheckOutcome::Recorded(record))
    }
}
