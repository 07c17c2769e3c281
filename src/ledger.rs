#![forbid(unsafe_code)]

//! The runs ledger: one `<video-uri> <run-reference>` line per run that has
//! been checked, in arrival order.
//!
//! The format is shared with older drun releases, so both fields are written
//! verbatim with a single space between them and no escaping.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

/// A single ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub video_uri: String,
    pub run_reference: String,
}

impl LedgerRecord {
    pub fn new(video_uri: impl Into<String>, run_reference: impl Into<String>) -> Self {
        Self {
            video_uri: video_uri.into(),
            run_reference: run_reference.into(),
        }
    }
}

impl fmt::Display for LedgerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.video_uri, self.run_reference)
    }
}

/// Open handle on the ledger file.
///
/// The handle holds an exclusive advisory lock until it is dropped, so a
/// scan followed by an append cannot interleave with another drun process
/// doing the same.
pub struct Ledger {
    path: PathBuf,
    file: Flock<File>,
}

impl Ledger {
    /// Opens (creating when needed) the ledger and its parent directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("opening ledger {}", path.display()))?;
        let file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            anyhow::Error::new(io::Error::from(errno))
                .context(format!("locking ledger {}", path.display()))
        })?;
        debug!(path = %path.display(), "opened ledger");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scans from the first line, whatever position the handle was left at.
    pub fn find_duplicate(&mut self, video_uri: &str) -> Result<Option<LedgerRecord>> {
        self.file
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("rewinding ledger {}", self.path.display()))?;
        let reader = BufReader::new(&*self.file);
        find_duplicate(reader, video_uri)
            .with_context(|| format!("scanning ledger {}", self.path.display()))
    }

    /// Adds a record after all existing content. A last line that was left
    /// without a terminator gets one first so the two records stay separate.
    pub fn append(&mut self, record: &LedgerRecord) -> Result<()> {
        let mut line = String::new();
        if !self
            .ends_with_newline()
            .with_context(|| format!("reading tail of ledger {}", self.path.display()))?
        {
            line.push('\n');
        }
        line.push_str(&format!("{record}\n"));
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .with_context(|| format!("appending to ledger {}", self.path.display()))?;
        debug!(%record, "appended ledger record");
        Ok(())
    }

    /// True for an empty file too.
    fn ends_with_newline(&mut self) -> io::Result<bool> {
        if self.file.metadata()?.len() == 0 {
            return Ok(true);
        }
        self.file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        self.file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }
}

/// Returns the first record whose line starts with `video_uri`.
///
/// Only the first `video_uri.len()` bytes of each line take part in the
/// comparison. One separator byte after them is skipped and the rest of the
/// line, without surrounding whitespace, is reported as the original run
/// reference.
pub fn find_duplicate<R: BufRead>(
    mut reader: R,
    video_uri: &str,
) -> io::Result<Option<LedgerRecord>> {
    let needle = video_uri.as_bytes();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if !line.starts_with(needle) {
            continue;
        }

        let rest = line.get(needle.len() + 1..).unwrap_or_default();
        return Ok(Some(LedgerRecord::new(
            video_uri,
            String::from_utf8_lossy(rest.trim_ascii()).into_owned(),
        )));
    }
}
