#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use std::{
    env,
    path::{Path, PathBuf},
};

/// Data directory relative to the user's home, shared with the original
/// modutils tooling so existing ledgers keep working.
pub const DATA_SUBDIR: &str = ".local/share/drun";
pub const LEDGER_FILE: &str = "runs";
pub const DEFAULT_SITE_BASE: &str = "https://www.speedrun.com";
/// Environment variable holding the `tracing` filter for the binaries.
pub const LOG_ENV: &str = "DRUN_LOG";

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub ledger_path: PathBuf,
}

/// Resolves the ledger location from the process environment.
pub fn load_runtime_paths() -> Result<RuntimePaths> {
    build_runtime_paths(env_var_string)
}

fn build_runtime_paths(env_lookup: impl Fn(&str) -> Option<String>) -> Result<RuntimePaths> {
    let home = env_lookup("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME not set; cannot locate the runs ledger"))?;
    Ok(RuntimePaths {
        ledger_path: data_dir_for_home(&home).join(LEDGER_FILE),
    })
}

/// `<home>/.local/share/drun`
fn data_dir_for_home(home: &Path) -> PathBuf {
    home.join(DATA_SUBDIR)
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
