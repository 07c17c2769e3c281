#![forbid(unsafe_code)]

//! Turns whatever a moderator pastes into a bare speedrun.com run id.
//!
//! Supported shapes:
//!  - `https://www.speedrun.com/<game>/run/<id>` (the game segment is optional)
//!  - `www.speedrun.com/run/<id>`
//!  - `<id>`

use std::io::{self, BufRead};

use tracing::debug;

const URL_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

/// Reads a single line of input. Returns `None` on immediate end of input so
/// callers can exit quietly without touching the network.
pub fn read_run_input<R: BufRead>(mut reader: R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Returns the bare run id for a raw input line. Input that does not look
/// like a URL is returned as-is (minus surrounding whitespace), including the
/// empty string.
pub fn normalize_run_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if !looks_like_url(trimmed) {
        return trimmed.to_string();
    }

    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let id = without_query
        .split('/')
        .rfind(|segment| !segment.is_empty())
        .unwrap_or(without_query);
    debug!(input = trimmed, run_id = id, "extracted run id from url");
    id.to_string()
}

fn looks_like_url(value: &str) -> bool {
    URL_PREFIXES.iter().any(|prefix| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}
