#![forbid(unsafe_code)]

//! Pulls the video link out of a run document.
//!
//! speedrun.com nests it like this:
//!
//! ```json
//! "videos": {
//!     "links": [
//!         { "uri": "https://youtu.be/2vjYnibdCBg" }
//!     ]
//! }
//! ```
//!
//! The lookup walks the parsed tree by key name instead of relying on token
//! positions, so unrelated fields moving around does not change the result.

use std::collections::VecDeque;

use serde::Deserialize;
use serde_json::{Value, error::Category};
use thiserror::Error;
use tracing::{debug, warn};

/// Largest run document we are willing to parse. Real responses are a few KiB.
pub const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024;

const VIDEOS_KEY: &str = "videos";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("bad token, run metadata is corrupted: {0}")]
    Corrupted(#[source] serde_json::Error),
    #[error("run metadata is too large to parse: {reason}")]
    TooLarge { reason: String },
    #[error("run metadata is too short, expecting more JSON data: {0}")]
    Incomplete(#[source] serde_json::Error),
}

/// Only the fields we need from the `videos` object.
#[derive(Debug, Deserialize)]
struct VideoLinks {
    #[serde(default)]
    links: Option<Vec<VideoLink>>,
}

#[derive(Debug, Deserialize)]
struct VideoLink {
    uri: Option<String>,
}

/// Returns the run's video URI, `Ok(None)` when the run has no video.
pub fn extract_video_uri(raw: &[u8]) -> Result<Option<String>, ExtractError> {
    if raw.len() > MAX_DOCUMENT_BYTES {
        return Err(ExtractError::TooLarge {
            reason: format!("{} bytes exceeds the {MAX_DOCUMENT_BYTES} byte limit", raw.len()),
        });
    }

    let document: Value = serde_json::from_slice(raw).map_err(classify_parse_error)?;

    let Some(videos) = find_key(&document, VIDEOS_KEY) else {
        debug!("no videos key in run document");
        return Ok(None);
    };

    if videos.is_null() {
        debug!("run document has a null videos entry");
        return Ok(None);
    }

    let links = match VideoLinks::deserialize(videos) {
        Ok(links) => links,
        Err(err) => {
            warn!("unexpected shape for videos entry: {err}");
            return Ok(None);
        }
    };

    let uri = links
        .links
        .unwrap_or_default()
        .into_iter()
        .filter_map(|link| link.uri)
        .map(|uri| uri.trim().to_string())
        .find(|uri| !uri.is_empty());
    if uri.is_none() {
        debug!("videos entry carries no usable uri");
    }
    Ok(uri)
}

fn classify_parse_error(err: serde_json::Error) -> ExtractError {
    match err.classify() {
        Category::Eof => ExtractError::Incomplete(err),
        _ if err.to_string().starts_with("recursion limit exceeded") => ExtractError::TooLarge {
            reason: format!("nesting is too deep ({err})"),
        },
        _ => ExtractError::Corrupted(err),
    }
}

/// Breadth-first search so the shallowest matching key wins.
fn find_key<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut queue = VecDeque::from([root]);
    while let Some(value) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                if let Some(found) = map.get(key) {
                    return Some(found);
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RUN: &str = r#"{
        "data": {
            "id": "yj6wel3z",
            "weblink": "https://www.speedrun.com/mcbe/run/yj6wel3z",
            "game": "yd4ovvg1",
            "videos": {
                "links": [
                    { "uri": "https://youtu.be/2vjYnibdCBg" }
                ]
            },
            "comment": null,
            "links": [
                { "rel": "self", "uri": "https://www.speedrun.com/api/v1/runs/yj6wel3z" }
            ]
        }
    }"#;

    #[test]
    fn finds_video_uri_in_run_document() {
        let uri = extract_video_uri(SAMPLE_RUN.as_bytes()).unwrap();
        assert_eq!(uri.as_deref(), Some("https://youtu.be/2vjYnibdCBg"));
    }

    #[test]
    fn finds_minimal_videos_object() {
        let doc = br#"{"videos": {"links":[{"uri":"X"}]}}"#;
        assert_eq!(extract_video_uri(doc).unwrap().as_deref(), Some("X"));
    }

    #[test]
    fn tolerates_extra_text_field() {
        let doc = br#"{"data":{"videos":{"text":"see desc","links":[{"uri":"https://youtu.be/q"}]}}}"#;
        assert_eq!(
            extract_video_uri(doc).unwrap().as_deref(),
            Some("https://youtu.be/q")
        );
    }

    #[test]
    fn shallowest_videos_key_wins() {
        let doc = br#"{"a":{"b":{"videos":{"links":[{"uri":"deep"}]}}},"videos":{"links":[{"uri":"top"}]}}"#;
        assert_eq!(extract_video_uri(doc).unwrap().as_deref(), Some("top"));
    }

    #[test]
    fn missing_videos_key_is_not_an_error() {
        let doc = br#"{"data":{"id":"abc","comment":"no vid"}}"#;
        assert!(extract_video_uri(doc).unwrap().is_none());
    }

    #[test]
    fn null_videos_means_no_video() {
        let doc = br#"{"data":{"id":"abc","videos":null}}"#;
        assert!(extract_video_uri(doc).unwrap().is_none());
    }

    #[test]
    fn empty_links_means_no_video() {
        let doc = br#"{"data":{"videos":{"links":[]}}}"#;
        assert!(extract_video_uri(doc).unwrap().is_none());
        let doc = br#"{"data":{"videos":{"links":[{"uri":"  "}]}}}"#;
        assert!(extract_video_uri(doc).unwrap().is_none());
    }

    #[test]
    fn unbalanced_document_is_corrupted() {
        let err = extract_video_uri(br#"{"data":{"videos":[}}"#).unwrap_err();
        assert!(matches!(err, ExtractError::Corrupted(_)), "{err:?}");
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn trailing_garbage_is_corrupted() {
        let err = extract_video_uri(br#"{"data":{}} trailing"#).unwrap_err();
        assert!(matches!(err, ExtractError::Corrupted(_)), "{err:?}");
    }

    #[test]
    fn truncated_document_is_incomplete() {
        let truncated = &SAMPLE_RUN.as_bytes()[..SAMPLE_RUN.len() / 2];
        let err = extract_video_uri(truncated).unwrap_err();
        assert!(matches!(err, ExtractError::Incomplete(_)), "{err:?}");
        assert!(err.to_string().contains("expecting more JSON data"));
    }

    #[test]
    fn empty_body_is_incomplete() {
        let err = extract_video_uri(b"").unwrap_err();
        assert!(matches!(err, ExtractError::Incomplete(_)), "{err:?}");
    }

    #[test]
    fn oversized_document_is_too_large() {
        let mut doc = Vec::with_capacity(MAX_DOCUMENT_BYTES + 16);
        doc.extend_from_slice(b"{\"pad\":\"");
        doc.resize(MAX_DOCUMENT_BYTES + 8, b'x');
        doc.extend_from_slice(b"\"}");
        let err = extract_video_uri(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { .. }), "{err:?}");
    }

    #[test]
    fn deeply_nested_document_is_too_large() {
        let depth = 512;
        let doc = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let err = extract_video_uri(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { .. }), "{err:?}");
    }
}
