#![forbid(unsafe_code)]

//! Thin blocking client for the speedrun.com REST API.

use std::io::{self, Read};

use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_SITE_BASE;

const USER_AGENT: &str = concat!("drun/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("speedrun.com answered HTTP {status} for run '{run_id}'")]
    Status { run_id: String, status: u16 },
    #[error("request for run '{run_id}' failed ({kind})")]
    Transport {
        run_id: String,
        kind: ureq::ErrorKind,
        #[source]
        source: Box<ureq::Transport>,
    },
    #[error("reading response body for run '{run_id}'")]
    Body {
        run_id: String,
        #[source]
        source: io::Error,
    },
}

/// Anything that can hand back the raw run document for an id.
pub trait RunSource {
    fn fetch_run(&self, run_id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Builds API and run-page URLs for one speedrun.com deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedrunSite {
    base: String,
}

impl Default for SpeedrunSite {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_BASE)
    }
}

impl SpeedrunSite {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_run_url(&self, run_id: &str) -> String {
        format!("{}/api/v1/runs/{}", self.base, urlencoding::encode(run_id))
    }

    /// Canonical run page, stored next to the video in the ledger.
    pub fn run_reference(&self, run_id: &str) -> String {
        format!("{}/run/{}", self.base, run_id)
    }
}

pub struct SpeedrunApi {
    agent: ureq::Agent,
    site: SpeedrunSite,
}

impl SpeedrunApi {
    pub fn new(site: SpeedrunSite) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Self { agent, site }
    }
}

impl RunSource for SpeedrunApi {
    fn fetch_run(&self, run_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.site.api_run_url(run_id);
        debug!(%url, "fetching run metadata");

        let response = match self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    run_id: run_id.to_string(),
                    status,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport {
                    run_id: run_id.to_string(),
                    kind: transport.kind(),
                    source: Box::new(transport),
                });
            }
        };

        // Content-Length is optional on this API, so let the buffer grow.
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Body {
                run_id: run_id.to_string(),
                source,
            })?;
        debug!(bytes = body.len(), "received run metadata");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_site_builds_api_url() {
        let site = SpeedrunSite::default();
        assert_eq!(
            site.api_run_url("yj6wel3z"),
            "https://www.speedrun.com/api/v1/runs/yj6wel3z"
        );
    }

    #[test]
    fn run_reference_uses_run_path() {
        let site = SpeedrunSite::default();
        assert_eq!(
            site.run_reference("abc"),
            "https://www.speedrun.com/run/abc"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_trimmed() {
        let site = SpeedrunSite::new("http://localhost:8080/");
        assert_eq!(
            site.api_run_url("abc"),
            "http://localhost:8080/api/v1/runs/abc"
        );
    }

    #[test]
    fn api_url_encodes_odd_ids() {
        let site = SpeedrunSite::default();
        assert_eq!(
            site.api_run_url("a b?c"),
            "https://www.speedrun.com/api/v1/runs/a%20b%3Fc"
        );
    }

    #[test]
    fn status_error_names_run_and_code() {
        let err = FetchError::Status {
            run_id: "nope".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "speedrun.com answered HTTP 404 for run 'nope'"
        );
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Port 9 on loopback is the discard service and is closed on test hosts.
        let api = SpeedrunApi::new(SpeedrunSite::new("http://127.0.0.1:9"));
        let err = api.fetch_run("abc").unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
    }
}
