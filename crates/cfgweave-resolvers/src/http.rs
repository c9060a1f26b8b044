//! HTTPS resource resolver with bounded retry-with-backoff and a URL allowlist.

use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use cfgweave_core::{Error, Node, ResourceResolver, Result};
use log::warn;

/// Fetches JSON/YAML documents over HTTPS.
///
/// `selector` is the full URL; `resource_type` of `"json"` parses as JSON,
/// anything else is parsed as YAML. Requests are retried with exponential
/// backoff up to `max_retries` times; only URLs matching an `allowlist`
/// prefix are ever fetched.
pub struct HttpResolver {
    allowlist: Vec<String>,
    max_retries: u32,
}

impl HttpResolver {
    pub fn new(allowlist: Vec<String>) -> Self {
        Self {
            allowlist,
            max_retries: 3,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn check_allowlist(&self, url: &str) -> Result<()> {
        if self.allowlist.iter().any(|prefix| url.starts_with(prefix.as_str())) {
            Ok(())
        } else {
            Err(Error::hook(format!(
                "URL '{url}' is not in the resolver allowlist"
            )))
        }
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let agent = shared_agent();
        let mut attempt = 0;
        loop {
            match agent.get(url).call() {
                Ok(response) => {
                    return response.into_string().map_err(|e| {
                        Error::hook(format!("failed to read response body from '{url}': {e}"))
                    })
                }
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!("retrying '{url}' after error: {err} (attempt {attempt}/{})", self.max_retries);
                    thread::sleep(Duration::from_millis(100 * 2u64.pow(attempt)));
                }
                Err(err) => return Err(Error::hook(format!("request to '{url}' failed: {err}"))),
            }
        }
    }
}

/// Reused across resolver instances so connection pools amortize.
fn shared_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(ureq::Agent::new)
}

impl ResourceResolver for HttpResolver {
    fn resolve(&self, resource_type: &str, selector: &str) -> Result<Node> {
        self.check_allowlist(selector)?;
        let body = self.fetch(selector)?;
        match resource_type {
            "json" => {
                let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
                    Error::hook(format!("failed to parse JSON from '{selector}': {e}"))
                })?;
                Ok(Node::from_canonical_json(value))
            }
            _ => {
                let value: serde_yaml::Value = serde_yaml::from_str(&body).map_err(|e| {
                    Error::hook(format!("failed to parse YAML from '{selector}': {e}"))
                })?;
                Ok(Node::from(value))
            }
        }
    }
}
