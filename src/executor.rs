use reqwest::header::{HOST, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::types::{now_iso_like, HeaderChoice, ResponseCapture, NOT_AVAILABLE};

/// Prepend `http://` unless the target already carries an http(s) scheme.
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    let lower = target.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        target.to_string()
    } else {
        format!("http://{target}")
    }
}

/// Extract the numeric code from an `HTTP/<version> <code> <reason>` first line.
pub fn parse_status_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let first = text.lines().next().unwrap_or("");
    let mut parts = first.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(proto), Some(code))
            if proto.starts_with("HTTP/")
                && code.len() == 3
                && code.bytes().all(|b| b.is_ascii_digit()) =>
        {
            code.to_string()
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Value of the first `Server:` header (case-insensitive) in a raw response dump.
pub fn find_server_header(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("server"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Everything needed to issue one request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: String,
    pub host: HeaderChoice,
    pub timeout: Duration,
    pub user_agent: String,
}

impl RequestSpec {
    pub fn new(target: &str, host: HeaderChoice, timeout: Duration, user_agent: &str) -> Self {
        Self {
            url: normalize_target(target),
            host,
            timeout,
            user_agent: user_agent.to_string(),
        }
    }
}

/// Issues single HTTP requests and persists their raw responses.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
}

impl Executor {
    /// Redirects are never followed so the routing decision of the first hop stays visible.
    pub fn new(insecure: bool) -> Result<Self, ConfigError> {
        let client = ClientBuilder::new()
            .danger_accept_invalid_certs(insecure)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Perform the request and write the raw response to `artifact`.
    ///
    /// Never fails: transport errors and timeouts produce an unreachable
    /// capture with an empty body and `N/A` status.
    pub async fn execute(&self, spec: &RequestSpec, artifact: &Path) -> ResponseCapture {
        let outcome = self.fetch(spec).await;
        let retrieved_at = now_iso_like();

        let capture = match outcome {
            Ok((raw, body_len)) => ResponseCapture {
                status_code: parse_status_line(&raw),
                server_header: find_server_header(&raw),
                byte_count: body_len,
                raw,
                retrieved_at,
                artifact: artifact.to_path_buf(),
                error: None,
            },
            Err(e) => {
                warn!(url = %spec.url, error = %e, "target unreachable");
                ResponseCapture::unreachable(artifact.to_path_buf(), retrieved_at, e.to_string())
            }
        };

        persist_artifact(artifact, &capture.raw).await;
        capture
    }

    async fn fetch(&self, spec: &RequestSpec) -> Result<(Vec<u8>, u64), reqwest::Error> {
        let mut request = self
            .client
            .get(&spec.url)
            .header(USER_AGENT, &spec.user_agent)
            .timeout(spec.timeout);
        if let Some(host) = spec.host.header_value() {
            request = request.header(HOST, host);
        }

        let response = request.send().await?;
        let mut raw = format!("{:?} {}\r\n", response.version(), response.status()).into_bytes();
        for (name, value) in response.headers() {
            raw.extend_from_slice(name.as_str().as_bytes());
            raw.extend_from_slice(b": ");
            raw.extend_from_slice(value.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n");

        let body = response.bytes().await?;
        raw.extend_from_slice(&body);
        Ok((raw, body.len() as u64))
    }
}

async fn persist_artifact(path: &Path, raw: &[u8]) {
    match tokio::fs::write(path, raw).await {
        Ok(()) => debug!(path = %path.display(), bytes = raw.len(), "artifact written"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write artifact"),
    }
}
