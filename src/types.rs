use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use time::{format_description::well_known, OffsetDateTime};

/// Placeholder used for status and server fields that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// What to do with the `Host` header of a request.
///
/// `Unset` means no baseline request is configured at all, `Omit` sends the
/// request without an explicit `Host` header and `Value` overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderChoice {
    #[default]
    Unset,
    Omit,
    Value(String),
}

impl HeaderChoice {
    /// Parse a baseline value from the command line. `none` (any case) means omission.
    pub fn from_baseline_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") => HeaderChoice::Unset,
            Some(v) if v.eq_ignore_ascii_case("none") => HeaderChoice::Omit,
            Some(v) => HeaderChoice::Value(v.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, HeaderChoice::Unset)
    }

    /// Header value to send, if any.
    pub fn header_value(&self) -> Option<&str> {
        match self {
            HeaderChoice::Value(v) if !v.is_empty() => Some(v.as_str()),
            _ => None,
        }
    }

    /// Representation used in the summary store and reports.
    pub fn label(&self) -> &str {
        match self {
            HeaderChoice::Unset => "",
            HeaderChoice::Omit => "none",
            HeaderChoice::Value(v) => v.as_str(),
        }
    }
}

/// One captured HTTP response, or the degraded capture of an unreachable target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCapture {
    pub status_code: String,
    pub server_header: String,
    pub raw: Vec<u8>,
    pub byte_count: u64,
    pub retrieved_at: String,
    pub artifact: PathBuf,
    /// Transport error message when the request did not complete.
    pub error: Option<String>,
}

impl ResponseCapture {
    pub fn unreachable(artifact: PathBuf, retrieved_at: String, error: String) -> Self {
        Self {
            status_code: NOT_AVAILABLE.to_string(),
            server_header: NOT_AVAILABLE.to_string(),
            raw: Vec::new(),
            byte_count: 0,
            retrieved_at,
            artifact,
            error: Some(error),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.error.is_some()
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::classify(&self.status_code)
    }

    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// The outcome of scanning one target.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub target: String,
    pub injected_header: String,
    pub baseline_header: HeaderChoice,
    pub injected: ResponseCapture,
    pub baseline: Option<ResponseCapture>,
    pub started_at: String,
}

impl ScanResult {
    pub fn summary_record(&self) -> SummaryRecord {
        SummaryRecord {
            target: self.target.clone(),
            host_header: self.injected_header.clone(),
            baseline_header: self.baseline_header.label().to_string(),
            http_status: self.injected.status_code.clone(),
            server_header: self.injected.server_header.clone(),
            response_file: self.injected.artifact.display().to_string(),
            baseline_file: self
                .baseline
                .as_ref()
                .map(|b| b.artifact.display().to_string())
                .unwrap_or_default(),
            scan_time: self.started_at.clone(),
            response_bytes: self.injected.byte_count,
        }
    }
}

/// One row of the summary store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub target: String,
    pub host_header: String,
    pub baseline_header: String,
    pub http_status: String,
    pub server_header: String,
    pub response_file: String,
    pub baseline_file: String,
    pub scan_time: String,
    pub response_bytes: u64,
}

/// Coarse category of a status code, used for coloring and run statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Redirect,
    Error,
    Unknown,
}

impl StatusClass {
    /// 2xx success, 3xx redirect, 4xx and 5xx error, anything else unknown.
    pub fn classify(status: &str) -> Self {
        let code = match status.trim().parse::<u16>() {
            Ok(c) if (100..=999).contains(&c) => c,
            _ => return StatusClass::Unknown,
        };
        match code / 100 {
            2 => StatusClass::Success,
            3 => StatusClass::Redirect,
            4 | 5 => StatusClass::Error,
            _ => StatusClass::Unknown,
        }
    }

    pub const ALL: [StatusClass; 4] = [
        StatusClass::Success,
        StatusClass::Redirect,
        StatusClass::Error,
        StatusClass::Unknown,
    ];
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusClass::Success => "success",
            StatusClass::Redirect => "redirect",
            StatusClass::Error => "error",
            StatusClass::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Aggregate counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub submitted: u64,
    pub completed: u64,
    pub unreachable: u64,
    pub peak_in_flight: usize,
    pub success: u64,
    pub redirect: u64,
    pub error: u64,
    pub unknown: u64,
}

impl RunStats {
    pub fn record(&mut self, result: &ScanResult) {
        self.completed += 1;
        if result.injected.is_unreachable() {
            self.unreachable += 1;
        }
        match result.injected.status_class() {
            StatusClass::Success => self.success += 1,
            StatusClass::Redirect => self.redirect += 1,
            StatusClass::Error => self.error += 1,
            StatusClass::Unknown => self.unknown += 1,
        }
    }
}

/// RFC 3339 UTC timestamp for records and captures.
pub fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
