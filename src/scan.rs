use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use time::{macros::format_description, OffsetDateTime};
use tracing::info;

use crate::executor::{Executor, RequestSpec};
use crate::types::{now_iso_like, HeaderChoice, ScanResult};

static ARTIFACT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Longest sanitized target kept in an artifact file name. The full name
/// stays well under the common 255-byte file name limit.
const MAX_TARGET_STEM: usize = 100;

/// Per-run settings shared by every scan task.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub injected_host: String,
    pub baseline: HeaderChoice,
    pub timeout: Duration,
    pub user_agent: String,
    pub output_dir: PathBuf,
}

/// Strip a leading `http://` or `https://` and replace anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_target(target: &str) -> String {
    let target = target.trim();
    let lower = target.to_ascii_lowercase();
    let without_scheme = ["http://", "https://"]
        .iter()
        .find(|scheme| lower.starts_with(*scheme))
        .map(|scheme| &target[scheme.len()..])
        .unwrap_or(target);
    without_scheme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Baseline and injected artifact paths for one scan.
///
/// The stem combines the sanitized target, a nanosecond timestamp and a
/// process-wide sequence number, so repeated scans never share a file.
pub fn artifact_paths(output_dir: &Path, target: &str) -> (PathBuf, PathBuf) {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]_[subsecond digits:9]");
    let stamp = OffsetDateTime::now_utc()
        .format(&fmt)
        .unwrap_or_else(|_| String::from("00000000_000000_000000000"));
    let seq = ARTIFACT_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = sanitize_target(target);
    // Sanitized names are pure ASCII, so any index is a char boundary.
    name.truncate(MAX_TARGET_STEM);
    let stem = format!("{name}_{stamp}_{seq}");
    (
        output_dir.join(format!("{stem}_baseline.txt")),
        output_dir.join(format!("{stem}_inject.txt")),
    )
}

/// Scan one target: optional baseline request, then the injected request.
pub async fn run_scan(executor: &Executor, target: &str, cfg: &ScanConfig) -> ScanResult {
    let started_at = now_iso_like();
    let (baseline_path, inject_path) = artifact_paths(&cfg.output_dir, target);
    info!(target, "scan started");

    let baseline = if cfg.baseline.is_configured() {
        let spec = RequestSpec::new(target, cfg.baseline.clone(), cfg.timeout, &cfg.user_agent);
        Some(executor.execute(&spec, &baseline_path).await)
    } else {
        None
    };

    let injected_spec = RequestSpec::new(
        target,
        HeaderChoice::Value(cfg.injected_host.clone()),
        cfg.timeout,
        &cfg.user_agent,
    );
    let injected = executor.execute(&injected_spec, &inject_path).await;

    info!(
        target,
        status = %injected.status_code,
        baseline_status = baseline.as_ref().map(|b| b.status_code.as_str()).unwrap_or("-"),
        "scan finished"
    );

    ScanResult {
        target: target.to_string(),
        injected_header: cfg.injected_host.clone(),
        baseline_header: cfg.baseline.clone(),
        injected,
        baseline,
        started_at,
    }
}
