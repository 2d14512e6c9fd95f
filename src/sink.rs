use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::diff::{diff_artifacts, render_diff};
use crate::types::{ResponseCapture, RunStats, ScanResult, StatusClass, SummaryRecord};

const RULE: &str = "============================================================";

/// Verbose rendering switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub verbose: bool,
    pub show_diff: bool,
    pub color: bool,
}

/// Append-only CSV summary store. One row per scan result.
pub struct SummaryStore {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SummaryStore {
    /// Open `path` for appending. The header row is written only when the file is new or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open summary store: {}", path.display()))?;
        let is_empty = file
            .metadata()
            .with_context(|| format!("failed to stat summary store: {}", path.display()))?
            .len()
            == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    /// Write one whole record and flush it before returning.
    pub fn append(&mut self, record: &SummaryRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Everything the sink produced once the run is over.
#[derive(Debug, Default)]
pub struct SinkReport {
    pub stats: RunStats,
    pub records: Vec<SummaryRecord>,
}

/// Single consumer of finished scans. Appends to the summary store and
/// writes each verbose report as one uninterrupted block.
pub struct ResultSink<W: Write> {
    store: SummaryStore,
    out: W,
    opts: ReportOptions,
    keep_records: bool,
    report: SinkReport,
}

impl<W: Write> ResultSink<W> {
    pub fn new(store: SummaryStore, out: W, opts: ReportOptions) -> Self {
        Self {
            store,
            out,
            opts,
            keep_records: false,
            report: SinkReport::default(),
        }
    }

    /// Also keep every record in memory, for a JSON export at the end of the run.
    pub fn keep_records(mut self, keep: bool) -> Self {
        self.keep_records = keep;
        self
    }

    pub fn emit(&mut self, result: &ScanResult) -> Result<()> {
        let record = result.summary_record();
        self.store.append(&record)?;
        debug!(target = %record.target, store = %self.store.path().display(), "summary row appended");
        self.report.stats.record(result);
        if self.keep_records {
            self.report.records.push(record);
        }

        if self.opts.verbose {
            let block = render_report(result, &self.opts);
            self.out
                .write_all(block.as_bytes())
                .context("failed to write report")?;
            self.out.flush().context("failed to flush report")?;
        }
        Ok(())
    }

    pub fn finish(self) -> SinkReport {
        self.report
    }
}

/// Color a status code by class: 2xx green, 3xx yellow, 4xx/5xx red, other left plain.
pub fn paint_status(status: &str, color: bool) -> String {
    if !color {
        return status.to_string();
    }
    match StatusClass::classify(status) {
        StatusClass::Success => status.green().bold().to_string(),
        StatusClass::Redirect => status.yellow().bold().to_string(),
        StatusClass::Error => status.red().bold().to_string(),
        StatusClass::Unknown => status.dimmed().to_string(),
    }
}

fn format_kv_line(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{:<15}: {}\n", label, value));
}

fn push_response(out: &mut String, title: &str, capture: &ResponseCapture) {
    out.push_str(&format!("--- {} ---\n", title));
    match &capture.error {
        Some(err) => out.push_str(&format!("[request failed: {}]\n", err)),
        None => {
            out.push_str(&capture.raw_text());
            if !capture.raw.ends_with(b"\n") {
                out.push('\n');
            }
        }
    }
}

/// Human-readable report for one result. Returned as a single string so it
/// can be written in one piece.
pub fn render_report(result: &ScanResult, opts: &ReportOptions) -> String {
    let mut out = String::new();
    let title = " HOST HEADER INJECTION SCAN ";
    if opts.color {
        out.push_str(&format!("{}\n{}\n{}\n", RULE, title.bold(), RULE));
    } else {
        out.push_str(&format!("{}\n{}\n{}\n", RULE, title, RULE));
    }

    let injected = &result.injected;
    format_kv_line(&mut out, "Target", &result.target);
    format_kv_line(&mut out, "Injected Host", &result.injected_header);
    if result.baseline_header.is_configured() {
        format_kv_line(&mut out, "Baseline Host", result.baseline_header.label());
    }
    format_kv_line(&mut out, "Status", &paint_status(&injected.status_code, opts.color));
    format_kv_line(&mut out, "Server", &injected.server_header);
    format_kv_line(&mut out, "Bytes", &injected.byte_count.to_string());
    format_kv_line(&mut out, "Time", &result.started_at);
    if let Some(err) = &injected.error {
        format_kv_line(&mut out, "Error", err);
    }
    if let Some(baseline) = &result.baseline {
        format_kv_line(
            &mut out,
            "Baseline Status",
            &paint_status(&baseline.status_code, opts.color),
        );
        format_kv_line(&mut out, "Baseline Server", &baseline.server_header);
        format_kv_line(&mut out, "Baseline Bytes", &baseline.byte_count.to_string());
    }
    out.push('\n');

    push_response(&mut out, "Injected response", injected);
    if let Some(baseline) = &result.baseline {
        push_response(&mut out, "Baseline response", baseline);

        if opts.show_diff {
            out.push_str("--- Diff (baseline -> injected) ---\n");
            match diff_artifacts(&baseline.artifact, &injected.artifact) {
                Ok(d) if d.is_empty() => out.push_str("[responses are identical]\n"),
                Ok(d) => out.push_str(&render_diff(&d, opts.color)),
                Err(e) => out.push_str(&format!("[no diff available: {}]\n", e)),
            }
        }
    }
    out.push_str(RULE);
    out.push_str("\n\n");
    out
}
