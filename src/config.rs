use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scan::ScanConfig;
use crate::sink::ReportOptions;
use crate::types::HeaderChoice;

pub const SUMMARY_FILE: &str = "summary.csv";

/// hostscan-rs — probe web targets for Host header injection.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hostscan-rs",
    version,
    about = "Probe web targets for Host header injection by comparing baseline and injected responses.",
    long_about = None
)]
pub struct Cli {
    /// Single target host or URL.
    #[arg(short = 't', long, conflicts_with = "file")]
    pub target: Option<String>,

    /// File with one target per line (`#` starts a comment).
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Host header value to inject.
    #[arg(short = 'H', long = "host")]
    pub host: String,

    /// Baseline Host header value, or `none` to send the baseline without a Host header.
    #[arg(short = 'b', long)]
    pub baseline: Option<String>,

    /// Show a unified diff between baseline and injected responses (verbose mode).
    #[arg(short = 'd', long, default_value_t = false)]
    pub diff: bool,

    /// Max concurrent scans.
    #[arg(short = 'c', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Request timeout in seconds.
    #[arg(short = 'T', long, default_value_t = 10)]
    pub timeout: u64,

    /// Directory for response artifacts and the summary CSV.
    #[arg(short = 'o', long = "output-dir", default_value = "hostscan_results")]
    pub output_dir: PathBuf,

    /// User-Agent sent with every request.
    #[arg(short = 'A', long = "user-agent", default_value = concat!("hostscan-rs/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Print a full report for every target.
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Accept invalid TLS certificates.
    #[arg(short = 'k', long, default_value_t = false)]
    pub insecure: bool,

    /// Disable ANSI colors.
    #[arg(long = "no-color", default_value_t = false)]
    pub no_color: bool,

    /// Also write all summary records as pretty JSON to this path.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG).
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

/// Where targets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInput {
    Single(String),
    File(PathBuf),
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: TargetInput,
    pub scan: ScanConfig,
    pub concurrency: usize,
    pub report: ReportOptions,
    pub insecure: bool,
    pub json: Option<PathBuf>,
}

impl RunConfig {
    pub fn summary_path(&self) -> PathBuf {
        self.scan.output_dir.join(SUMMARY_FILE)
    }
}

impl Cli {
    /// Validate the arguments. Does not touch the filesystem.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let input = match (self.target, self.file) {
            (Some(t), _) if !t.trim().is_empty() => TargetInput::Single(t.trim().to_string()),
            (_, Some(f)) => TargetInput::File(f),
            _ => return Err(ConfigError::MissingTarget),
        };
        let host = self.host.trim().to_string();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.timeout == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        Ok(RunConfig {
            input,
            scan: ScanConfig {
                injected_host: host,
                baseline: HeaderChoice::from_baseline_arg(self.baseline.as_deref()),
                timeout: Duration::from_secs(self.timeout),
                user_agent: self.user_agent,
                output_dir: self.output_dir,
            },
            concurrency: self.concurrency,
            report: ReportOptions {
                verbose: self.verbose,
                show_diff: self.diff,
                color: !self.no_color,
            },
            insecure: self.insecure,
            json: self.json,
        })
    }
}
