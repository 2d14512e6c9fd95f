use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::TargetInput;
use crate::error::ConfigError;
use crate::executor::Executor;
use crate::pool::WorkerPool;
use crate::scan::{run_scan, ScanConfig};
use crate::sink::{ResultSink, SinkReport};
use crate::targets::TargetSource;
use crate::types::ScanResult;

/// Create the output directory. Failure is a configuration error.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Open the configured target input.
pub async fn open_targets(input: &TargetInput) -> Result<TargetSource, ConfigError> {
    match input {
        TargetInput::Single(t) => Ok(TargetSource::single(t.clone())),
        TargetInput::File(path) => TargetSource::open(path).await,
    }
}

/// Scan every target from `source` with bounded concurrency and feed
/// the results, in completion order, to `sink`.
///
/// Returns once every submitted scan has been emitted.
pub async fn run_scans<W>(
    mut source: TargetSource,
    executor: Executor,
    scan_cfg: ScanConfig,
    concurrency: usize,
    mut sink: ResultSink<W>,
) -> Result<SinkReport>
where
    W: Write + Send + 'static,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<ScanResult>();

    let emitter = tokio::task::spawn_blocking(move || {
        let mut first_err = None;
        while let Some(result) = done_rx.blocking_recv() {
            if let Err(e) = sink.emit(&result) {
                error!(target = %result.target, error = %e, "failed to record result");
                first_err.get_or_insert(e);
            }
        }
        (sink.finish(), first_err)
    });

    let scan_cfg = Arc::new(scan_cfg);
    let mut pool = WorkerPool::new(concurrency, done_tx);
    let mut source_err = None;
    loop {
        let target = match source.next_target().await {
            Ok(Some(t)) => t,
            Ok(None) => break,
            Err(e) => {
                source_err = Some(e);
                break;
            }
        };
        let executor = executor.clone();
        let cfg = scan_cfg.clone();
        pool.submit(async move { run_scan(&executor, &target, &cfg).await })
            .await;
    }

    let pool_stats = pool.drain().await;
    info!(
        submitted = pool_stats.submitted,
        peak_in_flight = pool_stats.peak_in_flight,
        "all scans finished"
    );

    let (mut report, sink_err) = emitter
        .await
        .map_err(|e| anyhow!("result emitter stopped: {e}"))?;
    report.stats.submitted = pool_stats.submitted;
    report.stats.peak_in_flight = pool_stats.peak_in_flight;

    if let Some(e) = source_err {
        return Err(e);
    }
    if let Some(e) = sink_err {
        return Err(e);
    }
    Ok(report)
}

/// Write the collected summary records as pretty JSON.
pub fn write_records_json(path: &Path, report: &SinkReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create JSON output: {}", path.display()))?;
    serde_json::to_writer_pretty(file, &report.records)?;
    Ok(())
}
