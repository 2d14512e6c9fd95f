use std::process;

use hostscan_rs::config::{Cli, RunConfig, TargetInput};
use hostscan_rs::error::ConfigError;
use hostscan_rs::executor::Executor;
use hostscan_rs::runner::{open_targets, prepare_output_dir, run_scans, write_records_json};
use hostscan_rs::sink::{ResultSink, SummaryStore};
use hostscan_rs::types::RunStats;
use hostscan_rs::logging;

use anyhow::Result;
use clap::{CommandFactory, Parser};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let cfg = cli.into_config().unwrap_or_else(|e| config_failure(e));
    print_configuration(&cfg);

    if let Err(e) = prepare_output_dir(&cfg.scan.output_dir) {
        config_failure(e);
    }
    let source = open_targets(&cfg.input)
        .await
        .unwrap_or_else(|e| config_failure(e));
    let executor = Executor::new(cfg.insecure).unwrap_or_else(|e| config_failure(e));

    let summary_path = cfg.summary_path();
    let store = SummaryStore::open(&summary_path)?;
    let sink = ResultSink::new(store, std::io::stdout(), cfg.report).keep_records(cfg.json.is_some());

    let report = run_scans(source, executor, cfg.scan.clone(), cfg.concurrency, sink).await?;

    if let Some(path) = cfg.json.as_deref() {
        match write_records_json(path, &report) {
            Ok(()) => eprintln!("Wrote JSON results to {}", path.display()),
            Err(e) => eprintln!("Failed to write JSON to {}: {e:#}", path.display()),
        }
    }

    print_stats(&report.stats);
    eprintln!("Summary written to {}", summary_path.display());
    Ok(())
}

/// Print the problem and the usage text, then exit before any scanning.
fn config_failure(e: ConfigError) -> ! {
    eprintln!("error: {e}\n");
    let _ = Cli::command().print_help();
    eprintln!();
    process::exit(2);
}

fn print_configuration(cfg: &RunConfig) {
    eprintln!("hostscan-rs configuration:");
    match &cfg.input {
        TargetInput::Single(t) => eprintln!("  target       : {t}"),
        TargetInput::File(p) => eprintln!("  target file  : {}", p.display()),
    }
    eprintln!("  inject host  : {}", cfg.scan.injected_host);
    let baseline = if cfg.scan.baseline.is_configured() {
        cfg.scan.baseline.label()
    } else {
        "<not configured>"
    };
    eprintln!("  baseline     : {baseline}");
    eprintln!("  concurrency  : {}", cfg.concurrency);
    eprintln!("  timeout      : {}s", cfg.scan.timeout.as_secs());
    eprintln!("  output dir   : {}", cfg.scan.output_dir.display());
    eprintln!("  user agent   : {}", cfg.scan.user_agent);
    eprintln!(
        "  verbose      : {} (diff: {})",
        cfg.report.verbose, cfg.report.show_diff
    );
}

fn print_stats(stats: &RunStats) {
    eprintln!(
        "\nScanned {} of {} targets (unreachable: {}, peak concurrency: {})",
        stats.completed, stats.submitted, stats.unreachable, stats.peak_in_flight
    );
    eprintln!(
        "  2xx: {}  3xx: {}  4xx/5xx: {}  other: {}",
        stats.success, stats.redirect, stats.error, stats.unknown
    );
}
