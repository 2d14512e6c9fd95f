use hostscan_rs::executor::{Executor, RequestSpec};
use hostscan_rs::scan::{run_scan, ScanConfig};
use hostscan_rs::types::{HeaderChoice, NOT_AVAILABLE};
use std::path::Path;
use std::time::Duration;

mod common;

fn scan_config(dir: &Path, baseline: HeaderChoice) -> ScanConfig {
    ScanConfig {
        injected_host: "evil.example".into(),
        baseline,
        timeout: Duration::from_secs(5),
        user_agent: "hostscan-test".into(),
        output_dir: dir.to_path_buf(),
    }
}

fn artifact_count(dir: &Path, suffix: &str) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .count()
}

#[tokio::test]
async fn omitted_baseline_host_comes_from_url_authority() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("scan-omit");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Omit);

    let result = run_scan(&executor, &addr.to_string(), &cfg).await;

    let injected = result.injected.raw_text();
    assert!(injected.contains("host=evil.example"), "{injected}");
    let baseline = result.baseline.expect("baseline issued");
    let baseline_text = baseline.raw_text();
    assert!(baseline_text.contains(&format!("host={addr}")), "{baseline_text}");
    assert!(!baseline_text.contains("evil.example"));

    assert_eq!(result.injected.status_code, "200");
    assert_eq!(result.injected.server_header, "echo-test/1.0");
    assert_eq!(result.baseline_header, HeaderChoice::Omit);
    assert!(baseline.artifact.exists());
    assert!(result.injected.artifact.exists());
}

#[tokio::test]
async fn baseline_value_overrides_host() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("scan-value");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Value("good.example".into()));

    let result = run_scan(&executor, &format!("http://{addr}/"), &cfg).await;
    let baseline = result.baseline.expect("baseline issued");
    assert!(baseline.raw_text().contains("host=good.example"));
    assert!(result.injected.raw_text().contains("host=evil.example"));

    let record = std::fs::read_to_string(&result.injected.artifact).unwrap();
    assert!(record.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(record.contains("server: echo-test/1.0\r\n"));
    assert!(record.ends_with("host=evil.example\n"));
    assert_eq!(result.injected.byte_count, "host=evil.example\n".len() as u64);
}

#[tokio::test]
async fn no_baseline_configured_means_no_baseline_artifact() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("scan-unset");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Unset);

    let result = run_scan(&executor, &addr.to_string(), &cfg).await;
    assert!(result.baseline.is_none());
    assert_eq!(artifact_count(&dir, "_baseline.txt"), 0);
    assert_eq!(artifact_count(&dir, "_inject.txt"), 1);
    assert_eq!(result.summary_record().baseline_file, "");
}

#[tokio::test]
async fn repeated_scans_never_overwrite_artifacts() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("scan-repeat");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Omit);

    let target = addr.to_string();
    let (a, b) = tokio::join!(
        run_scan(&executor, &target, &cfg),
        run_scan(&executor, &target, &cfg)
    );
    assert_ne!(a.injected.artifact, b.injected.artifact);
    assert_eq!(artifact_count(&dir, "_inject.txt"), 2);
    assert_eq!(artifact_count(&dir, "_baseline.txt"), 2);
}

#[tokio::test]
async fn unreachable_target_is_absorbed() {
    let addr = common::closed_addr().await;
    let dir = common::temp_dir("scan-down");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Omit);

    let result = run_scan(&executor, &addr.to_string(), &cfg).await;
    assert_eq!(result.injected.status_code, NOT_AVAILABLE);
    assert_eq!(result.injected.server_header, NOT_AVAILABLE);
    assert_eq!(result.injected.byte_count, 0);
    assert!(result.injected.is_unreachable());
    assert!(result.baseline.unwrap().is_unreachable());
    assert!(result.injected.artifact.exists());
}

#[tokio::test]
async fn request_timeout_yields_unreachable_capture() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("exec-timeout");
    let executor = Executor::new(false).unwrap();
    let spec = RequestSpec::new(
        &format!("{addr}/slow"),
        HeaderChoice::Value("evil.example".into()),
        Duration::from_millis(200),
        "hostscan-test",
    );

    let started = std::time::Instant::now();
    let capture = executor.execute(&spec, &dir.join("slow_inject.txt")).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(capture.status_code, NOT_AVAILABLE);
    assert!(capture.error.is_some());
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("exec-redirect");
    let executor = Executor::new(false).unwrap();
    let spec = RequestSpec::new(
        &format!("{addr}/moved"),
        HeaderChoice::Omit,
        Duration::from_secs(5),
        "hostscan-test",
    );
    let capture = executor.execute(&spec, &dir.join("moved_inject.txt")).await;
    assert_eq!(capture.status_code, "301");
    assert_eq!(capture.status_class(), hostscan_rs::types::StatusClass::Redirect);
}

#[tokio::test]
async fn long_url_target_still_persists_artifacts() {
    let addr = common::spawn_echo_server().await;
    let dir = common::temp_dir("scan-long");
    let executor = Executor::new(false).unwrap();
    let cfg = scan_config(&dir, HeaderChoice::Omit);

    let target = format!("http://{addr}/{}", "a".repeat(300));
    let result = run_scan(&executor, &target, &cfg).await;
    assert_eq!(result.injected.status_code, "200");
    assert!(result.injected.artifact.exists());
    assert!(result.baseline.as_ref().expect("baseline issued").artifact.exists());
    let record = result.summary_record();
    assert!(Path::new(&record.response_file).exists());
}
