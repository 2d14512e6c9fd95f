use hostscan_rs::diff::{diff_artifacts, diff_texts, render_diff};

mod common;

#[test]
fn changed_middle_line_is_marked() {
    let d = diff_texts("A\nB\nC\n", "A\nX\nC\n", "baseline", "inject");
    let lines: Vec<&str> = d.lines().collect();
    assert!(lines.contains(&"--- baseline"));
    assert!(lines.contains(&"+++ inject"));
    assert!(lines.contains(&"@@ -1,3 +1,3 @@"));
    assert!(lines.contains(&" A"));
    assert!(lines.contains(&"-B"));
    assert!(lines.contains(&"+X"));
    assert!(lines.contains(&" C"));
    assert!(!lines.contains(&"-A"));
    assert!(!lines.contains(&"-C"));
}

#[test]
fn identical_texts_have_empty_diff() {
    assert!(diff_texts("same\n", "same\n", "a", "b").is_empty());
}

#[test]
fn artifacts_are_read_from_disk() {
    let dir = common::temp_dir("diff");
    let a = dir.join("a_baseline.txt");
    let b = dir.join("a_inject.txt");
    std::fs::write(&a, "HTTP/1.1 200 OK\r\n\r\nhello\n").unwrap();
    std::fs::write(&b, "HTTP/1.1 302 Found\r\n\r\nhello\n").unwrap();
    let d = diff_artifacts(&a, &b).expect("diff");
    assert!(d.contains("-HTTP/1.1 200 OK"));
    assert!(d.contains("+HTTP/1.1 302 Found"));
}

#[test]
fn missing_artifact_is_reported() {
    let dir = common::temp_dir("diff-missing");
    let a = dir.join("present.txt");
    std::fs::write(&a, "x\n").unwrap();
    let err = diff_artifacts(&a, &dir.join("absent.txt")).unwrap_err();
    assert!(err.to_string().contains("absent.txt"));
}

#[test]
fn plain_rendering_is_unchanged() {
    let d = diff_texts("A\n", "B\n", "a", "b");
    assert_eq!(render_diff(&d, false), d);
}
