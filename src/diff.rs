use colored::Colorize;
use similar::TextDiff;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A diff was requested but one side cannot be read.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("artifact '{}' is unavailable: {source}", .path.display())]
    MissingArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Unified diff of two texts, labelled with the given names.
pub fn diff_texts(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

/// Unified diff between a stored baseline artifact and a stored injected artifact.
pub fn diff_artifacts(baseline: &Path, injected: &Path) -> Result<String, DiffError> {
    let old = read_artifact(baseline)?;
    let new = read_artifact(injected)?;
    Ok(diff_texts(
        &old,
        &new,
        &baseline.display().to_string(),
        &injected.display().to_string(),
    ))
}

fn read_artifact(path: &Path) -> Result<String, DiffError> {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|source| DiffError::MissingArtifact {
            path: path.to_path_buf(),
            source,
        })
}

/// Color a unified diff for the terminal: additions green, removals red, hunks cyan.
pub fn render_diff(diff: &str, color: bool) -> String {
    if !color {
        return diff.to_string();
    }
    let mut out = String::with_capacity(diff.len());
    for line in diff.split_inclusive('\n') {
        let (text, nl) = match line.strip_suffix('\n') {
            Some(t) => (t, "\n"),
            None => (line, ""),
        };
        let painted = if text.starts_with("+++") || text.starts_with("---") {
            text.bold().to_string()
        } else if text.starts_with("@@") {
            text.cyan().to_string()
        } else if text.starts_with('+') {
            text.green().to_string()
        } else if text.starts_with('-') {
            text.red().to_string()
        } else {
            text.to_string()
        };
        out.push_str(&painted);
        out.push_str(nl);
    }
    out
}
