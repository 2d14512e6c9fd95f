use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};

use crate::error::ConfigError;

/// Strip a trailing `#` comment and surrounding whitespace.
/// Returns `None` when nothing is left.
pub fn clean_line(raw_line: &str) -> Option<&str> {
    let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Parse target list content eagerly. Duplicates are kept.
pub fn parse_targets_str(s: &str) -> Vec<String> {
    s.lines().filter_map(clean_line).map(str::to_string).collect()
}

/// Lazy, finite, non-restartable sequence of raw target strings.
pub enum TargetSource {
    Single(Option<String>),
    Lines(Split<Box<dyn AsyncBufRead + Send + Unpin>>),
}

impl TargetSource {
    pub fn single(target: impl Into<String>) -> Self {
        TargetSource::Single(Some(target.into().trim().to_string()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let boxed: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        TargetSource::Lines(boxed.split(b'\n'))
    }

    /// Open a target list file. The file is read line by line as targets are pulled.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|source| ConfigError::TargetFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Next target, or `None` at the end of the sequence.
    ///
    /// Lines are decoded lossily, so stray non-UTF-8 bytes never end the list.
    pub async fn next_target(&mut self) -> Result<Option<String>> {
        match self {
            TargetSource::Single(slot) => Ok(slot.take().filter(|t| !t.is_empty())),
            TargetSource::Lines(lines) => {
                while let Some(raw) = lines
                    .next_segment()
                    .await
                    .context("failed to read target list")?
                {
                    let line = String::from_utf8_lossy(&raw);
                    if let Some(target) = clean_line(&line) {
                        return Ok(Some(target.to_string()));
                    }
                }
                Ok(None)
            }
        }
    }
}
