//! Publish file management
//!
//! Diff scripts are saved as `{target}_{sequence}.publish.sql`, numbered one past the
//! highest sequence already present in the output directory.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const PUBLISH_SUFFIX: &str = ".publish.sql";

/// Writes versioned publish artifacts for one target database
pub struct PublishFileWriter {
    output_directory: PathBuf,
    target_database: String,
}

impl PublishFileWriter {
    pub fn new(output_directory: impl Into<PathBuf>, target_database: impl Into<String>) -> Self {
        Self {
            output_directory: output_directory.into(),
            target_database: target_database.into(),
        }
    }

    /// Path the next artifact would be written to
    pub fn next_path(&self) -> Result<PathBuf> {
        let sequence = match self.highest_sequence()? {
            Some(highest) => highest.checked_add(1).ok_or_else(|| {
                Error::Configuration(format!(
                    "No publish sequence left after {} in {}",
                    highest,
                    self.output_directory.display()
                ))
            })?,
            None => 1,
        };
        Ok(self.output_directory.join(format!(
            "{}_{}{}",
            self.target_database, sequence, PUBLISH_SUFFIX
        )))
    }

    /// Write the diff to the next artifact, creating the output directory if needed
    pub fn write(&self, diff: &str) -> Result<PathBuf> {
        let path = self.next_path()?;
        fs::create_dir_all(&self.output_directory)?;
        fs::write(&path, diff)?;

        tracing::info!(path = %path.display(), bytes = diff.len(), "Wrote publish file");
        Ok(path)
    }

    /// Highest existing sequence; an unparseable sequence counts as 1
    fn highest_sequence(&self) -> Result<Option<u64>> {
        if !self.output_directory.is_dir() {
            return Ok(None);
        }

        let pattern = Regex::new(&format!(
            r"^{}_(.+){}$",
            regex::escape(&self.target_database),
            regex::escape(PUBLISH_SUFFIX)
        ))
        .map_err(|e| Error::Configuration(format!("Invalid publish file pattern: {}", e)))?;

        let mut highest = None;
        for entry in fs::read_dir(&self.output_directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            let Some(captures) = pattern.captures(&name) else {
                continue;
            };
            let sequence = captures[1].parse::<u64>().unwrap_or(1);
            highest = highest.max(Some(sequence));
        }

        Ok(highest)
    }
}

/// Write `diff` as the next publish artifact for `target_database` under `output_directory`
pub fn write_publish_file(
    output_directory: &Path,
    target_database: &str,
    diff: &str,
) -> Result<PathBuf> {
    PublishFileWriter::new(output_directory, target_database).write(diff)
}
