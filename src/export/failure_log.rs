// ABOUTME: Append-only text log of tables that failed to export
// ABOUTME: Records the table triple and error so an operator can re-run failures

use crate::table_ref::TableRef;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_FAILURE_LOG: &str = "failed.txt";

const ERROR_PREFIX: &str = "Error: ";

/// One failed table as read back from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub table_ref: TableRef,
    pub error: String,
}

/// Failure log at a fixed path
///
/// Each failure appends two lines:
///
/// ```text
/// DB.SCHEMA.TABLE
/// Error: <message>
/// ```
///
/// Existing content is never truncated.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure
    ///
    /// Newlines in the message are flattened so every entry stays two lines.
    pub fn append(&self, table: &TableRef, error: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open failure log at {}", self.path.display()))?;

        let message = error.replace(['\r', '\n'], " ");
        write!(file, "{}\n{}{}\n", table, ERROR_PREFIX, message)
            .with_context(|| format!("Failed to write failure log at {}", self.path.display()))?;

        Ok(())
    }

    /// Read every entry currently in the log
    ///
    /// A missing file has no entries. Lines that do not form a
    /// `table` / `Error:` pair are skipped with a warning.
    pub fn entries(&self) -> Result<Vec<FailureEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read failure log at {}", self.path.display()))?;

        let mut entries = Vec::new();
        let mut lines = content.lines().filter(|l| !l.trim().is_empty()).peekable();

        while let Some(line) = lines.next() {
            let table_ref = match line.parse::<TableRef>() {
                Ok(table_ref) => table_ref,
                Err(e) => {
                    tracing::warn!("⚠ Skipping unreadable failure log line '{}': {}", line, e);
                    continue;
                }
            };

            let error = match lines.peek() {
                Some(next) if next.starts_with(ERROR_PREFIX) => {
                    let error = next[ERROR_PREFIX.len()..].to_string();
                    lines.next();
                    error
                }
                _ => String::new(),
            };

            entries.push(FailureEntry { table_ref, error });
        }

        Ok(entries)
    }

    /// Distinct tables in the log, in first-seen order
    pub fn failed_tables(&self) -> Result<Vec<TableRef>> {
        let mut tables: Vec<TableRef> = Vec::new();
        for entry in self.entries()? {
            if !tables.contains(&entry.table_ref) {
                tables.push(entry.table_ref);
            }
        }
        Ok(tables)
    }
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_LOG)
    }
}
