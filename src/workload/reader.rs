//! Execution-log reader.
//!
//! Logs are newline-delimited JSON, one [`QueryExecutionRecord`] per line.
//! Lines that are not valid JSON, lack a field the target requires, or carry
//! an out-of-domain outcome are skipped with a warning. Only I/O failures on
//! the log itself abort a read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;

use crate::error::{EstimatorError, Result};
use crate::target::TargetKind;

use super::record::QueryExecutionRecord;

/// Records recovered from an execution log.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    /// Valid records in log order
    pub records: Vec<QueryExecutionRecord>,
    /// Non-blank lines that were skipped as malformed
    pub skipped: usize,
    /// Non-blank lines seen
    pub lines_read: usize,
}

impl LoadedRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses execution logs for one prediction target.
#[derive(Debug, Clone, Copy)]
pub struct RecordReader {
    target: TargetKind,
}

impl RecordReader {
    pub fn new(target: TargetKind) -> Self {
        Self { target }
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    /// Read and parse the log at `path`.
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<LoadedRecords> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EstimatorError::LogNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }

    /// Read and parse every line from `reader`.
    pub fn read<R: BufRead>(&self, reader: R) -> Result<LoadedRecords> {
        let mut loaded = LoadedRecords::default();

        for (index, line) in reader.split(b'\n').enumerate() {
            let bytes = line?;
            let line_no = index + 1;

            let text = match std::str::from_utf8(&bytes) {
                Ok(text) => text.trim(),
                Err(e) => {
                    loaded.lines_read += 1;
                    loaded.skipped += 1;
                    tracing::warn!("Skipping malformed record at line {}: {}", line_no, e);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }
            loaded.lines_read += 1;

            match self.parse_line(line_no, text) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    loaded.skipped += 1;
                    tracing::warn!("Skipping {}", e);
                }
            }
        }

        if loaded.skipped > 0 {
            tracing::warn!(
                skipped = loaded.skipped,
                valid = loaded.records.len(),
                "Execution log contained malformed records"
            );
        }
        Ok(loaded)
    }

    /// Parse one log line into a record for this reader's target.
    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<QueryExecutionRecord> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| EstimatorError::malformed(line_no, format!("invalid JSON: {e}")))?;

        let Value::Object(fields) = &value else {
            return Err(EstimatorError::malformed(line_no, "record is not a JSON object"));
        };

        for field in self.target.required_fields() {
            if !fields.contains_key(*field) {
                return Err(EstimatorError::malformed(
                    line_no,
                    format!("missing field `{field}`"),
                ));
            }
        }

        match self.target {
            TargetKind::Cardinality => {
                let stats = fields.get("table_stats").and_then(Value::as_object);
                let Some(stats) = stats else {
                    return Err(EstimatorError::malformed(
                        line_no,
                        "`table_stats` is not an object",
                    ));
                };
                for field in ["row_count", "distinct_count"] {
                    if !stats.contains_key(field) {
                        return Err(EstimatorError::malformed(
                            line_no,
                            format!("missing field `table_stats.{field}`"),
                        ));
                    }
                }
            }
            TargetKind::Selectivity => {
                if !fields.get("features").is_some_and(Value::is_object) {
                    return Err(EstimatorError::malformed(
                        line_no,
                        "`features` is not an object",
                    ));
                }
            }
        }

        let record: QueryExecutionRecord = serde_json::from_value(value)
            .map_err(|e| EstimatorError::malformed(line_no, e.to_string()))?;
        record
            .outcome(self.target)
            .map_err(|message| EstimatorError::malformed(line_no, message))?;
        Ok(record)
    }
}
