//! Append-only buffer of outcomes observed while serving.
//!
//! The estimator never adjusts a live model. Observed outcomes are buffered
//! here and exported as execution-log lines for the next offline training
//! run.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{EstimatorError, Result};

use super::record::QueryExecutionRecord;

/// Default number of observations retained before the oldest are evicted.
pub const DEFAULT_OBSERVATION_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct BufferState {
    records: VecDeque<QueryExecutionRecord>,
    total_recorded: u64,
    evicted: u64,
}

/// Bounded FIFO of observed query outcomes.
#[derive(Debug)]
pub struct ObservationBuffer {
    state: Mutex<BufferState>,
    capacity: usize,
}

impl ObservationBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_OBSERVATION_CAPACITY)
    }

    /// Append an observation, evicting the oldest one when full.
    pub fn push(&self, record: QueryExecutionRecord) {
        let mut state = self.state.lock();
        state.records.push_back(record);
        state.total_recorded += 1;
        while state.records.len() > self.capacity {
            state.records.pop_front();
            state.evicted += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Observations accepted since creation, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.state.lock().total_recorded
    }

    /// Observations dropped because the buffer was full.
    pub fn evicted(&self) -> u64 {
        self.state.lock().evicted
    }

    /// Copy of the buffered observations, oldest first.
    pub fn snapshot(&self) -> Vec<QueryExecutionRecord> {
        self.state.lock().records.iter().cloned().collect()
    }

    /// Remove and return every buffered observation, oldest first.
    pub fn drain(&self) -> Vec<QueryExecutionRecord> {
        self.state.lock().records.drain(..).collect()
    }

    /// Drain the buffer and append it to an execution log at `path`.
    ///
    /// Returns the number of lines written. On failure the drained
    /// observations are put back in front of anything recorded meanwhile.
    pub fn flush_to(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let drained = self.drain();
        if drained.is_empty() {
            return Ok(0);
        }

        match Self::append_lines(path, &drained) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    count = drained.len(),
                    "Flushed observations for retraining"
                );
                Ok(drained.len())
            }
            Err(e) => {
                let mut state = self.state.lock();
                for record in drained.into_iter().rev() {
                    state.records.push_front(record);
                }
                while state.records.len() > self.capacity {
                    state.records.pop_front();
                    state.evicted += 1;
                }
                Err(e)
            }
        }
    }

    fn append_lines(path: &Path, records: &[QueryExecutionRecord]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| {
                EstimatorError::serialization(format!("Failed to serialize observation: {e}"))
            })?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for ObservationBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;
    use crate::workload::reader::RecordReader;
    use crate::workload::record::{Filter, Query, TableStats};

    fn observation(rows: f64) -> QueryExecutionRecord {
        let query = Query::new()
            .with_filter(Filter::new("age", ">", 30))
            .with_table_stats(TableStats::new(10_000, 100));
        QueryExecutionRecord::with_cardinality(query, rows)
    }

    #[test]
    fn test_push_and_drain() {
        let buffer = ObservationBuffer::new(10);
        buffer.push(observation(1.0));
        buffer.push(observation(2.0));
        assert_eq!(buffer.len(), 2);

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].actual_cardinality, Some(1.0));
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_recorded(), 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let buffer = ObservationBuffer::new(3);
        for i in 0..5 {
            buffer.push(observation(i as f64));
        }
        let kept = buffer.snapshot();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].actual_cardinality, Some(2.0));
        assert_eq!(buffer.evicted(), 2);
        assert_eq!(buffer.total_recorded(), 5);
    }

    #[test]
    fn test_flush_produces_trainable_log() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("retrain").join("observed.jsonl");

        let buffer = ObservationBuffer::new(100);
        buffer.push(observation(120.0));
        buffer.push(observation(80.0));
        assert_eq!(buffer.flush_to(&path).unwrap(), 2);
        assert!(buffer.is_empty());

        buffer.push(observation(60.0));
        assert_eq!(buffer.flush_to(&path).unwrap(), 1);

        let loaded = RecordReader::new(TargetKind::Cardinality).read_path(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.skipped, 0);
    }

    #[test]
    fn test_flush_empty_buffer_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("observed.jsonl");
        assert_eq!(ObservationBuffer::new(4).flush_to(&path).unwrap(), 0);
        assert!(!path.exists());
    }
}
