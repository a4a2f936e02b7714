//! Query Workload
//!
//! The data the estimator learns from and serves:
//!
//! - **Records**: queries, table statistics and observed outcomes
//! - **Reader**: newline-delimited JSON execution logs with per-record recovery
//! - **Observations**: outcomes seen while serving, buffered for retraining

mod lenient;
mod observations;
mod reader;
mod record;

pub use observations::{ObservationBuffer, DEFAULT_OBSERVATION_CAPACITY};
pub use reader::{LoadedRecords, RecordReader};
pub use record::{
    Filter, FilterQueryFeatures, Query, QueryExecutionRecord, TableStats, DEFAULT_OPERATOR,
    UNKNOWN_CATEGORY,
};
