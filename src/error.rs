// Error taxonomy for the aggregation engine.
//
// Row-level problems are not errors: malformed rows are skipped and tallied
// (see `MalformedRow`). Everything in `AnalysisError` aborts the call that
// raised it, and the schema, empty-chunk and cardinality errors also abort
// the session.

use thiserror::Error;

use crate::record::Field;

/// Errors surfaced by the session, aggregators, and config validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error(
        "chunk {chunk} is missing required field(s) {} in every row; check the column mapping",
        format_fields(.missing)
    )]
    Schema { chunk: usize, missing: Vec<Field> },

    #[error("cannot {operation}: session is {state}")]
    Sequence {
        operation: &'static str,
        state: &'static str,
    },

    #[error("chunk {chunk} is empty; chunks must contain at least one record")]
    EmptyChunk { chunk: usize },

    #[error(
        "distinct value count {observed} exceeded the configured ceiling of {limit}; \
         raise max_distinct_values or analyze a smaller export"
    )]
    ResourceExhausted { limit: usize, observed: usize },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    /// Whether the session discards its in-progress state after this error.
    pub fn aborts_session(&self) -> bool {
        matches!(
            self,
            AnalysisError::Schema { .. }
                | AnalysisError::EmptyChunk { .. }
                | AnalysisError::ResourceExhausted { .. }
        )
    }
}

/// Shorthand used throughout the engine.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// A row that was skipped because it could not be turned into a `Record`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MalformedRow {
    /// 1-based position of the row in the whole stream (not the chunk)
    pub row: usize,
    pub reason: String,
}

fn format_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
