//! Error types for the IR.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("unknown operator '{0}', expected one of \"+\", \"*\", \"-\", \"T\"")]
    UnknownOperator(String),

    #[error("operator '{operator}' expects {expected} operands, got {actual}")]
    OperandCount {
        operator: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("ragged matrix literal: row {row} has {actual} columns, expected {expected}")]
    RaggedLiteral {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid computation document: {0}")]
    Json(#[from] serde_json::Error),
}
