//! Error types for the evaluator.

use thiserror::Error;

use rowmill_mem::MemError;
use rowmill_sched::SchedError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("operator '{operator}' expects {expected} operands, got {actual}")]
    OperandCount {
        operator: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error(
        "matrix dimension mismatch for '{operator}': {left_rows}x{left_cols} vs {right_rows}x{right_cols}"
    )]
    DimensionMismatch {
        operator: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("no resolvable node found while the tree still contains operators")]
    NoResolvableNode,

    #[error("operand of a resolvable node is not a literal matrix")]
    UnresolvedOperand,

    #[error("literal nodes have nothing to compute")]
    ComputeOnLiteral,

    #[error(transparent)]
    Memory(#[from] MemError),

    #[error(transparent)]
    Scheduling(#[from] SchedError),
}
