//! Error types for shared memory.

use thiserror::Error;

use crate::vector::Orientation;

#[derive(Error, Debug)]
pub enum MemError {
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector length {length} does not match matrix row count {rows}")]
    VectorMatrixMismatch { length: usize, rows: usize },

    #[error("ragged matrix: row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("expected a {expected:?}-oriented vector, found {found:?}")]
    WrongOrientation {
        expected: Orientation,
        found: Orientation,
    },
}
