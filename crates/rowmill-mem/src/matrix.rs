//! Shared matrices over [`SharedVector`] storage.
//!
//! A [`SharedMatrix`] is an ordered sequence of vectors that all share one
//! orientation. The matrix itself holds no data lock beyond the slot that
//! stores the vector list; element access synchronizes through the member
//! vectors' own locks. Readers first snapshot the vector list, then lock the
//! vectors, so a concurrent reload can never hand them a half-replaced
//! matrix.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::MemError;
use crate::vector::{Orientation, SharedVector, VectorInner};

/// A thread-safe dense matrix of `f64` values.
pub struct SharedMatrix {
    vectors: RwLock<Vec<Arc<SharedVector>>>,
}

impl SharedMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        SharedMatrix {
            vectors: RwLock::new(Vec::new()),
        }
    }

    /// Creates a matrix loaded row-major from `rows`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, MemError> {
        let matrix = SharedMatrix::new();
        matrix.load_row_major(rows)?;
        Ok(matrix)
    }

    /// Replaces the contents with one row-oriented vector per input row.
    /// The input is deep-copied.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<(), MemError> {
        validate_rectangular(rows)?;
        let vectors = rows
            .iter()
            .map(|row| Arc::new(SharedVector::new(row.clone(), Orientation::Row)))
            .collect();
        *self.vectors.write() = vectors;
        Ok(())
    }

    /// Replaces the contents with one column-oriented vector per input
    /// column. The input is still a row-major array; the data is transposed
    /// on load.
    pub fn load_column_major(&self, rows: &[Vec<f64>]) -> Result<(), MemError> {
        validate_rectangular(rows)?;
        let columns = rows.first().map_or(0, Vec::len);
        let vectors = (0..columns)
            .map(|c| {
                let column: Vec<f64> = rows.iter().map(|row| row[c]).collect();
                Arc::new(SharedVector::new(column, Orientation::Column))
            })
            .collect();
        *self.vectors.write() = vectors;
        Ok(())
    }

    /// Reads the whole matrix into a freshly allocated row-major array,
    /// transposing on the way out when the storage is column-major.
    ///
    /// All member vectors are read-locked (in ascending id order) before any
    /// element is copied, so the caller observes one consistent snapshot.
    /// The orientation is taken from the locked vectors themselves, not from
    /// separate matrix state.
    pub fn read_row_major(&self) -> Vec<Vec<f64>> {
        let vectors = self.snapshot();
        if vectors.is_empty() {
            return Vec::new();
        }

        let mut order: Vec<usize> = (0..vectors.len()).collect();
        order.sort_by_key(|&i| vectors[i].id());
        let mut acquired: Vec<(usize, RwLockReadGuard<'_, VectorInner>)> = order
            .into_iter()
            .map(|i| (i, vectors[i].inner.read()))
            .collect();
        acquired.sort_by_key(|(position, _)| *position);

        match acquired[0].1.orientation {
            Orientation::Row => acquired.iter().map(|(_, guard)| guard.data.clone()).collect(),
            Orientation::Column => {
                let rows = acquired[0].1.data.len();
                let columns = acquired.len();
                let mut out = vec![vec![0.0; columns]; rows];
                for (c, (_, guard)) in acquired.iter().enumerate() {
                    for (r, value) in guard.data.iter().enumerate() {
                        out[r][c] = *value;
                    }
                }
                out
            }
        }
    }

    /// The vector at `index`: a row for row-major storage, a column for
    /// column-major storage.
    pub fn get(&self, index: usize) -> Result<Arc<SharedVector>, MemError> {
        let vectors = self.vectors.read();
        vectors
            .get(index)
            .cloned()
            .ok_or(MemError::IndexOutOfBounds {
                index,
                len: vectors.len(),
            })
    }

    /// Number of stored vectors (rows or columns, depending on orientation).
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    /// Storage orientation, derived from a member vector. Empty matrices
    /// report row orientation.
    pub fn orientation(&self) -> Orientation {
        let vectors = self.vectors.read();
        match vectors.first() {
            Some(vector) => vector.orientation(),
            None => Orientation::Row,
        }
    }

    /// Takes a snapshot of the current vector list.
    pub(crate) fn snapshot(&self) -> Vec<Arc<SharedVector>> {
        self.vectors.read().clone()
    }
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_rectangular(rows: &[Vec<f64>]) -> Result<(), MemError> {
    let expected = rows.first().map_or(0, Vec::len);
    for (row, data) in rows.iter().enumerate().skip(1) {
        if data.len() != expected {
            return Err(MemError::RaggedMatrix {
                row,
                expected,
                actual: data.len(),
            });
        }
    }
    Ok(())
}
