//! Shared vectors with per-vector reader-writer locks.
//!
//! A [`SharedVector`] owns one contiguous run of `f64` values together with
//! an orientation tag. Readers proceed in parallel, writers are exclusive.
//! Operations that touch two or more distinct vectors acquire their locks in
//! ascending creation-id order; this single global ordering is what keeps
//! concurrent row tasks deadlock-free.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::MemError;
use crate::matrix::SharedMatrix;

/// Creation ids are monotonic across the whole process. They exist purely
/// to give multi-vector operations a total lock order.
static NEXT_VECTOR_ID: AtomicU64 = AtomicU64::new(0);

/// Whether a vector runs along a row or a column of its matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    /// The opposite orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

pub(crate) struct VectorInner {
    pub(crate) data: Vec<f64>,
    pub(crate) orientation: Orientation,
}

/// A thread-safe vector of `f64` values.
pub struct SharedVector {
    id: u64,
    pub(crate) inner: RwLock<VectorInner>,
}

impl SharedVector {
    /// Creates a vector owning `data` with the given orientation.
    pub fn new(data: Vec<f64>, orientation: Orientation) -> Self {
        SharedVector {
            id: NEXT_VECTOR_ID.fetch_add(1, Ordering::Relaxed),
            inner: RwLock::new(VectorInner { data, orientation }),
        }
    }

    /// The creation id used for lock ordering.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Reads the element at `index`.
    pub fn get(&self, index: usize) -> Result<f64, MemError> {
        let inner = self.inner.read();
        inner
            .data
            .get(index)
            .copied()
            .ok_or(MemError::IndexOutOfBounds {
                index,
                len: inner.data.len(),
            })
    }

    pub fn orientation(&self) -> Orientation {
        self.inner.read().orientation
    }

    /// Copies the current contents out under a read lock.
    pub fn snapshot(&self) -> Vec<f64> {
        self.inner.read().data.clone()
    }

    /// Flips the orientation tag. The data is untouched.
    pub fn transpose(&self) {
        let mut inner = self.inner.write();
        inner.orientation = inner.orientation.flipped();
    }

    /// Negates every element in place.
    pub fn negate(&self) {
        let mut inner = self.inner.write();
        for value in inner.data.iter_mut() {
            *value = -*value;
        }
    }

    /// Element-wise `self += other`.
    ///
    /// Adding a vector to itself doubles it under a single write lock; a
    /// second lock acquisition on the same vector would deadlock. For
    /// distinct vectors the two locks are taken in ascending id order.
    pub fn add(&self, other: &SharedVector) -> Result<(), MemError> {
        if self.id == other.id {
            let mut inner = self.inner.write();
            for value in inner.data.iter_mut() {
                *value += *value;
            }
            return Ok(());
        }

        let (mut dst, src);
        if self.id < other.id {
            dst = self.inner.write();
            src = other.inner.read();
        } else {
            src = other.inner.read();
            dst = self.inner.write();
        }

        if dst.data.len() != src.data.len() {
            return Err(MemError::LengthMismatch {
                left: dst.data.len(),
                right: src.data.len(),
            });
        }
        for (value, rhs) in dst.data.iter_mut().zip(src.data.iter()) {
            *value += *rhs;
        }
        Ok(())
    }

    /// Dot product of two vectors. Self-dot is the sum of squares and takes
    /// the read lock once.
    pub fn dot(&self, other: &SharedVector) -> Result<f64, MemError> {
        if self.id == other.id {
            let inner = self.inner.read();
            return Ok(inner.data.iter().map(|v| v * v).sum());
        }

        let (mine, theirs);
        if self.id < other.id {
            mine = self.inner.read();
            theirs = other.inner.read();
        } else {
            theirs = other.inner.read();
            mine = self.inner.read();
        }

        if mine.data.len() != theirs.data.len() {
            return Err(MemError::LengthMismatch {
                left: mine.data.len(),
                right: theirs.data.len(),
            });
        }
        Ok(mine
            .data
            .iter()
            .zip(theirs.data.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Replaces `self` with `self × matrix`, treating `self` as a row vector
    /// against a column-major matrix.
    ///
    /// Two-phase protocol: snapshot own data under a read lock, walk the
    /// columns with per-column read locks into a private buffer, then take
    /// the write lock on `self` alone to install the result. At no point is
    /// a lock on `self` held together with a column lock, and the read lock
    /// on `self` is released before the write lock is requested.
    pub fn vec_mat_mul(&self, matrix: &SharedMatrix) -> Result<(), MemError> {
        let (own, orientation) = {
            let inner = self.inner.read();
            (inner.data.clone(), inner.orientation)
        };
        if orientation != Orientation::Row {
            return Err(MemError::WrongOrientation {
                expected: Orientation::Row,
                found: orientation,
            });
        }

        let columns = matrix.snapshot();
        let mut result = Vec::with_capacity(columns.len());
        for column in &columns {
            let column = column.inner.read();
            if column.data.len() != own.len() {
                return Err(MemError::VectorMatrixMismatch {
                    length: own.len(),
                    rows: column.data.len(),
                });
            }
            result.push(
                own.iter()
                    .zip(column.data.iter())
                    .map(|(a, b)| a * b)
                    .sum(),
            );
        }

        let mut inner = self.inner.write();
        inner.data = result;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn new_vector_keeps_data_and_orientation() {
        let v = SharedVector::new(vec![1.0, 2.0, 3.0], Orientation::Row);
        assert_eq!(v.len(), 3);
        assert_eq!(v.orientation(), Orientation::Row);
        assert_relative_eq!(v.get(1).unwrap(), 2.0);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = SharedVector::new(vec![], Orientation::Row);
        let b = SharedVector::new(vec![], Orientation::Row);
        assert!(a.id() < b.id());
    }

    #[test]
    fn get_out_of_bounds() {
        let v = SharedVector::new(vec![1.0], Orientation::Row);
        assert!(matches!(
            v.get(1),
            Err(MemError::IndexOutOfBounds { index: 1, len: 1 })
        ));
    }

    #[test]
    fn transpose_twice_restores_orientation() {
        let v = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        v.transpose();
        assert_eq!(v.orientation(), Orientation::Column);
        v.transpose();
        assert_eq!(v.orientation(), Orientation::Row);
        assert_eq!(v.snapshot(), vec![1.0, 2.0]);
    }

    #[test]
    fn negate_in_place() {
        let v = SharedVector::new(vec![1.0, -2.0, 0.0], Orientation::Row);
        v.negate();
        assert_eq!(v.snapshot(), vec![-1.0, 2.0, -0.0]);
    }

    #[test]
    fn add_element_wise() {
        let a = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        let b = SharedVector::new(vec![10.0, 20.0], Orientation::Row);
        a.add(&b).unwrap();
        assert_eq!(a.snapshot(), vec![11.0, 22.0]);
        assert_eq!(b.snapshot(), vec![10.0, 20.0]);
    }

    #[test]
    fn add_is_order_independent_of_ids() {
        let a = SharedVector::new(vec![1.0], Orientation::Row);
        let b = SharedVector::new(vec![2.0], Orientation::Row);
        // b has the larger id; exercise both lock-order branches.
        a.add(&b).unwrap();
        b.add(&a).unwrap();
        assert_eq!(a.snapshot(), vec![3.0]);
        assert_eq!(b.snapshot(), vec![5.0]);
    }

    #[test]
    fn self_add_doubles() {
        let v = SharedVector::new(vec![1.0, -3.5], Orientation::Row);
        v.add(&v).unwrap();
        assert_eq!(v.snapshot(), vec![2.0, -7.0]);
    }

    #[test]
    fn add_length_mismatch() {
        let a = SharedVector::new(vec![1.0], Orientation::Row);
        let b = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        assert!(matches!(
            a.add(&b),
            Err(MemError::LengthMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn dot_product() {
        let a = SharedVector::new(vec![1.0, 2.0, 3.0], Orientation::Row);
        let b = SharedVector::new(vec![4.0, 5.0, 6.0], Orientation::Column);
        assert_relative_eq!(a.dot(&b).unwrap(), 32.0);
        assert_relative_eq!(b.dot(&a).unwrap(), 32.0);
    }

    #[test]
    fn self_dot_is_sum_of_squares() {
        let v = SharedVector::new(vec![3.0, 4.0], Orientation::Row);
        assert_relative_eq!(v.dot(&v).unwrap(), 25.0);
    }

    #[test]
    fn dot_length_mismatch() {
        let a = SharedVector::new(vec![1.0], Orientation::Row);
        let b = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        assert!(a.dot(&b).is_err());
    }

    #[test]
    fn vec_mat_mul_against_column_major() {
        // [1 2 3] * [[7 8] [9 10] [11 12]] = [58 64]
        let v = SharedVector::new(vec![1.0, 2.0, 3.0], Orientation::Row);
        let m = SharedMatrix::new();
        m.load_column_major(&[
            vec![7.0, 8.0],
            vec![9.0, 10.0],
            vec![11.0, 12.0],
        ])
        .unwrap();
        v.vec_mat_mul(&m).unwrap();
        assert_eq!(v.snapshot(), vec![58.0, 64.0]);
        assert_eq!(v.orientation(), Orientation::Row);
    }

    #[test]
    fn vec_mat_mul_dimension_mismatch() {
        let v = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        let m = SharedMatrix::new();
        m.load_column_major(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        assert!(matches!(
            v.vec_mat_mul(&m),
            Err(MemError::VectorMatrixMismatch { length: 2, rows: 3 })
        ));
    }

    #[test]
    fn vec_mat_mul_requires_row_orientation() {
        let v = SharedVector::new(vec![1.0], Orientation::Column);
        let m = SharedMatrix::new();
        m.load_column_major(&[vec![1.0]]).unwrap();
        assert!(matches!(
            v.vec_mat_mul(&m),
            Err(MemError::WrongOrientation { .. })
        ));
    }

    #[test]
    fn vec_mat_mul_zero_column_matrix_yields_empty_row() {
        let v = SharedVector::new(vec![1.0, 2.0], Orientation::Row);
        let m = SharedMatrix::new();
        v.vec_mat_mul(&m).unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn concurrent_adds_on_a_shared_pair_do_not_deadlock() {
        let x = Arc::new(SharedVector::new(vec![0.0; 64], Orientation::Row));
        let y = Arc::new(SharedVector::new(vec![1.0; 64], Orientation::Row));

        let mut handles = Vec::new();
        for flip in 0..4 {
            let x = Arc::clone(&x);
            let y = Arc::clone(&y);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    if flip % 2 == 0 {
                        x.add(&y).unwrap();
                    } else {
                        y.add(&x).unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(x.len(), 64);
        assert_eq!(y.len(), 64);
    }
}
