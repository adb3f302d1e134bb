use crate::errors::{SimError, SimResult};
use crate::memory::MemoryTracker;
use crate::{Complex, Precision};
use num_traits::{One, Zero};
use std::mem::size_of;
use std::ops::{Index, IndexMut};

/// A dense `rows x cols` complex matrix stored row-major.
///
/// Matrices report their entry storage to a [`MemoryTracker`], disabled unless set with
/// [`Matrix::tracked_by`]. Clones report their own copy.
#[derive(Debug)]
pub struct Matrix<P: Precision> {
    rows: usize,
    cols: usize,
    data: Vec<Complex<P>>,
    memory: MemoryTracker,
}

/// Make a vector of complex numbers whose reals are given by `data`
pub fn from_reals<P: Precision>(data: &[P]) -> Vec<Complex<P>> {
    data.iter()
        .map(|x| Complex::<P> {
            re: *x,
            im: P::zero(),
        })
        .collect()
}

/// Make a vector of complex numbers whose reals are given by the first tuple entry in `data` and
/// whose imaginaries are from the second.
pub fn from_tuples<P: Precision>(data: &[(P, P)]) -> Vec<Complex<P>> {
    data.iter()
        .map(|(r, i)| Complex::<P> { re: *r, im: *i })
        .collect()
}

pub(crate) fn zeroed<T: Clone>(len: usize, value: T) -> SimResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| SimError::out_of_memory(format!("{} entries: {}", len, e)))?;
    v.resize(len, value);
    Ok(v)
}

impl<P: Precision> Matrix<P> {
    /// A zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> SimResult<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| SimError::out_of_memory(format!("{}x{} matrix", rows, cols)))?;
        Ok(Self {
            rows,
            cols,
            data: zeroed(len, Complex::zero())?,
            memory: MemoryTracker::default(),
        })
    }

    /// Wrap row-major `data`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Complex<P>>) -> SimResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(SimError::WrongMatrixSize {
                expected: (rows, cols),
                found: (data.len() / cols.max(1), cols),
            });
        }
        Ok(Self {
            rows,
            cols,
            data,
            memory: MemoryTracker::default(),
        })
    }

    /// Square matrix from real row-major entries.
    pub fn from_reals(n: usize, data: &[P]) -> SimResult<Self> {
        Self::from_vec(n, n, from_reals(data))
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> SimResult<Self> {
        let mut m = Self::new(n, n)?;
        (0..n).for_each(|i| m[(i, i)] = Complex::one());
        Ok(m)
    }

    /// Move this matrix's byte accounting over to `tracker`.
    pub fn tracked_by(mut self, tracker: MemoryTracker) -> Self {
        let bytes = self.footprint() as i64;
        self.memory.change(-bytes);
        self.memory = tracker;
        self.memory.change(bytes);
        self
    }

    /// The tracker this matrix reports to.
    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    /// Bytes held by the entries.
    pub fn footprint(&self) -> usize {
        self.data.len() * size_of::<Complex<P>>()
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[Complex<P>] {
        &self.data
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex<P> {
        self.data[row * self.cols + col]
    }

    /// Overwrite the entry at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex<P>) {
        self.data[row * self.cols + col] = value;
    }

    /// `WrongMatrixSize` unless this matrix is `rows x cols`.
    pub fn check_dims(&self, rows: usize, cols: usize) -> SimResult<()> {
        if self.rows == rows && self.cols == cols {
            Ok(())
        } else {
            Err(SimError::WrongMatrixSize {
                expected: (rows, cols),
                found: (self.rows, self.cols),
            })
        }
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &Self) -> SimResult<Self> {
        if self.cols != other.rows {
            return Err(SimError::WrongMatrixSize {
                expected: (self.cols, other.cols),
                found: (other.rows, other.cols),
            });
        }
        let mut out = Self::new(self.rows, other.cols)?;
        for i in 0..self.rows {
            for j in 0..other.cols {
                out[(i, j)] = (0..self.cols).fold(Complex::zero(), |acc, k| {
                    acc + self.get(i, k) * other.get(k, j)
                });
            }
        }
        Ok(out)
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                data.push(self.get(row, col).conj());
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
            memory: MemoryTracker::default(),
        }
        .tracked_by(self.memory.clone())
    }
}

impl<P: Precision> Clone for Matrix<P> {
    fn clone(&self) -> Self {
        let copy = Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.clone(),
            memory: self.memory.clone(),
        };
        copy.memory.change(copy.footprint() as i64);
        copy
    }
}

impl<P: Precision> PartialEq for Matrix<P> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data == other.data
    }
}

impl<P: Precision> Drop for Matrix<P> {
    fn drop(&mut self) {
        self.memory.change(-(self.footprint() as i64));
    }
}

impl<P: Precision> Index<(usize, usize)> for Matrix<P> {
    type Output = Complex<P>;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[row * self.cols + col]
    }
}

impl<P: Precision> IndexMut<(usize, usize)> for Matrix<P> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        &mut self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod matrix_tests {
    use super::*;

    #[test]
    fn test_mul_identity() -> SimResult<()> {
        let m = Matrix::from_vec(
            2,
            2,
            from_tuples(&[(1.0, 2.0), (0.0, -1.0), (3.0, 0.0), (0.5, 0.5)]),
        )?;
        let id = Matrix::identity(2)?;
        assert_eq!(m.mul(&id)?, m);
        assert_eq!(id.mul(&m)?, m);
        Ok(())
    }

    #[test]
    fn test_mul_shape_mismatch() -> SimResult<()> {
        let a = Matrix::<f64>::new(2, 3)?;
        let b = Matrix::<f64>::new(2, 3)?;
        assert!(matches!(a.mul(&b), Err(SimError::WrongMatrixSize { .. })));
        Ok(())
    }

    #[test]
    fn test_adjoint() -> SimResult<()> {
        let m = Matrix::from_vec(1, 2, from_tuples(&[(1.0, 2.0), (3.0, -4.0)]))?;
        let a = m.adjoint();
        assert_eq!(a.rows(), 2);
        assert_eq!(a.cols(), 1);
        assert_eq!(a[(0, 0)], Complex::new(1.0, -2.0));
        assert_eq!(a[(1, 0)], Complex::new(3.0, 4.0));
        Ok(())
    }

    #[test]
    fn test_memory_follows_clones() -> SimResult<()> {
        let tracker = MemoryTracker::enabled();
        {
            let m = Matrix::<f64>::identity(4)?.tracked_by(tracker.clone());
            assert_eq!(tracker.current(), 16 * 16);
            let copy = m.clone();
            assert_eq!(tracker.current(), 2 * 16 * 16);
            assert_eq!(copy, m);
            let t = m.adjoint();
            assert!(t.memory().same_as(&tracker));
            assert_eq!(tracker.current(), 3 * 16 * 16);
        }
        assert_eq!(tracker.current(), 0);
        assert_eq!(tracker.peak(), 3 * 16 * 16);
        Ok(())
    }

    #[test]
    fn test_from_vec_checks_length() {
        let r = Matrix::from_vec(2, 2, from_reals(&[1.0, 0.0, 0.0]));
        assert!(matches!(r, Err(SimError::WrongMatrixSize { .. })));
    }
}
