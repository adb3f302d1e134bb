use super::{hash_width_for, HashIndex, Register};
use crate::rayon_helper::*;
use crate::errors::{SimError, SimResult};
use crate::matrix::{zeroed, Matrix};
use crate::types::BasisState;
use crate::utils::{dense_dim, STATE_BITS};
use crate::{Complex, Precision};
use num_traits::Zero;

/// Widest register that may be expanded into a dense vector or matrix.
pub const MAX_DENSE_WIDTH: usize = 30;

impl<P: Precision> Register<P> {
    /// Tensor product `self (x) other`. States of `self` occupy the high bits.
    pub fn kronecker(&self, other: &Self) -> SimResult<Self> {
        let width = self.width + other.width;
        let hash_width = hash_width_for(width)?;
        let size = self.len().checked_mul(other.len()).ok_or_else(|| {
            SimError::out_of_memory(format!("{} x {} entries", self.len(), other.len()))
        })?;
        let mut states = Vec::new();
        states
            .try_reserve_exact(size)
            .map_err(|e| SimError::out_of_memory(e.to_string()))?;
        let mut amplitudes = Vec::new();
        amplitudes
            .try_reserve_exact(size)
            .map_err(|e| SimError::out_of_memory(e.to_string()))?;
        for (s1, a1) in self.iter() {
            for (s2, a2) in other.iter() {
                states.push((s1 << other.width) | s2);
                amplitudes.push(a1 * a2);
            }
        }
        let index = HashIndex::new(hash_width)?;
        let mut reg = Self::assemble(
            width,
            hash_width,
            states,
            amplitudes,
            Some(index),
            self.memory.clone(),
        );
        reg.rebuild_index()?;
        Ok(reg)
    }

    /// Superposition sum `self + other` as a new register.
    pub fn vector_add(&self, other: &Self) -> SimResult<Self> {
        let mut sum = self.copy()?;
        sum.vector_add_inplace(other)?;
        Ok(sum)
    }

    /// Add `other` into `self`. Shared states add amplitudes, the rest are appended.
    pub fn vector_add_inplace(&mut self, other: &Self) -> SimResult<()> {
        self.rebuild_index()?;
        let missing = other
            .states
            .iter()
            .filter(|s| self.lookup(**s).is_none())
            .count();
        self.reserve(missing)?;
        for (state, amp) in other.iter() {
            match self.lookup(state) {
                Some(j) => self.amplitudes[j] += amp,
                None => {
                    self.states.push(state);
                    self.amplitudes.push(amp);
                }
            }
        }
        self.sync_memory();
        Ok(())
    }

    /// Inner product `<self|other>`. Rebuilds the index of `other`.
    pub fn dot_product(&self, other: &mut Self) -> SimResult<Complex<P>> {
        other.rebuild_index()?;
        Ok(self
            .iter()
            .filter_map(|(s, a)| other.lookup(s).map(|j| a.conj() * other.amplitudes[j]))
            .fold(Complex::zero(), |acc, x| acc + x))
    }

    /// Bilinear product `sum a_i b_i` without conjugation. Rebuilds the index of `other`.
    pub fn dot_product_noconj(&self, other: &mut Self) -> SimResult<Complex<P>> {
        other.rebuild_index()?;
        Ok(self
            .iter()
            .filter_map(|(s, a)| other.lookup(s).map(|j| a * other.amplitudes[j]))
            .fold(Complex::zero(), |acc, x| acc + x))
    }

    /// Append `bits` scratch qubits below the existing ones; every state shifts left.
    pub fn add_scratch(&mut self, bits: usize) -> SimResult<()> {
        let width = self.width + bits;
        if width > STATE_BITS {
            return Err(SimError::invalid_qubit(format!(
                "{} qubits do not fit in a basis state",
                width
            )));
        }
        if self.hash_width > 0 {
            let hash_width = hash_width_for(width)?;
            self.resize_index(hash_width)?;
        }
        self.width = width;
        self.states.iter_mut().for_each(|s| *s <<= bits);
        self.rebuild_index()
    }

    /// Dense product `M x` of a raw buffer, `y[i] = sum_j M[i][j] x[j]`.
    pub fn mat_vec(&self, m: &Matrix<P>) -> SimResult<Self> {
        m.check_dims(self.len(), self.len())?;
        let mut out = Self::allocate_raw(self.width, self.len())?;
        for i in 0..m.rows() {
            out.amplitudes[i] = self
                .amplitudes
                .iter()
                .enumerate()
                .fold(Complex::zero(), |acc, (j, x)| acc + m.get(i, j) * x);
        }
        Ok(out.tracked_by(self.memory.clone()))
    }

    /// Apply an operator given row by row: `y[i] = sum_s A_i(s) x(s)` for every position `i`.
    ///
    /// `rows(i)` yields row `i` of the operator as a register over the same basis states as
    /// `self`. The result is a raw buffer of `len()` amplitudes addressed by position.
    pub fn apply_operator<F>(&self, rows: F) -> SimResult<Self>
    where
        F: Fn(usize) -> SimResult<Self> + Sync,
    {
        let mut out = Self::allocate_raw(self.width, self.len())?;
        iter_mut!(out.amplitudes)
            .enumerate()
            .try_for_each(|(i, y)| -> SimResult<()> {
                let mut row = rows(i)?;
                *y = self.dot_product_noconj(&mut row)?;
                Ok(())
            })?;
        Ok(out.tracked_by(self.memory.clone()))
    }

    /// The full `2^width` state vector as a single-column matrix.
    pub fn to_matrix(&self) -> SimResult<Matrix<P>> {
        let dim = dense_dim(self.width, MAX_DENSE_WIDTH)?;
        let mut m = Matrix::new(dim, 1)?.tracked_by(self.memory.clone());
        for (state, amp) in self.iter() {
            if let Some(row) = usize::try_from(state).ok().filter(|r| *r < dim) {
                m.set(row, 0, amp);
            }
        }
        Ok(m)
    }

    /// A hashed register from a single-column state vector; zero entries are skipped.
    pub fn from_matrix(m: &Matrix<P>, width: usize) -> SimResult<Self> {
        if m.cols() != 1 {
            return Err(SimError::SingleColumnExpected { cols: m.cols() });
        }
        let nonzero = m.as_slice().iter().filter(|a| !a.is_zero()).count();
        let mut states = zeroed(nonzero, 0)?;
        let mut amplitudes = zeroed(nonzero, Complex::zero())?;
        m.as_slice()
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_zero())
            .zip(states.iter_mut().zip(amplitudes.iter_mut()))
            .for_each(|((row, a), (s, amp))| {
                *s = row as BasisState;
                *amp = *a;
            });
        Self::from_parts(width, states, amplitudes)
    }
}
