use crate::errors::{SimError, SimResult};
use crate::matrix::Matrix;
use crate::memory::MemoryTracker;
use crate::register::{HashIndex, Register, MAX_DENSE_WIDTH};
use crate::types::BasisState;
use crate::utils::dense_dim;
use crate::{Complex, Precision};
use num_traits::Zero;

/// A mixed state: branch registers weighted by probabilities.
///
/// Every branch is linked to one hash index owned by the operator. Overlaps between branches
/// rebuild that index in place, so branches never carry an index of their own while they are
/// part of an ensemble.
#[derive(Debug)]
pub struct DensityOperator<P: Precision> {
    probabilities: Vec<P>,
    branches: Vec<Register<P>>,
    index: HashIndex,
    memory: MemoryTracker,
}

impl<P: Precision> DensityOperator<P> {
    /// Take ownership of `ensemble`. The index of the first branch becomes the shared index.
    pub fn from_ensemble(ensemble: Vec<(P, Register<P>)>) -> SimResult<Self> {
        let mut ensemble = ensemble.into_iter();
        let (p0, mut first) = ensemble.next().ok_or(SimError::EmptyEnsemble)?;
        let index = match first.detach_index() {
            Some(index) => index,
            None => HashIndex::new(first.hash_width)?,
        };
        let memory = first.memory().clone();
        memory.change(index.footprint() as i64);

        let mut probabilities = vec![p0];
        let mut branches = vec![first];
        for (p, mut reg) in ensemble {
            reg.detach_index();
            reg.hash_width = index.width();
            probabilities.push(p);
            branches.push(reg);
        }
        log::debug!(
            "density operator of {} branches, shared hash width {}",
            branches.len(),
            index.width()
        );
        Ok(Self {
            probabilities,
            branches,
            index,
            memory,
        })
    }

    /// A pure state with probability one.
    pub fn from_register(reg: Register<P>) -> SimResult<Self> {
        Self::from_ensemble(vec![(P::one(), reg)])
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Always false; an operator holds at least one branch.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Branch probabilities, parallel to [`DensityOperator::branches`].
    pub fn probabilities(&self) -> &[P] {
        &self.probabilities
    }

    /// Branch registers.
    pub fn branches(&self) -> &[Register<P>] {
        &self.branches
    }

    /// Width of the first branch.
    pub fn width(&self) -> usize {
        self.branches.first().map(Register::width).unwrap_or(0)
    }

    /// Trace out `bit`, splitting each branch into its two collapsed halves.
    ///
    /// Branch `i` becomes branch `i` (bit clear) and branch `len + i` (bit set), weighted by
    /// `p p0` and `p (1 - p0)`.
    pub fn partial_trace(&mut self, bit: usize) -> SimResult<()> {
        let n = self.len();
        let mut probabilities = Vec::with_capacity(2 * n);
        let mut zeros = Vec::with_capacity(n);
        let mut ones = Vec::with_capacity(n);
        for (p, reg) in self.probabilities.iter().zip(self.branches.iter()) {
            let p0 = reg.bit_probability(bit, false)?;
            zeros.push((*p * p0, reg.collapse_on_bit(bit, false)?));
            ones.push((*p * (P::one() - p0), reg.collapse_on_bit(bit, true)?));
        }
        let mut branches = Vec::with_capacity(2 * n);
        for (p, reg) in zeros.into_iter().chain(ones) {
            probabilities.push(p);
            branches.push(reg);
        }
        self.probabilities = probabilities;
        self.branches = branches;
        log::trace!("traced out qubit {}, {} branches", bit, self.len());
        Ok(())
    }

    /// The dense density matrix `rho[j][i] = sum_k p_k psi_k(j) conj(psi_k(i))`.
    pub fn density_matrix(&self) -> SimResult<Matrix<P>> {
        let dim = dense_dim(self.width(), MAX_DENSE_WIDTH)?;
        let mut rho = Matrix::new(dim, dim)?.tracked_by(self.memory.clone());
        let row = |s: BasisState| usize::try_from(s).ok().filter(|r| *r < dim);
        for (p, reg) in self.probabilities.iter().zip(self.branches.iter()) {
            for (sj, aj) in reg.iter() {
                let j = match row(sj) {
                    Some(j) => j,
                    None => continue,
                };
                for (si, ai) in reg.iter() {
                    if let Some(i) = row(si) {
                        rho[(j, i)] += aj * ai.conj() * *p;
                    }
                }
            }
        }
        Ok(rho)
    }

    /// `tr(rho^2) = sum p_i^2 + 2 sum_{i>j} p_i p_j |<psi_i|psi_j>|^2`.
    pub fn purity(&mut self) -> SimResult<P> {
        let mut total: P = self.probabilities.iter().map(|p| *p * *p).sum();
        for j in 0..self.len() {
            self.index.rebuild(&self.branches[j].states)?;
            for i in (j + 1)..self.len() {
                let overlap = self.overlap(i, j);
                let two = P::one() + P::one();
                total += two * self.probabilities[i] * self.probabilities[j] * overlap.norm_sqr();
            }
        }
        Ok(total)
    }

    /// `<psi_i|psi_j>` through the shared index, which must hold branch `j`.
    fn overlap(&self, i: usize, j: usize) -> Complex<P> {
        let target = &self.branches[j];
        self.branches[i]
            .iter()
            .filter_map(|(s, a)| {
                self.find(&target.states, s)
                    .map(|k| a.conj() * target.amplitudes[k])
            })
            .fold(Complex::zero(), |acc, x| acc + x)
    }

    fn find(&self, states: &[BasisState], key: BasisState) -> Option<usize> {
        if self.index.width() == 0 {
            usize::try_from(key).ok().filter(|pos| *pos < states.len())
        } else {
            self.index.lookup(states, key)
        }
    }

    /// Dissolve the operator. The shared index goes back to the first branch.
    pub fn into_branches(mut self) -> SimResult<Vec<(P, Register<P>)>> {
        let index = std::mem::take(&mut self.index);
        self.memory.change(-(index.footprint() as i64));
        let probabilities = std::mem::take(&mut self.probabilities);
        let mut branches = std::mem::take(&mut self.branches);
        if let Some(first) = branches.first_mut() {
            first.attach_index(index);
            first.rebuild_index()?;
        }
        Ok(probabilities.into_iter().zip(branches).collect())
    }
}

impl<P: Precision> Drop for DensityOperator<P> {
    fn drop(&mut self) {
        self.memory.change(-(self.index.footprint() as i64));
    }
}

#[cfg(test)]
mod density_tests {
    use super::*;
    use crate::gates::Gate;

    fn bell() -> SimResult<Register<f64>> {
        let mut reg = Register::new(2, 0)?;
        reg.apply_gate(&Gate::Hadamard(0))?;
        reg.apply_gate(&Gate::Cnot {
            control: 0,
            target: 1,
        })?;
        Ok(reg)
    }

    #[test]
    fn test_pure_state_purity() -> SimResult<()> {
        let mut rho = DensityOperator::from_register(bell()?)?;
        assert_eq!(rho.len(), 1);
        assert!((rho.purity()? - 1.0).abs() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_bell_partial_trace_is_mixed() -> SimResult<()> {
        let mut rho = DensityOperator::from_register(bell()?)?;
        rho.partial_trace(1)?;
        assert_eq!(rho.len(), 2);
        assert_eq!(rho.width(), 1);
        assert!((rho.probabilities()[0] - 0.5).abs() < 1e-10);
        assert!((rho.probabilities()[1] - 0.5).abs() < 1e-10);
        assert_eq!(rho.branches()[0].states(), &[0]);
        assert_eq!(rho.branches()[1].states(), &[1]);
        assert!((rho.purity()? - 0.5).abs() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_product_state_stays_pure() -> SimResult<()> {
        // |+> on qubit 0, |0> on qubit 1: tracing out qubit 1 leaves a pure |+>.
        let mut reg = Register::<f64>::new(2, 0)?;
        reg.apply_gate(&Gate::Hadamard(0))?;
        let mut rho = DensityOperator::from_register(reg)?;
        rho.partial_trace(1)?;
        assert!((rho.purity()? - 1.0).abs() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_density_matrix_of_plus() -> SimResult<()> {
        let mut reg = Register::<f64>::new(1, 0)?;
        reg.apply_gate(&Gate::Hadamard(0))?;
        let rho = DensityOperator::from_register(reg)?;
        let m = rho.density_matrix()?;
        for i in 0..2 {
            for j in 0..2 {
                assert!((m[(i, j)] - Complex::new(0.5, 0.0)).norm() < 1e-10);
            }
        }
        Ok(())
    }

    #[test]
    fn test_density_matrix_after_trace_is_diagonal() -> SimResult<()> {
        let mut rho = DensityOperator::from_register(bell()?)?;
        rho.partial_trace(0)?;
        let m = rho.density_matrix()?;
        assert!((m[(0, 0)].re - 0.5).abs() < 1e-10);
        assert!((m[(1, 1)].re - 0.5).abs() < 1e-10);
        assert!(m[(0, 1)].norm() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_shared_index_is_unique() -> SimResult<()> {
        let a = Register::<f64>::new(2, 1)?;
        let b = Register::<f64>::new(2, 2)?;
        let rho = DensityOperator::from_ensemble(vec![(0.25, a), (0.75, b)])?;
        assert!(rho.branches().iter().all(|r| !r.has_index()));
        assert!(rho.branches().iter().all(|r| r.hash_width() == 4));
        let mut branches = rho.into_branches()?;
        assert!(branches[0].1.has_index());
        assert_eq!(branches[0].1.lookup(1), Some(0));
        assert!(!branches[1].1.has_index());
        branches[1].1.rebuild_index()?;
        assert_eq!(branches[1].1.lookup(2), Some(0));
        Ok(())
    }

    #[test]
    fn test_empty_ensemble() {
        assert_eq!(
            DensityOperator::<f64>::from_ensemble(vec![]).err(),
            Some(SimError::EmptyEnsemble)
        );
    }

    #[test]
    fn test_memory_released() -> SimResult<()> {
        let tracker = MemoryTracker::enabled();
        {
            let reg = bell()?.tracked_by(tracker.clone());
            let mut rho = DensityOperator::from_register(reg)?;
            rho.partial_trace(0)?;
            assert!(tracker.current() > 0);
        }
        assert_eq!(tracker.current(), 0);
        Ok(())
    }
}
