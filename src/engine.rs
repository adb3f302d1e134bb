//! Application of dense one and two qubit unitaries to a sparse register.
//!
//! Both entry points may grow the register with partner states that were absent, then drop
//! every amplitude below the pruning threshold. Neither applies decoherence; that is left to
//! the session.
use crate::errors::{SimError, SimResult};
use crate::matrix::{zeroed, Matrix};
use crate::register::Register;
use crate::types::{cast, BasisState, EPSILON};
use crate::{Complex, Precision};
use num_traits::Zero;

impl<P: Precision> Register<P> {
    /// Probability below which an amplitude is pruned: `EPSILON / 2^width`.
    pub fn prune_threshold(&self) -> P {
        cast::<P>(EPSILON) / cast::<P>(2.0).powi(self.width as i32)
    }

    /// Apply a 2x2 unitary `m` to qubit `target`.
    ///
    /// For each pair of states differing only at `target`,
    /// `new[clear] = m00 old[clear] + m01 old[set]` and
    /// `new[set] = m10 old[clear] + m11 old[set]`. An absent partner is created unless the
    /// off-diagonal entry feeding it is exactly zero.
    pub fn apply_one_qubit(&mut self, target: usize, m: &Matrix<P>) -> SimResult<()> {
        m.check_dims(2, 2)?;
        let bit = self.qubit_mask(target)?;
        let (m00, m01, m10, m11) = (m.get(0, 0), m.get(0, 1), m.get(1, 0), m.get(1, 1));
        let hashed = self.hash_width > 0;

        let missing = if hashed {
            self.rebuild_index()?;
            self.states
                .iter()
                .filter(|s| self.lookup(**s ^ bit).is_none())
                .count()
        } else {
            0
        };
        self.reserve(missing)?;

        let size = self.len();
        let mut done = zeroed(size, false)?;
        for i in 0..size {
            if done[i] {
                continue;
            }
            let state = self.states[i];
            let set = state & bit != 0;
            let partner = self.lookup(state ^ bit);
            let t = self.amplitudes[i];
            let other = partner.map_or_else(Complex::zero, |j| self.amplitudes[j]);

            self.amplitudes[i] = if set {
                m10 * other + m11 * t
            } else {
                m00 * t + m01 * other
            };

            match partner {
                Some(j) => {
                    self.amplitudes[j] = if set {
                        m00 * other + m01 * t
                    } else {
                        m10 * t + m11 * other
                    };
                    done[j] = true;
                }
                None if hashed => {
                    let feed = if set { m01 } else { m10 };
                    if !feed.is_zero() {
                        self.states.push(state ^ bit);
                        self.amplitudes.push(feed * t);
                    }
                }
                // Raw buffers cannot grow by position.
                None => {}
            }
        }
        self.finish_unitary()
    }

    /// Apply a 4x4 unitary `m` to qubits `target1` and `target2`.
    ///
    /// Within each group of four states agreeing outside the targets, member `k` has `target1`
    /// set iff bit 0 of `k` is set and `target2` set iff bit 1 is set, and
    /// `new[j] = sum_k m[j][k] old[k]`.
    pub fn apply_two_qubit(
        &mut self,
        target1: usize,
        target2: usize,
        m: &Matrix<P>,
    ) -> SimResult<()> {
        m.check_dims(4, 4)?;
        let b1 = self.qubit_mask(target1)?;
        let b2 = self.qubit_mask(target2)?;
        if b1 == b2 {
            return Err(SimError::invalid_qubit(format!(
                "two qubit gate needs distinct targets, got {} twice",
                target1
            )));
        }
        let hashed = self.hash_width > 0;
        self.rebuild_index()?;

        let size = self.len();
        let mut done = zeroed(size, false)?;
        let mut fresh: Vec<(BasisState, Complex<P>)> = Vec::new();
        for i in 0..size {
            if done[i] {
                continue;
            }
            let base = self.states[i] & !(b1 | b2);
            let members = [base, base | b1, base | b2, base | b1 | b2];
            let slots = members.map(|s| self.lookup(s));
            let old = slots.map(|slot| slot.map_or_else(Complex::zero, |j| self.amplitudes[j]));

            for (k, slot) in slots.iter().enumerate() {
                let new = old
                    .iter()
                    .enumerate()
                    .fold(Complex::zero(), |acc, (l, a)| acc + m.get(k, l) * a);
                match slot {
                    Some(j) => {
                        self.amplitudes[*j] = new;
                        done[*j] = true;
                    }
                    None if hashed && !new.is_zero() => fresh.push((members[k], new)),
                    None => {}
                }
            }
        }

        self.reserve(fresh.len())?;
        for (state, amp) in fresh {
            self.states.push(state);
            self.amplitudes.push(amp);
        }
        self.finish_unitary()
    }

    fn finish_unitary(&mut self) -> SimResult<()> {
        self.sync_memory();
        if self.hash_width > 0 {
            let removed = self.prune(self.prune_threshold());
            if removed > 0 {
                log::trace!("pruned {} amplitudes, {} remain", removed, self.len());
            }
        }
        self.warn_capacity();
        Ok(())
    }

    /// Drop every amplitude with `|a|^2 < limit`, compacting storage in order. Returns the
    /// number removed. The hash index is stale afterwards.
    pub fn prune(&mut self, limit: P) -> usize {
        let size = self.len();
        let mut kept = 0;
        for i in 0..size {
            if self.amplitudes[i].norm_sqr() >= limit {
                self.states[kept] = self.states[i];
                self.amplitudes[kept] = self.amplitudes[i];
                kept += 1;
            }
        }
        self.states.truncate(kept);
        self.amplitudes.truncate(kept);
        self.sync_memory();
        size - kept
    }

    /// Warn when the register holds more than half as many states as the index has slots.
    pub fn warn_capacity(&self) -> bool {
        if self.hash_width == 0 {
            return false;
        }
        let half = 1usize << (self.hash_width - 1);
        let crowded = self.len() > half;
        if crowded {
            log::warn!(
                "inefficient hash table: {} states for {} slots",
                self.len(),
                half << 1
            );
        }
        crowded
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::gates::hadamard_matrix;
    use crate::matrix::from_reals;

    fn cnot_matrix() -> SimResult<Matrix<f64>> {
        // Control on target1 (sub-index bit 0), flip target2.
        Matrix::from_reals(
            4,
            &[
                1.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, 0.0,
            ],
        )
    }

    fn assert_close(a: Complex<f64>, b: Complex<f64>) {
        assert!((a - b).norm() < 1e-10, "{} != {}", a, b);
    }

    #[test]
    fn test_hadamard_creates_partner() -> SimResult<()> {
        let mut reg = Register::<f64>::new(1, 0)?;
        reg.apply_one_qubit(0, &hadamard_matrix()?)?;
        assert_eq!(reg.states(), &[0, 1]);
        let h = 0.5f64.sqrt();
        assert_close(reg.amplitudes()[0], Complex::new(h, 0.0));
        assert_close(reg.amplitudes()[1], Complex::new(h, 0.0));
        Ok(())
    }

    #[test]
    fn test_hadamard_on_set_bit() -> SimResult<()> {
        let mut reg = Register::<f64>::new(1, 1)?;
        reg.apply_one_qubit(0, &hadamard_matrix()?)?;
        let h = 0.5f64.sqrt();
        assert_close(reg.amplitude_of(0).unwrap(), Complex::new(h, 0.0));
        assert_close(reg.amplitude_of(1).unwrap(), Complex::new(-h, 0.0));
        Ok(())
    }

    #[test]
    fn test_hadamard_involution() -> SimResult<()> {
        let mut reg = Register::<f64>::new(3, 0b101)?;
        let h = hadamard_matrix()?;
        reg.apply_one_qubit(1, &h)?;
        assert_eq!(reg.len(), 2);
        reg.apply_one_qubit(1, &h)?;
        assert_eq!(reg.states(), &[0b101]);
        assert_close(reg.amplitudes()[0], Complex::new(1.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_diagonal_never_grows() -> SimResult<()> {
        let z = Matrix::from_reals(2, &[1.0, 0.0, 0.0, -1.0])?;
        let mut reg = Register::<f64>::new(2, 0b10)?;
        reg.apply_one_qubit(0, &z)?;
        reg.apply_one_qubit(1, &z)?;
        assert_eq!(reg.states(), &[0b10]);
        assert_close(reg.amplitudes()[0], Complex::new(-1.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_two_qubit_bell_pair() -> SimResult<()> {
        let mut reg = Register::<f64>::new(2, 0)?;
        reg.apply_one_qubit(0, &hadamard_matrix()?)?;
        reg.apply_two_qubit(0, 1, &cnot_matrix()?)?;
        let mut states = reg.states().to_vec();
        states.sort_unstable();
        assert_eq!(states, vec![0b00, 0b11]);
        let h = 0.5f64.sqrt();
        assert_close(reg.amplitude_of(0b11).unwrap(), Complex::new(h, 0.0));
        assert!((reg.probability() - 1.0).abs() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_two_qubit_target_order() -> SimResult<()> {
        // Control on qubit 1 now, so |01> is unaffected and |10> becomes |11>.
        let mut reg = Register::<f64>::new(2, 0b01)?;
        reg.apply_two_qubit(1, 0, &cnot_matrix()?)?;
        assert_eq!(reg.states(), &[0b01]);
        let mut reg = Register::<f64>::new(2, 0b10)?;
        reg.apply_two_qubit(1, 0, &cnot_matrix()?)?;
        assert_eq!(reg.states(), &[0b11]);
        Ok(())
    }

    #[test]
    fn test_wrong_sizes() -> SimResult<()> {
        let mut reg = Register::<f64>::new(2, 0)?;
        assert_eq!(
            reg.apply_one_qubit(0, &Matrix::identity(4)?),
            Err(SimError::WrongMatrixSize {
                expected: (2, 2),
                found: (4, 4)
            })
        );
        assert!(matches!(
            reg.apply_two_qubit(0, 1, &Matrix::identity(2)?),
            Err(SimError::WrongMatrixSize { .. })
        ));
        assert!(matches!(
            reg.apply_two_qubit(1, 1, &Matrix::identity(4)?),
            Err(SimError::InvalidQubit(_))
        ));
        assert!(matches!(
            reg.apply_one_qubit(2, &Matrix::identity(2)?),
            Err(SimError::InvalidQubit(_))
        ));
        Ok(())
    }

    #[test]
    fn test_prune() -> SimResult<()> {
        let amps = from_reals(&[1.0, 1e-5, 0.5]);
        let mut reg = Register::<f64>::from_parts(2, vec![0, 1, 2], amps)?;
        assert_eq!(reg.prune(1e-6), 1);
        assert_eq!(reg.states(), &[0, 2]);
        Ok(())
    }

    #[test]
    fn test_warn_capacity() -> SimResult<()> {
        let mut reg = Register::<f64>::new(1, 0)?;
        assert!(!reg.warn_capacity());
        reg.states = (0..5).collect();
        reg.amplitudes = vec![Complex::zero(); 5];
        assert!(reg.warn_capacity());
        Ok(())
    }
}
