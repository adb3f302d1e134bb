use crate::errors::SimResult;
use crate::register::Register;
use crate::types::{cast, BasisState};
use crate::utils::delete_bit;
use crate::Precision;
use rand::Rng;

impl<P: Precision> Register<P> {
    /// Draw a basis state with probability `|a|^2`, walking storage order.
    ///
    /// If rounding leaves the draw unexhausted the last stored state is returned. `None` only
    /// for an empty register.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<BasisState> {
        let mut r: P = cast(rng.gen::<f64>());
        for (state, amp) in self.iter() {
            r -= amp.norm_sqr();
            if r <= P::zero() {
                return Some(state);
            }
        }
        self.states.last().cloned()
    }

    /// Total probability of the states whose `bit` equals `value`.
    pub fn bit_probability(&self, bit: usize, value: bool) -> SimResult<P> {
        let mask = self.qubit_mask(bit)?;
        Ok(self
            .iter()
            .filter(|(s, _)| (s & mask != 0) == value)
            .map(|(_, a)| a.norm_sqr())
            .sum())
    }

    /// Project onto `bit == value` and remove that qubit.
    ///
    /// Higher bits shift down by one and the kept amplitudes are divided by the square root of
    /// their total probability. The result has `width - 1` qubits and the same hash width, but
    /// no index of its own.
    pub fn collapse_on_bit(&self, bit: usize, value: bool) -> SimResult<Self> {
        let d = self.bit_probability(bit, value)?;
        let mask = self.qubit_mask(bit)?;
        let size = self
            .states
            .iter()
            .filter(|s| (**s & mask != 0) == value)
            .count();
        let mut out = Self::allocate_with_states(self.width - 1, size)?;
        let norm = if d > P::zero() { d.sqrt() } else { P::one() };
        self.iter()
            .filter(|(s, _)| (s & mask != 0) == value)
            .zip(out.states.iter_mut().zip(out.amplitudes.iter_mut()))
            .for_each(|((s, a), (os, oa))| {
                *os = delete_bit(s, bit);
                *oa = a / norm;
            });
        out.hash_width = self.hash_width;
        Ok(out.tracked_by(self.memory().clone()))
    }

    /// Measure `bit`, collapse onto the outcome and remove the qubit. The outcome is `true` when
    /// a uniform draw exceeds the probability of the bit being clear.
    pub fn measure_bit<R: Rng + ?Sized>(&mut self, bit: usize, rng: &mut R) -> SimResult<bool> {
        let outcome = self.draw_bit(bit, rng)?;
        let mut collapsed = self.collapse_on_bit(bit, outcome)?;
        self.width = collapsed.width;
        self.states = std::mem::take(&mut collapsed.states);
        self.amplitudes = std::mem::take(&mut collapsed.amplitudes);
        drop(collapsed);
        self.sync_memory();
        self.rebuild_index()?;
        log::trace!("measured qubit {} as {}", bit, outcome as u8);
        Ok(outcome)
    }

    /// Measure `bit` and drop the states which disagree with the outcome, keeping the qubit.
    pub fn measure_bit_preserve<R: Rng + ?Sized>(
        &mut self,
        bit: usize,
        rng: &mut R,
    ) -> SimResult<bool> {
        let outcome = self.draw_bit(bit, rng)?;
        let mask = self.qubit_mask(bit)?;
        let d = self.bit_probability(bit, outcome)?;
        let norm = if d > P::zero() { d.sqrt() } else { P::one() };
        let size = self.len();
        let mut kept = 0;
        for i in 0..size {
            if (self.states[i] & mask != 0) == outcome {
                self.states[kept] = self.states[i];
                self.amplitudes[kept] = self.amplitudes[i] / norm;
                kept += 1;
            }
        }
        self.states.truncate(kept);
        self.amplitudes.truncate(kept);
        self.sync_memory();
        self.rebuild_index()?;
        Ok(outcome)
    }

    fn draw_bit<R: Rng + ?Sized>(&self, bit: usize, rng: &mut R) -> SimResult<bool> {
        let p0 = self.bit_probability(bit, false)?;
        let r: P = cast(rng.gen::<f64>());
        Ok(r > p0)
    }
}
