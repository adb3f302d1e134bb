/// Open-addressing index over basis states.
pub mod hash_index;

mod algebra;

pub use algebra::MAX_DENSE_WIDTH;
pub use hash_index::HashIndex;

use crate::errors::{SimError, SimResult};
use crate::matrix::zeroed;
use crate::memory::MemoryTracker;
use crate::types::BasisState;
use crate::utils::{get_bit, low_mask, STATE_BITS};
use crate::{Complex, Precision};
use hash_index::MAX_HASH_WIDTH;
use num_traits::{One, Zero};
use std::fmt;
use std::mem::size_of;

/// A sparse quantum register.
///
/// Only basis states with non-negligible amplitude are stored, as two parallel arrays of states
/// and amplitudes. No state appears twice. When `hash_width > 0` a [`HashIndex`] maps states to
/// positions; it is only guaranteed consistent right after [`Register::rebuild_index`].
///
/// A register with `hash_width == 0` is a raw amplitude buffer: lookups address it by position.
///
/// # Example
/// ```
/// use qreg::prelude::*;
///
/// # fn main() -> SimResult<()> {
/// let mut reg = Register::<f64>::new(2, 0b01)?;
/// reg.apply_gate(&Gate::Hadamard(1))?;
/// assert_eq!(reg.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Register<P: Precision> {
    pub(crate) width: usize,
    pub(crate) hash_width: u32,
    pub(crate) states: Vec<BasisState>,
    pub(crate) amplitudes: Vec<Complex<P>>,
    pub(crate) index: Option<HashIndex>,
    memory: MemoryTracker,
    accounted: usize,
}

fn hash_width_for(width: usize) -> SimResult<u32> {
    u32::try_from(width + 2)
        .ok()
        .filter(|w| *w <= MAX_HASH_WIDTH)
        .ok_or_else(|| {
            SimError::out_of_memory(format!("no hash table for a register of {} qubits", width))
        })
}

impl<P: Precision> Register<P> {
    pub(crate) fn assemble(
        width: usize,
        hash_width: u32,
        states: Vec<BasisState>,
        amplitudes: Vec<Complex<P>>,
        index: Option<HashIndex>,
        memory: MemoryTracker,
    ) -> Self {
        let mut reg = Self {
            width,
            hash_width,
            states,
            amplitudes,
            index,
            memory,
            accounted: 0,
        };
        reg.sync_memory();
        reg
    }

    /// A register of `width` qubits in basis state `initial` with amplitude 1.
    pub fn new(width: usize, initial: BasisState) -> SimResult<Self> {
        if width < STATE_BITS && initial & !low_mask(width) != 0 {
            return Err(SimError::invalid_qubit(format!(
                "initial state {} does not fit in {} qubits",
                initial, width
            )));
        }
        let hash_width = hash_width_for(width)?;
        let index = HashIndex::new(hash_width)?;
        let mut reg = Self::assemble(
            width,
            hash_width,
            vec![initial],
            vec![Complex::one()],
            Some(index),
            MemoryTracker::default(),
        );
        reg.rebuild_index()?;
        Ok(reg)
    }

    /// A raw buffer of `size` zero amplitudes addressed by position. Slot `i` holds state `i`.
    pub fn allocate_raw(width: usize, size: usize) -> SimResult<Self> {
        let mut states = zeroed(size, 0)?;
        states
            .iter_mut()
            .enumerate()
            .for_each(|(i, s)| *s = i as BasisState);
        let amplitudes = zeroed(size, Complex::zero())?;
        Ok(Self::assemble(
            width,
            0,
            states,
            amplitudes,
            None,
            MemoryTracker::default(),
        ))
    }

    /// A buffer of `size` zero states and amplitudes without a hash index, to be filled by the
    /// caller.
    pub fn allocate_with_states(width: usize, size: usize) -> SimResult<Self> {
        let states = zeroed(size, 0)?;
        let amplitudes = zeroed(size, Complex::zero())?;
        Ok(Self::assemble(
            width,
            0,
            states,
            amplitudes,
            None,
            MemoryTracker::default(),
        ))
    }

    /// A hashed register from explicit `(state, amplitude)` columns.
    ///
    /// A state listed twice gives `DuplicateState`.
    pub fn from_parts(
        width: usize,
        states: Vec<BasisState>,
        amplitudes: Vec<Complex<P>>,
    ) -> SimResult<Self> {
        if states.len() != amplitudes.len() {
            return Err(SimError::WrongMatrixSize {
                expected: (states.len(), 1),
                found: (amplitudes.len(), 1),
            });
        }
        let hash_width = hash_width_for(width)?;
        let index = HashIndex::new(hash_width)?;
        let mut reg = Self::assemble(
            width,
            hash_width,
            states,
            amplitudes,
            Some(index),
            MemoryTracker::default(),
        );
        reg.rebuild_index()?;
        if let Some((_, state)) = reg
            .states
            .iter()
            .enumerate()
            .find(|(i, s)| reg.lookup(**s) != Some(*i))
        {
            return Err(SimError::DuplicateState(*state));
        }
        Ok(reg)
    }

    /// Move this register's byte accounting over to `tracker`.
    pub fn tracked_by(mut self, tracker: MemoryTracker) -> Self {
        self.memory.change(-(self.accounted as i64));
        self.memory = tracker;
        self.memory.change(self.accounted as i64);
        self
    }

    /// The tracker this register reports to.
    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    /// Number of qubits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of the hash index in bits, `0` for raw buffers.
    pub fn hash_width(&self) -> u32 {
        self.hash_width
    }

    /// Number of stored basis states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no basis state is stored.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Stored basis states, parallel to [`Register::amplitudes`].
    pub fn states(&self) -> &[BasisState] {
        &self.states
    }

    /// Stored amplitudes, parallel to [`Register::states`].
    pub fn amplitudes(&self) -> &[Complex<P>] {
        &self.amplitudes
    }

    /// Whether this register currently owns a hash index.
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Iterate over `(state, amplitude)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (BasisState, Complex<P>)> + '_ {
        self.states
            .iter()
            .cloned()
            .zip(self.amplitudes.iter().cloned())
    }

    /// Amplitude of `state`, found by scanning, or `None` if it isn't stored.
    pub fn amplitude_of(&self, state: BasisState) -> Option<Complex<P>> {
        self.states
            .iter()
            .position(|s| *s == state)
            .map(|i| self.amplitudes[i])
    }

    /// Total probability `sum |a|^2`.
    pub fn probability(&self) -> P {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Position of `state`, via the hash index or, for raw buffers, the state itself.
    ///
    /// The index reflects the states as of the last rebuild; gates that rewrite states do not
    /// maintain it.
    pub fn lookup(&self, state: BasisState) -> Option<usize> {
        if self.hash_width == 0 {
            return usize::try_from(state).ok().filter(|pos| *pos < self.len());
        }
        self.index.as_ref()?.lookup(&self.states, state)
    }

    /// Record `state` at position `pos` in the hash index.
    pub fn insert(&mut self, state: BasisState, pos: usize) -> SimResult<()> {
        if self.hash_width == 0 {
            return Ok(());
        }
        self.ensure_index()?;
        match self.index.as_mut() {
            Some(index) => index.insert(state, pos),
            None => Ok(()),
        }
    }

    /// Clear the hash index and reinsert every stored state.
    pub fn rebuild_index(&mut self) -> SimResult<()> {
        if self.hash_width == 0 {
            return Ok(());
        }
        self.ensure_index()?;
        if let Some(index) = self.index.as_mut() {
            index.rebuild(&self.states)?;
        }
        Ok(())
    }

    fn ensure_index(&mut self) -> SimResult<()> {
        if self.index.is_none() && self.hash_width > 0 {
            self.index = Some(HashIndex::new(self.hash_width)?);
            self.sync_memory();
        }
        Ok(())
    }

    /// Give up the hash index, leaving the register linked to whoever holds it.
    pub(crate) fn detach_index(&mut self) -> Option<HashIndex> {
        let index = self.index.take();
        self.sync_memory();
        index
    }

    pub(crate) fn attach_index(&mut self, index: HashIndex) {
        self.hash_width = index.width();
        self.index = Some(index);
        self.sync_memory();
    }

    /// Replace the index with an empty one of `hash_width` bits.
    pub(crate) fn resize_index(&mut self, hash_width: u32) -> SimResult<()> {
        self.index = Some(HashIndex::new(hash_width)?);
        self.hash_width = hash_width;
        self.sync_memory();
        Ok(())
    }

    /// A deep copy of states and amplitudes. The copy gets its own empty index of the same width,
    /// which must be rebuilt before lookups.
    pub fn copy(&self) -> SimResult<Self> {
        let index = if self.hash_width > 0 {
            Some(HashIndex::new(self.hash_width)?)
        } else {
            None
        };
        let mut states = Vec::new();
        states
            .try_reserve_exact(self.len())
            .map_err(|e| SimError::out_of_memory(e.to_string()))?;
        states.extend_from_slice(&self.states);
        let mut amplitudes = Vec::new();
        amplitudes
            .try_reserve_exact(self.len())
            .map_err(|e| SimError::out_of_memory(e.to_string()))?;
        amplitudes.extend_from_slice(&self.amplitudes);
        Ok(Self::assemble(
            self.width,
            self.hash_width,
            states,
            amplitudes,
            index,
            self.memory.clone(),
        ))
    }

    /// Multiply every amplitude by `z`.
    pub fn scale(&mut self, z: Complex<P>) {
        self.amplitudes.iter_mut().for_each(|a| *a *= z);
    }

    /// Rescale so that the total probability is one. A zero vector is left alone.
    pub fn normalize(&mut self) {
        let r = self.probability();
        if r > P::zero() {
            let mult = P::one() / r.sqrt();
            self.amplitudes.iter_mut().for_each(|a| *a = *a * mult);
        }
    }

    /// Mask for `qubit`, or `InvalidQubit` if it is outside the register.
    pub(crate) fn qubit_mask(&self, qubit: usize) -> SimResult<BasisState> {
        if qubit < self.width && qubit < STATE_BITS {
            Ok(1 << qubit)
        } else {
            Err(SimError::invalid_qubit(format!(
                "qubit {} outside register of width {}",
                qubit, self.width
            )))
        }
    }

    /// Grow both arrays by `additional` entries up front.
    pub(crate) fn reserve(&mut self, additional: usize) -> SimResult<()> {
        self.states
            .try_reserve(additional)
            .map_err(|e| SimError::out_of_memory(e.to_string()))?;
        self.amplitudes
            .try_reserve(additional)
            .map_err(|e| SimError::out_of_memory(e.to_string()))
    }

    pub(crate) fn footprint(&self) -> usize {
        let per_entry = size_of::<BasisState>() + size_of::<Complex<P>>();
        self.len() * per_entry + self.index.as_ref().map(HashIndex::footprint).unwrap_or(0)
    }

    /// Bring the memory tracker in line with the current footprint.
    pub(crate) fn sync_memory(&mut self) {
        let bytes = self.footprint();
        if bytes != self.accounted {
            self.memory.change(bytes as i64 - self.accounted as i64);
            self.accounted = bytes;
        }
    }
}

impl<P: Precision> Drop for Register<P> {
    fn drop(&mut self) {
        self.memory.change(-(self.accounted as i64));
    }
}

impl<P: Precision> fmt::Display for Register<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (state, amp) in self.iter() {
            write!(
                f,
                "{:+.6} {:+.6}i|{}> ({:.6}) (|",
                amp.re,
                amp.im,
                state,
                amp.norm_sqr()
            )?;
            for j in (0..self.width.min(STATE_BITS)).rev() {
                if j % 4 == 3 {
                    write!(f, " ")?;
                }
                write!(f, "{}", get_bit(state, j) as u8)?;
            }
            writeln!(f, ">)")?;
        }
        Ok(())
    }
}
