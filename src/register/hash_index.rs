use crate::errors::{SimError, SimResult};
use crate::types::BasisState;
use std::mem::size_of;

/// Largest supported hash width; slots are addressed by the top bits of a 32 bit hash.
pub const MAX_HASH_WIDTH: u32 = 32;

/// Multiplicative hash of a 64 bit basis state down to `width` bits.
///
/// The key is folded to 32 bits by xor-ing its halves, multiplied by a fixed odd constant and
/// the top `width` bits are kept.
///
/// # Example
/// ```
/// use qreg::register::hash_index::hash64;
/// assert_eq!(hash64(0, 4), 0);
/// assert!(hash64(12345, 4) < 16);
/// ```
#[inline]
pub fn hash64(key: BasisState, width: u32) -> usize {
    if width == 0 {
        return 0;
    }
    let folded = ((key & 0xFFFF_FFFF) ^ (key >> 32)) as u32;
    let mixed = folded.wrapping_mul(0x9e37_0001);
    (mixed >> (32 - width)) as usize
}

/// Open-addressing index from basis state to position in a register's parallel arrays.
///
/// Slots hold `position + 1`, with `0` marking an empty slot. The index stores no keys: every
/// probe compares against the `states` slice it was built from, so it must be rebuilt whenever
/// that slice is reordered or rewritten.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashIndex {
    width: u32,
    slots: Vec<u32>,
}

impl HashIndex {
    /// Allocate an empty index with `2^width` slots.
    pub fn new(width: u32) -> SimResult<Self> {
        if width > MAX_HASH_WIDTH {
            return Err(SimError::out_of_memory(format!(
                "hash table of width {} exceeds {}",
                width, MAX_HASH_WIDTH
            )));
        }
        let capacity = 1usize << width;
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            SimError::out_of_memory(format!("hash table of {} slots: {}", capacity, e))
        })?;
        slots.resize(capacity, 0);
        Ok(Self { width, slots })
    }

    /// Hash width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| **s != 0).count()
    }

    /// Bytes held by the slot array.
    pub fn footprint(&self) -> usize {
        self.slots.len() * size_of::<u32>()
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0);
    }

    /// Find the position of `key` in `states`, probing linearly from its hash.
    pub fn lookup(&self, states: &[BasisState], key: BasisState) -> Option<usize> {
        let capacity = self.slots.len();
        if capacity == 0 {
            return None;
        }
        let mut i = hash64(key, self.width);
        for _ in 0..capacity {
            match self.slots[i] {
                0 => return None,
                slot => {
                    let pos = (slot - 1) as usize;
                    if states.get(pos) == Some(&key) {
                        return Some(pos);
                    }
                }
            }
            i += 1;
            if i == capacity {
                i = 0;
            }
        }
        None
    }

    /// Record that `key` lives at `pos`, in the first empty slot of its probe sequence.
    pub fn insert(&mut self, key: BasisState, pos: usize) -> SimResult<()> {
        let capacity = self.slots.len();
        let full = SimError::HashTableFull { capacity };
        if capacity == 0 || pos >= u32::MAX as usize {
            return Err(full);
        }
        let mut i = hash64(key, self.width);
        let mut wrapped = false;
        while self.slots[i] != 0 {
            i += 1;
            if i == capacity {
                if wrapped {
                    return Err(full);
                }
                i = 0;
                wrapped = true;
            }
        }
        self.slots[i] = (pos + 1) as u32;
        Ok(())
    }

    /// Clear and reinsert every entry of `states`.
    pub fn rebuild(&mut self, states: &[BasisState]) -> SimResult<()> {
        self.clear();
        states
            .iter()
            .enumerate()
            .try_for_each(|(pos, state)| self.insert(*state, pos))
    }

    /// A fresh index of the same width built from `states`, leaving `self` untouched.
    pub fn rebuilt(&self, states: &[BasisState]) -> SimResult<Self> {
        let mut index = Self::new(self.width)?;
        index.rebuild(states)?;
        Ok(index)
    }
}

#[cfg(test)]
mod hash_index_tests {
    use super::*;

    #[test]
    fn test_hash_in_range() {
        for width in 1..=12 {
            for key in [0u64, 1, 2, 3, 0xdead_beef, u64::MAX, 1 << 40] {
                assert!(hash64(key, width) < (1 << width));
            }
        }
        assert_eq!(hash64(u64::MAX, 0), 0);
    }

    #[test]
    fn test_hash_folds_halves() {
        // Keys whose halves xor to the same value collide by construction.
        assert_eq!(hash64(0x0000_0001_0000_0000, 8), hash64(0x1, 8));
    }

    #[test]
    fn test_insert_and_lookup() -> SimResult<()> {
        let states = vec![5, 9, 1 << 33, 0];
        let mut index = HashIndex::new(4)?;
        index.rebuild(&states)?;
        for (pos, state) in states.iter().enumerate() {
            assert_eq!(index.lookup(&states, *state), Some(pos));
        }
        assert_eq!(index.lookup(&states, 7), None);
        assert_eq!(index.occupied(), 4);
        Ok(())
    }

    #[test]
    fn test_full_table() -> SimResult<()> {
        let states: Vec<u64> = (0..4).collect();
        let mut index = HashIndex::new(2)?;
        index.rebuild(&states)?;
        assert_eq!(index.lookup(&states, 99), None);
        assert_eq!(
            index.insert(4, 4),
            Err(SimError::HashTableFull { capacity: 4 })
        );
        Ok(())
    }

    #[test]
    fn test_rebuilt_is_independent() -> SimResult<()> {
        let states = vec![3, 4];
        let mut index = HashIndex::new(3)?;
        index.rebuild(&states)?;
        let reordered = vec![4, 3];
        let fresh = index.rebuilt(&reordered)?;
        assert_eq!(fresh.lookup(&reordered, 3), Some(1));
        assert_eq!(index.lookup(&states, 3), Some(0));
        Ok(())
    }

    #[test]
    fn test_too_wide() {
        assert!(matches!(
            HashIndex::new(MAX_HASH_WIDTH + 1),
            Err(SimError::OutOfMemory(_))
        ));
    }
}
