use crate::errors::{SimError, SimResult};
use crate::types::BasisState;

/// Number of bits in a basis state.
pub const STATE_BITS: usize = 64;

/// Get the `bit_index` bit value from `num`.
///
/// # Example
/// ```
/// use qreg::utils::get_bit;
/// assert!(get_bit(2, 1));
/// assert!(!get_bit(2, 0));
/// ```
#[inline]
pub fn get_bit(num: BasisState, bit_index: usize) -> bool {
    ((num >> bit_index) & 1) != 0
}

/// Remove bit `pos` from `num`: bits above it shift down by one, bits below are kept.
///
/// # Example
///
/// ```
/// use qreg::utils::delete_bit;
///
/// assert_eq!(delete_bit(0b1101, 1), 0b111);
/// assert_eq!(delete_bit(0b1101, 0), 0b110);
/// ```
#[inline]
pub fn delete_bit(num: BasisState, pos: usize) -> BasisState {
    let low = num & low_mask(pos);
    let high = if pos + 1 >= STATE_BITS {
        0
    } else {
        (num >> (pos + 1)) << pos
    };
    high | low
}

/// A mask of the lowest `width` bits.
#[inline]
pub fn low_mask(width: usize) -> BasisState {
    if width >= STATE_BITS {
        BasisState::MAX
    } else {
        (1 << width) - 1
    }
}

/// `2^width` as a `usize`, or `MatrixTooLarge` if that does not fit or exceeds `max_width`.
pub(crate) fn dense_dim(width: usize, max_width: usize) -> SimResult<usize> {
    if width > max_width {
        return Err(SimError::MatrixTooLarge { width });
    }
    1usize
        .checked_shl(width as u32)
        .ok_or(SimError::MatrixTooLarge { width })
}
