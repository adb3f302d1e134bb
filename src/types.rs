use num_traits::{Float, NumAssign};
use std::fmt::{Debug, Display};
use std::iter::{Product, Sum};

/// The float precision of a register.
pub trait Precision:
    Default + NumAssign + Float + Sum + Send + Sync + Display + Product + Debug
{
}

impl Precision for f64 {}

impl Precision for f32 {}

/// A basis state: bit `i` holds the value of qubit `i`.
pub type BasisState = u64;

/// Relative pruning threshold. Amplitudes with `|a|^2 < EPSILON / 2^width` are dropped after a
/// matrix gate.
pub const EPSILON: f64 = 1e-6;

/// Convert an `f64` constant into the register precision.
#[inline]
pub(crate) fn cast<P: Precision>(x: f64) -> P {
    P::from(x).unwrap_or_else(P::nan)
}
