#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! Sparse quantum register simulation.
//!
//! A [`Register`](register::Register) stores only the basis states with non-negligible
//! amplitude, indexed by an open-addressing hash table over their bit patterns. Gates either
//! permute stored states, rotate their phases, or pass through a dense one or two qubit engine
//! which creates missing partner states and prunes amplitudes that fall below
//! `EPSILON / 2^width`.
//!
//! A [`Simulator`](simulator::Simulator) session follows every gate with a random phase
//! decoherence step, owns the generator used for noise and measurement, and routes errors
//! through an optional hook.
//!
//! # Example (Bell pair)
//! ```
//! use qreg::prelude::*;
//!
//! # fn main() -> SimResult<()> {
//! let mut sim = Simulator::new(SimConfig::default().with_seed(7));
//! sim.set_error_hook(|e| eprintln!("{}", e));
//!
//! let mut reg = sim.register::<f64>(2, 0)?;
//! sim.apply(&mut reg, &Gate::Hadamard(0))?;
//! sim.apply(&mut reg, &Gate::Cnot { control: 0, target: 1 })?;
//!
//! let a = sim.measure_bit(&mut reg, 0)?;
//! let b = sim.measure_bit(&mut reg, 0)?;
//! assert_eq!(a, b);
//! # Ok(())
//! # }
//! ```
//!
//! # Example (mixed state)
//! Tracing one half of a Bell pair out of a density operator leaves a maximally mixed qubit.
//! ```
//! use qreg::prelude::*;
//!
//! # fn main() -> SimResult<()> {
//! let mut reg = Register::<f64>::new(2, 0)?;
//! reg.apply_gate(&Gate::Hadamard(0))?;
//! reg.apply_gate(&Gate::Cnot { control: 0, target: 1 })?;
//!
//! let mut rho = DensityOperator::from_register(reg)?;
//! rho.partial_trace(1)?;
//! assert!((rho.purity()? - 0.5).abs() < 1e-10);
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod rayon_helper;

pub use num_complex::Complex;
pub use rand;
pub use types::*;

/// Session settings.
pub mod config;
/// Random phase noise.
pub mod decoherence;
/// Ensembles of registers and partial traces.
pub mod density;
/// Dense one and two qubit unitaries.
pub mod engine;
/// Error types.
pub mod errors;
/// Gates and standard matrices.
pub mod gates;
/// Small dense complex matrices.
pub mod matrix;
/// Sampling, collapse and measurement.
pub mod measurement;
/// Byte accounting for registers.
pub mod memory;
/// The sparse register.
pub mod register;
/// The simulation session.
pub mod simulator;
/// Precision and basis state types.
pub mod types;
/// Bit manipulation helpers.
pub mod utils;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::decoherence::Decoherence;
    pub use crate::density::DensityOperator;
    pub use crate::errors::{ErrorHook, SimError, SimResult};
    pub use crate::gates::{Controls, Gate};
    pub use crate::matrix::Matrix;
    pub use crate::memory::MemoryTracker;
    pub use crate::register::Register;
    pub use crate::simulator::Simulator;
    pub use crate::types::{BasisState, Precision};
    pub use crate::Complex;
}
