use crate::errors::{SimError, SimResult};
use crate::matrix::{from_tuples, Matrix};
use crate::rayon_helper::*;
use crate::register::{Register, MAX_DENSE_WIDTH};
use crate::types::{cast, BasisState};
use crate::utils::{dense_dim, low_mask};
use crate::{Complex, Precision};
use smallvec::SmallVec;
use std::f64::consts::PI;

/// Ordered control qubits of a multi-controlled NOT.
pub type Controls = SmallVec<[usize; 4]>;

/// A gate which can be applied to a [`Register`].
///
/// Permutation gates rewrite stored states and phase gates rewrite stored amplitudes, neither
/// changes the number of stored states. `Hadamard`, `Rx`, `Ry` and the `Unitary` variants go
/// through the dense engine and may grow or prune the register.
#[derive(Clone, Debug, PartialEq)]
pub enum Gate<P: Precision> {
    /// Pauli X.
    X(usize),
    /// Pauli Y.
    Y(usize),
    /// Pauli Z.
    Z(usize),
    /// Hadamard.
    Hadamard(usize),
    /// Flip `target` when `control` is set.
    Cnot {
        /// Control qubit.
        control: usize,
        /// Flipped qubit.
        target: usize,
    },
    /// Flip `target` when both controls are set.
    Toffoli {
        /// First control qubit.
        control1: usize,
        /// Second control qubit.
        control2: usize,
        /// Flipped qubit.
        target: usize,
    },
    /// Flip `target` when every qubit in `controls` is set.
    MultiCnot {
        /// Control qubits.
        controls: Controls,
        /// Flipped qubit.
        target: usize,
    },
    /// Exchange the `width` qubits starting at `a` with the `width` qubits starting at `b`.
    Swap {
        /// Lowest qubit of the first block.
        a: usize,
        /// Lowest qubit of the second block.
        b: usize,
        /// Qubits per block.
        width: usize,
    },
    /// `Swap` conditioned on `control`.
    ControlledSwap {
        /// Control qubit.
        control: usize,
        /// Lowest qubit of the first block.
        a: usize,
        /// Lowest qubit of the second block.
        b: usize,
        /// Qubits per block.
        width: usize,
    },
    /// Rotation about X by `angle`.
    Rx {
        /// Rotated qubit.
        target: usize,
        /// Rotation angle.
        angle: P,
    },
    /// Rotation about Y by `angle`.
    Ry {
        /// Rotated qubit.
        target: usize,
        /// Rotation angle.
        angle: P,
    },
    /// Rotation about Z: `e^{i angle/2}` on set, `e^{-i angle/2}` on clear.
    Rz {
        /// Rotated qubit.
        target: usize,
        /// Rotation angle.
        angle: P,
    },
    /// Multiply every amplitude by `e^{i angle}`.
    GlobalPhase(P),
    /// Multiply amplitudes with `target` set by `e^{i angle}`.
    PhaseKick {
        /// Phased qubit.
        target: usize,
        /// Phase angle.
        angle: P,
    },
    /// Conditional phase `e^{i pi / 2^|control - target|}` when both qubits are set, as used by
    /// the quantum Fourier transform.
    ControlledPhase {
        /// Control qubit.
        control: usize,
        /// Phased qubit.
        target: usize,
    },
    /// Inverse of `ControlledPhase`.
    ControlledPhaseInv {
        /// Control qubit.
        control: usize,
        /// Phased qubit.
        target: usize,
    },
    /// Multiply amplitudes with both qubits set by `e^{i angle}`.
    ControlledPhaseKick {
        /// Control qubit.
        control: usize,
        /// Phased qubit.
        target: usize,
        /// Phase angle.
        angle: P,
    },
    /// `Rz(angle)` on `target` conditioned on `control`.
    ControlledPhaseShift {
        /// Control qubit.
        control: usize,
        /// Phased qubit.
        target: usize,
        /// Rotation angle.
        angle: P,
    },
    /// Arbitrary 2x2 unitary.
    Unitary1 {
        /// Target qubit.
        target: usize,
        /// Row-major 2x2 operator.
        matrix: Matrix<P>,
    },
    /// Arbitrary 4x4 unitary; `target1` is the low bit of the matrix index.
    Unitary2 {
        /// Qubit for bit 0 of the matrix index.
        target1: usize,
        /// Qubit for bit 1 of the matrix index.
        target2: usize,
        /// Row-major 4x4 operator.
        matrix: Matrix<P>,
    },
}

impl<P: Precision> Gate<P> {
    /// A multi-controlled NOT over `controls`, in order.
    pub fn multi_cnot(controls: &[usize], target: usize) -> Self {
        Gate::MultiCnot {
            controls: controls.iter().cloned().collect(),
            target,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Gate::X(_) => "X",
            Gate::Y(_) => "Y",
            Gate::Z(_) => "Z",
            Gate::Hadamard(_) => "H",
            Gate::Cnot { .. } => "CNOT",
            Gate::Toffoli { .. } => "Toffoli",
            Gate::MultiCnot { .. } => "MultiCNOT",
            Gate::Swap { .. } => "SWAP",
            Gate::ControlledSwap { .. } => "CSWAP",
            Gate::Rx { .. } => "Rx",
            Gate::Ry { .. } => "Ry",
            Gate::Rz { .. } => "Rz",
            Gate::GlobalPhase(_) => "GlobalPhase",
            Gate::PhaseKick { .. } => "PhaseKick",
            Gate::ControlledPhase { .. } => "CPhase",
            Gate::ControlledPhaseInv { .. } => "CPhaseInv",
            Gate::ControlledPhaseKick { .. } => "CPhaseKick",
            Gate::ControlledPhaseShift { .. } => "CPhaseShift",
            Gate::Unitary1 { .. } => "U1",
            Gate::Unitary2 { .. } => "U2",
        }
    }
}

/// The Hadamard matrix.
pub fn hadamard_matrix<P: Precision>() -> SimResult<Matrix<P>> {
    let h = cast::<P>(0.5).sqrt();
    Matrix::from_reals(2, &[h, h, h, -h])
}

/// Rotation about X: `[[cos g/2, -i sin g/2], [-i sin g/2, cos g/2]]`.
pub fn rx_matrix<P: Precision>(angle: P) -> SimResult<Matrix<P>> {
    let half = angle / cast::<P>(2.0);
    let (c, s) = (half.cos(), half.sin());
    let zero = P::zero();
    Matrix::from_vec(2, 2, from_tuples(&[(c, zero), (zero, -s), (zero, -s), (c, zero)]))
}

/// Rotation about Y: `[[cos g/2, -sin g/2], [sin g/2, cos g/2]]`.
pub fn ry_matrix<P: Precision>(angle: P) -> SimResult<Matrix<P>> {
    let half = angle / cast::<P>(2.0);
    let (c, s) = (half.cos(), half.sin());
    Matrix::from_reals(2, &[c, -s, s, c])
}

/// Angle of the controlled phase between `control` and `target`.
fn controlled_phase_angle<P: Precision>(control: usize, target: usize) -> P {
    let gap = if control > target {
        control - target
    } else {
        target - control
    };
    cast(PI / 2f64.powi(gap as i32))
}

fn phase<P: Precision>(angle: P) -> Complex<P> {
    Complex::from_polar(P::one(), angle)
}

impl<P: Precision> Register<P> {
    /// Apply `gate` without decoherence.
    pub fn apply_gate(&mut self, gate: &Gate<P>) -> SimResult<()> {
        match gate {
            Gate::X(target) => {
                let t = self.qubit_mask(*target)?;
                self.flip_where(0, t);
            }
            Gate::Y(target) => {
                let t = self.qubit_mask(*target)?;
                let i = Complex::i();
                iter_mut!(self.states)
                    .zip(iter_mut!(self.amplitudes))
                    .for_each(|(s, a)| {
                        *s ^= t;
                        if *s & t != 0 {
                            *a = *a * i;
                        } else {
                            *a = -*a * i;
                        }
                    });
            }
            Gate::Z(target) => {
                let t = self.qubit_mask(*target)?;
                let minus = -Complex::<P>::new(P::one(), P::zero());
                self.phase_by(|s| if s & t != 0 { Some(minus) } else { None });
            }
            Gate::Hadamard(target) => self.apply_one_qubit(*target, &hadamard_matrix()?)?,
            Gate::Cnot { control, target } => {
                let c = self.control_mask(&[*control], *target)?;
                let t = self.qubit_mask(*target)?;
                self.flip_where(c, t);
            }
            Gate::Toffoli {
                control1,
                control2,
                target,
            } => {
                let c = self.control_mask(&[*control1, *control2], *target)?;
                let t = self.qubit_mask(*target)?;
                self.flip_where(c, t);
            }
            Gate::MultiCnot { controls, target } => {
                let c = self.control_mask(controls, *target)?;
                let t = self.qubit_mask(*target)?;
                self.flip_where(c, t);
            }
            Gate::Swap { a, b, width } => {
                let (ma, mb) = self.block_masks(*a, *b, *width)?;
                let (a, b, lo) = (*a, *b, low_mask(*width));
                iter_mut!(self.states).for_each(|s| *s = swap_blocks(*s, ma, mb, a, b, lo));
            }
            Gate::ControlledSwap {
                control,
                a,
                b,
                width,
            } => {
                let (ma, mb) = self.block_masks(*a, *b, *width)?;
                let c = self.qubit_mask(*control)?;
                if c & (ma | mb) != 0 {
                    return Err(SimError::invalid_qubit(format!(
                        "control {} lies inside a swapped block",
                        control
                    )));
                }
                let (a, b, lo) = (*a, *b, low_mask(*width));
                iter_mut!(self.states)
                    .filter(|s| **s & c != 0)
                    .for_each(|s| *s = swap_blocks(*s, ma, mb, a, b, lo));
            }
            Gate::Rx { target, angle } => self.apply_one_qubit(*target, &rx_matrix(*angle)?)?,
            Gate::Ry { target, angle } => self.apply_one_qubit(*target, &ry_matrix(*angle)?)?,
            Gate::Rz { target, angle } => {
                let t = self.qubit_mask(*target)?;
                let z = phase(*angle / cast::<P>(2.0));
                let zinv = z.conj();
                self.phase_by(|s| Some(if s & t != 0 { z } else { zinv }));
            }
            Gate::GlobalPhase(angle) => {
                let z = phase(*angle);
                self.phase_by(|_| Some(z));
            }
            Gate::PhaseKick { target, angle } => {
                let t = self.qubit_mask(*target)?;
                let z = phase(*angle);
                self.phase_by(|s| if s & t != 0 { Some(z) } else { None });
            }
            Gate::ControlledPhase { control, target } => {
                let z = phase(controlled_phase_angle(*control, *target));
                self.controlled_phase(*control, *target, z)?;
            }
            Gate::ControlledPhaseInv { control, target } => {
                let z = phase(-controlled_phase_angle::<P>(*control, *target));
                self.controlled_phase(*control, *target, z)?;
            }
            Gate::ControlledPhaseKick {
                control,
                target,
                angle,
            } => self.controlled_phase(*control, *target, phase(*angle))?,
            Gate::ControlledPhaseShift {
                control,
                target,
                angle,
            } => {
                let c = self.qubit_mask(*control)?;
                let t = self.qubit_mask(*target)?;
                let z = phase(*angle / cast::<P>(2.0));
                let zinv = z.conj();
                self.phase_by(|s| match (s & c != 0, s & t != 0) {
                    (true, true) => Some(z),
                    (true, false) => Some(zinv),
                    _ => None,
                });
            }
            Gate::Unitary1 { target, matrix } => self.apply_one_qubit(*target, matrix)?,
            Gate::Unitary2 {
                target1,
                target2,
                matrix,
            } => self.apply_two_qubit(*target1, *target2, matrix)?,
        }
        Ok(())
    }

    /// Apply a Hadamard to each of the qubits `0..n`.
    pub fn apply_hadamards(&mut self, n: usize) -> SimResult<()> {
        let h = hadamard_matrix()?;
        (0..n).try_for_each(|q| self.apply_one_qubit(q, &h))
    }

    /// Flip `target` in every state that has all of `controls` set.
    fn flip_where(&mut self, controls: BasisState, target: BasisState) {
        iter_mut!(self.states).for_each(|s| {
            if *s & controls == controls {
                *s ^= target
            }
        });
    }

    /// Multiply each amplitude by `f(state)` where it returns a factor.
    fn phase_by<F>(&mut self, f: F)
    where
        F: Fn(BasisState) -> Option<Complex<P>> + Sync + Send,
    {
        iter_mut!(self.amplitudes)
            .zip(iter!(self.states))
            .for_each(|(a, s)| {
                if let Some(z) = f(*s) {
                    *a *= z;
                }
            });
    }

    fn controlled_phase(&mut self, control: usize, target: usize, z: Complex<P>) -> SimResult<()> {
        let both = self.qubit_mask(control)? | self.qubit_mask(target)?;
        self.phase_by(|s| if s & both == both { Some(z) } else { None });
        Ok(())
    }

    fn control_mask(&self, controls: &[usize], target: usize) -> SimResult<BasisState> {
        if controls.contains(&target) {
            return Err(SimError::invalid_qubit(format!(
                "target {} is also a control",
                target
            )));
        }
        controls
            .iter()
            .try_fold(0, |acc, c| Ok(acc | self.qubit_mask(*c)?))
    }

    fn block_masks(
        &self,
        a: usize,
        b: usize,
        width: usize,
    ) -> SimResult<(BasisState, BasisState)> {
        let fits = |start: usize| start.checked_add(width).filter(|end| *end <= self.width);
        match (fits(a), fits(b)) {
            (Some(_), Some(_)) if width == 0 => Ok((0, 0)),
            (Some(end_a), Some(end_b)) if end_a <= b || end_b <= a => {
                let lo = low_mask(width);
                Ok((lo << a, lo << b))
            }
            _ => Err(SimError::invalid_qubit(format!(
                "cannot swap blocks of {} at {} and {} in a register of width {}",
                width, a, b, self.width
            ))),
        }
    }
}

fn swap_blocks(
    s: BasisState,
    ma: BasisState,
    mb: BasisState,
    a: usize,
    b: usize,
    lo: BasisState,
) -> BasisState {
    if lo == 0 {
        return s;
    }
    let pa = (s >> a) & lo;
    let pb = (s >> b) & lo;
    (s & !(ma | mb)) | (pa << b) | (pb << a)
}

/// Dense matrix of a register operation, found by applying `op` to every basis state of
/// `width` qubits. Column `j` holds the image of `|j>`.
///
/// # Example
/// ```
/// use qreg::prelude::*;
/// use qreg::gates::{hadamard_matrix, operator_matrix};
///
/// # fn main() -> SimResult<()> {
/// let m = operator_matrix::<f64, _>(1, |r| r.apply_gate(&Gate::Hadamard(0)))?;
/// let h = hadamard_matrix::<f64>()?;
/// assert!((m.get(1, 1) - h.get(1, 1)).norm() < 1e-12);
/// # Ok(())
/// # }
/// ```
pub fn operator_matrix<P, F>(width: usize, mut op: F) -> SimResult<Matrix<P>>
where
    P: Precision,
    F: FnMut(&mut Register<P>) -> SimResult<()>,
{
    let dim = dense_dim(width, MAX_DENSE_WIDTH / 2)?;
    let mut m = Matrix::new(dim, dim)?;
    for col in 0..dim {
        let mut reg = Register::new(width, col as BasisState)?;
        op(&mut reg)?;
        for (state, amp) in reg.iter() {
            if let Some(row) = usize::try_from(state).ok().filter(|r| *r < dim) {
                m.set(row, col, amp);
            }
        }
    }
    Ok(m)
}
