use crate::config::SimConfig;
use crate::decoherence::Decoherence;
use crate::density::DensityOperator;
use crate::errors::{ErrorHook, SimError, SimResult};
use crate::gates::Gate;
use crate::matrix::Matrix;
use crate::memory::MemoryTracker;
use crate::register::Register;
use crate::types::BasisState;
use crate::Precision;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;

/// A simulation session.
///
/// Holds the state shared by every operation: the decoherence model, the random generator used
/// for noise and measurement, the error hook, the memory tracker and a count of decoherence
/// steps. Every gate applied through the session is followed by one decoherence step.
///
/// Errors from session methods pass through [`Simulator::raise`]: with a hook installed the hook
/// sees the error before it is returned, without one the process prints the error and aborts.
///
/// # Example
/// ```
/// use qreg::prelude::*;
///
/// # fn main() -> SimResult<()> {
/// let mut sim = Simulator::new(SimConfig::default().with_seed(1));
/// sim.set_error_hook(|_| {});
/// let mut reg = sim.register::<f64>(2, 0)?;
/// sim.apply(&mut reg, &Gate::Hadamard(0))?;
/// sim.apply(&mut reg, &Gate::Cnot { control: 0, target: 1 })?;
/// let m = sim.sample(&reg).unwrap();
/// assert!(m == 0b00 || m == 0b11);
/// assert_eq!(sim.operation_count(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Simulator {
    decoherence: Decoherence,
    rng: StdRng,
    hook: Option<ErrorHook>,
    memory: MemoryTracker,
    operations: u64,
}

impl Simulator {
    /// Start a session from `config`.
    pub fn new(config: SimConfig) -> Self {
        let rng = if let Some(seed) = config.seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };
        let memory = if config.track_memory {
            MemoryTracker::enabled()
        } else {
            MemoryTracker::disabled()
        };
        log::debug!(
            "new session: decoherence {}, seed {:?}, memory tracking {}",
            config.decoherence,
            config.seed,
            config.track_memory
        );
        Self {
            decoherence: Decoherence::new(config.decoherence),
            rng,
            hook: None,
            memory,
            operations: 0,
        }
    }

    /// Set the decoherence coefficient; zero disables noise.
    pub fn set_decoherence(&mut self, lambda: f64) {
        self.decoherence = Decoherence::new(lambda);
    }

    /// Current decoherence coefficient.
    pub fn decoherence(&self) -> f64 {
        self.decoherence.lambda()
    }

    /// Install `hook`, returning the one it replaces.
    pub fn set_error_hook<F>(&mut self, hook: F) -> Option<ErrorHook>
    where
        F: Fn(&SimError) + Send + Sync + 'static,
    {
        self.hook.replace(Arc::new(hook))
    }

    /// Remove the hook, restoring print-and-abort.
    pub fn clear_error_hook(&mut self) -> Option<ErrorHook> {
        self.hook.take()
    }

    /// The tracker registers from this session report to.
    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    /// Number of decoherence steps so far.
    pub fn operation_count(&self) -> u64 {
        self.operations
    }

    /// Reset the decoherence step count.
    pub fn reset_operation_count(&mut self) {
        self.operations = 0;
    }

    /// The session generator.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// A register of `width` qubits in state `initial`, tracked by this session.
    pub fn register<P: Precision>(
        &mut self,
        width: usize,
        initial: BasisState,
    ) -> SimResult<Register<P>> {
        let reg = self.check(Register::new(width, initial))?;
        Ok(reg.tracked_by(self.memory.clone()))
    }

    /// Apply `gate` and then one decoherence step.
    pub fn apply<P: Precision>(&mut self, reg: &mut Register<P>, gate: &Gate<P>) -> SimResult<()> {
        let result = reg.apply_gate(gate);
        self.check(result)?;
        self.decohere(reg);
        Ok(())
    }

    /// Apply each of `gates` in order.
    pub fn apply_all<P: Precision>(
        &mut self,
        reg: &mut Register<P>,
        gates: &[Gate<P>],
    ) -> SimResult<()> {
        gates.iter().try_for_each(|g| self.apply(reg, g))
    }

    /// Hadamard on each qubit `0..n`, each followed by decoherence.
    pub fn hadamards<P: Precision>(&mut self, reg: &mut Register<P>, n: usize) -> SimResult<()> {
        (0..n).try_for_each(|q| self.apply(reg, &Gate::Hadamard(q)))
    }

    /// One decoherence step. Returns whether noise was applied.
    pub fn decohere<P: Precision>(&mut self, reg: &mut Register<P>) -> bool {
        self.operations += 1;
        self.decoherence.apply(reg, &mut self.rng)
    }

    /// Draw a basis state from `reg`.
    pub fn sample<P: Precision>(&mut self, reg: &Register<P>) -> Option<BasisState> {
        reg.sample(&mut self.rng)
    }

    /// Measure and remove qubit `bit`.
    pub fn measure_bit<P: Precision>(
        &mut self,
        reg: &mut Register<P>,
        bit: usize,
    ) -> SimResult<bool> {
        let result = reg.measure_bit(bit, &mut self.rng);
        self.check(result)
    }

    /// Measure qubit `bit`, keeping it in the register.
    pub fn measure_bit_preserve<P: Precision>(
        &mut self,
        reg: &mut Register<P>,
        bit: usize,
    ) -> SimResult<bool> {
        let result = reg.measure_bit_preserve(bit, &mut self.rng);
        self.check(result)
    }

    /// Trace qubit `bit` out of `rho`.
    pub fn partial_trace<P: Precision>(
        &self,
        rho: &mut DensityOperator<P>,
        bit: usize,
    ) -> SimResult<()> {
        self.check(rho.partial_trace(bit))
    }

    /// Dense density matrix of `rho`.
    pub fn density_matrix<P: Precision>(&self, rho: &DensityOperator<P>) -> SimResult<Matrix<P>> {
        self.check(rho.density_matrix())
    }

    /// Tensor product `a (x) b`.
    pub fn kronecker<P: Precision>(
        &self,
        a: &Register<P>,
        b: &Register<P>,
    ) -> SimResult<Register<P>> {
        self.check(a.kronecker(b))
    }

    /// Superposition sum `a + b` as a new register.
    pub fn vector_add<P: Precision>(
        &self,
        a: &Register<P>,
        b: &Register<P>,
    ) -> SimResult<Register<P>> {
        self.check(a.vector_add(b))
    }

    /// Add `b` into `a`.
    pub fn vector_add_inplace<P: Precision>(
        &self,
        a: &mut Register<P>,
        b: &Register<P>,
    ) -> SimResult<()> {
        self.check(a.vector_add_inplace(b))
    }

    /// Deep copy of `reg`.
    pub fn copy<P: Precision>(&self, reg: &Register<P>) -> SimResult<Register<P>> {
        self.check(reg.copy())
    }

    /// Append `bits` scratch qubits to `reg`.
    pub fn add_scratch<P: Precision>(&self, reg: &mut Register<P>, bits: usize) -> SimResult<()> {
        self.check(reg.add_scratch(bits))
    }

    /// Dense product of a raw buffer with `m`.
    pub fn mat_vec<P: Precision>(
        &self,
        reg: &Register<P>,
        m: &Matrix<P>,
    ) -> SimResult<Register<P>> {
        self.check(reg.mat_vec(m))
    }

    /// Apply an operator given row by row, see [`Register::apply_operator`].
    pub fn apply_operator<P, F>(&self, reg: &Register<P>, rows: F) -> SimResult<Register<P>>
    where
        P: Precision,
        F: Fn(usize) -> SimResult<Register<P>> + Sync,
    {
        self.check(reg.apply_operator(rows))
    }

    /// State vector of `reg` as a single-column matrix.
    pub fn to_matrix<P: Precision>(&self, reg: &Register<P>) -> SimResult<Matrix<P>> {
        self.check(reg.to_matrix())
    }

    /// A register of `width` qubits from a single-column matrix, tracked by this session.
    pub fn register_from_matrix<P: Precision>(
        &self,
        m: &Matrix<P>,
        width: usize,
    ) -> SimResult<Register<P>> {
        let reg = self.check(Register::from_matrix(m, width))?;
        Ok(reg.tracked_by(self.memory.clone()))
    }

    /// Copy of `reg` collapsed onto `bit == value`, with the bit removed.
    pub fn collapse_on_bit<P: Precision>(
        &self,
        reg: &Register<P>,
        bit: usize,
        value: bool,
    ) -> SimResult<Register<P>> {
        self.check(reg.collapse_on_bit(bit, value))
    }

    /// A density operator over `ensemble`.
    pub fn density<P: Precision>(
        &self,
        ensemble: Vec<(P, Register<P>)>,
    ) -> SimResult<DensityOperator<P>> {
        self.check(DensityOperator::from_ensemble(ensemble))
    }

    /// Purity `tr(rho^2)`.
    pub fn purity<P: Precision>(&self, rho: &mut DensityOperator<P>) -> SimResult<P> {
        self.check(rho.purity())
    }

    /// Route an error in `result` through [`Simulator::raise`].
    pub fn check<T>(&self, result: SimResult<T>) -> SimResult<T> {
        result.map_err(|e| self.raise(e))
    }

    /// Report a fatal condition. Calls the hook and hands the error back, or prints it and
    /// aborts when no hook is installed.
    pub fn raise(&self, err: SimError) -> SimError {
        match &self.hook {
            Some(hook) => {
                (**hook)(&err);
                err
            }
            None => {
                log::error!("{}", err);
                eprintln!("ERROR: {}", err);
                std::process::abort()
            }
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("decoherence", &self.decoherence)
            .field("hook", &self.hook.is_some())
            .field("memory", &self.memory)
            .field("operations", &self.operations)
            .finish()
    }
}
