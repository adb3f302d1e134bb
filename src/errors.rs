use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// An error raised by a register, gate, or density operator operation.
///
/// Every variant is fatal for the operation that produced it: nothing is retried and no partial
/// result is kept. A [`crate::simulator::Simulator`] additionally routes these through its error
/// hook before returning them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Storage for amplitudes, states or the hash index could not be allocated.
    OutOfMemory(String),
    /// A dense matrix of dimension `2^width` cannot be built.
    MatrixTooLarge {
        /// Number of qubits the dense matrix would span.
        width: usize,
    },
    /// A matrix did not have the shape an operation requires.
    WrongMatrixSize {
        /// Shape required, as `(rows, cols)`.
        expected: (usize, usize),
        /// Shape supplied, as `(rows, cols)`.
        found: (usize, usize),
    },
    /// A state vector conversion was handed a matrix with more than one column.
    SingleColumnExpected {
        /// Number of columns supplied.
        cols: usize,
    },
    /// Every slot of the hash index is occupied.
    HashTableFull {
        /// Number of slots in the table.
        capacity: usize,
    },
    /// A qubit index was outside the register or repeated where distinct qubits are needed.
    InvalidQubit(String),
    /// A density operator was built from zero branches.
    EmptyEnsemble,
    /// A basis state was supplied twice when building a register.
    DuplicateState(u64),
}

impl SimError {
    /// Construct an `OutOfMemory` error.
    pub fn out_of_memory<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::OutOfMemory(msg.into())
    }

    /// Construct an `InvalidQubit` error.
    pub fn invalid_qubit<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidQubit(msg.into())
    }

    /// Short description of the error kind, without details.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory(_) => "malloc failed",
            Self::MatrixTooLarge { .. } => "matrix too large",
            Self::WrongMatrixSize { .. } => "wrong matrix size",
            Self::SingleColumnExpected { .. } => "single-column matrix expected",
            Self::HashTableFull { .. } => "hash table full",
            Self::InvalidQubit(_) => "invalid qubit",
            Self::EmptyEnsemble => "empty ensemble",
            Self::DuplicateState(_) => "duplicate basis state",
        }
    }
}

/// A result which may contain a simulation error.
pub type SimResult<T> = Result<T, SimError>;

/// Callback invoked on every fatal condition detected by a simulator session.
pub type ErrorHook = Arc<dyn Fn(&SimError) + Send + Sync>;

impl Error for SimError {}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfMemory(msg) => write!(f, "{}: {}", self.kind_str(), msg),
            Self::MatrixTooLarge { width } => {
                write!(f, "{}: 2^{} rows requested", self.kind_str(), width)
            }
            Self::WrongMatrixSize { expected, found } => write!(
                f,
                "{}: expected {}x{}, found {}x{}",
                self.kind_str(),
                expected.0,
                expected.1,
                found.0,
                found.1
            ),
            Self::SingleColumnExpected { cols } => {
                write!(f, "{}: found {} columns", self.kind_str(), cols)
            }
            Self::HashTableFull { capacity } => {
                write!(f, "{} ({} slots)", self.kind_str(), capacity)
            }
            Self::InvalidQubit(msg) => write!(f, "{}: {}", self.kind_str(), msg),
            Self::EmptyEnsemble => write!(f, "{}", self.kind_str()),
            Self::DuplicateState(state) => write!(f, "{}: |{}>", self.kind_str(), state),
        }
    }
}
