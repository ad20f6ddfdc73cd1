//! Error types for operations.

use thiserror::Error;
use vecviz_core::SocketType;

use crate::operation::OperationKind;

/// A recoverable, user-facing failure of a calculation.
///
/// These are shown as a warning on the offending node. Every other error in
/// this crate indicates a bug in a graph or an operation table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CalculationError {
    /// Message shown to the user.
    pub message: String,
}

impl CalculationError {
    /// Create a new calculation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Division by a zero scalar.
    pub fn division_by_zero() -> Self {
        Self::new("Division by zero")
    }

    /// Inversion of a singular matrix.
    pub fn singular_matrix() -> Self {
        Self::new("Determinant is 0; matrix cannot be inverted")
    }
}

/// Errors raised by operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Domain failure, shown to the user.
    #[error(transparent)]
    Calculation(#[from] CalculationError),

    /// The operation does not accept this combination of inputs.
    #[error("{operation} cannot be applied to inputs {types:?}")]
    InvalidInput {
        /// Operation being applied.
        operation: OperationKind,
        /// Kinds of the provided inputs.
        types: Vec<SocketType>,
    },

    /// A type table has no entry for a concrete combination.
    #[error("{operation} has no type table entry for {types:?}")]
    MissingTypeEntry {
        /// Operation whose table is incomplete.
        operation: OperationKind,
        /// The combination that was looked up.
        types: Vec<SocketType>,
    },

    /// No operation with this name exists.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The operation is not in the registry.
    #[error("operation not registered: {0}")]
    NotRegistered(OperationKind),
}

impl OpError {
    /// Returns the user-facing error, if this is one.
    pub fn as_calculation(&self) -> Option<&CalculationError> {
        match self {
            OpError::Calculation(e) => Some(e),
            _ => None,
        }
    }
}
