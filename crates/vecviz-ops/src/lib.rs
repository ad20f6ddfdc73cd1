//! Math operations for VecViz operation nodes.
//!
//! Each operation declares the sockets its inputs accept, how the two inputs
//! of a binary operation constrain each other, which output kinds each input
//! combination produces, and a pure `calculate` function:
//!
//! - [`Operation`] - the capability interface
//! - [`OperationKind`] - the closed set of built-in operations
//! - [`OperationRegistry`] - kind to implementation lookup
//! - [`CalculationError`] - recoverable, user-facing failures
//!
//! ```
//! use vecviz_core::Value;
//! use vecviz_ops::{OperationKind, OperationRegistry};
//!
//! let registry = OperationRegistry::builtin();
//! let add = registry.get(OperationKind::Add).unwrap();
//! let sum = add.calculate(&[Value::Scalar(2.0), Value::Scalar(3.0)]).unwrap();
//! assert_eq!(sum.payload(), vec![5.0]);
//! ```

mod binary;
mod error;
mod operation;
mod registry;
mod unary;

pub use binary::{Add, Angle, Cross, Divide, Dot, Exponent, Multiply, Projection, Subtract};
pub use error::{CalculationError, OpError};
pub use operation::{
    Arity, CompatibilityMap, Operation, OperationKind, OutputMap, BINARY_INPUTS, RESULT_PORT,
    UNARY_INPUTS,
};
pub use registry::OperationRegistry;
pub use unary::{Determinant, Invert, Length, Normalize, Transpose};
