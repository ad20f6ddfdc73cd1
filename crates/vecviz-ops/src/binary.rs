//! Operations taking `lhs` and `rhs`.

use glam::{DMat4, DVec3};
use vecviz_core::{CompoundSocket, SocketSet, SocketType, Value};

use crate::error::{CalculationError, OpError};
use crate::operation::{check_inputs, CompatibilityMap, Operation, OperationKind, OutputMap};
use crate::unary::invert_matrix;

const S: SocketType = SocketType::Scalar;
const V: SocketType = SocketType::Vector;
const M: SocketType = SocketType::Matrix;
const X: SocketType = SocketType::Invalid;

const ANY: SocketSet = SocketSet::of(&[S, V, M]);
const ONLY_S: SocketSet = SocketSet::of(&[S]);
const ONLY_V: SocketSet = SocketSet::of(&[V]);
const ONLY_M: SocketSet = SocketSet::of(&[M]);
const INVALID: SocketSet = SocketSet::of(&[X]);

const ANYTHING_PAIR: &[CompoundSocket] = &[CompoundSocket::Anything, CompoundSocket::Anything];
const VECTOR_PAIR: &[CompoundSocket] = &[CompoundSocket::Vector, CompoundSocket::Vector];

/// Both sides carry the same kind.
const SAME_KIND: CompatibilityMap =
    CompatibilityMap::new(&[(S, ONLY_S), (V, ONLY_V), (M, ONLY_M)]);

const SAME_KIND_OUTPUT: OutputMap = OutputMap::Binary(&[
    ((S, S), ONLY_S),
    ((S, V), INVALID),
    ((S, M), INVALID),
    ((V, S), INVALID),
    ((V, V), ONLY_V),
    ((V, M), INVALID),
    ((M, S), INVALID),
    ((M, V), INVALID),
    ((M, M), ONLY_M),
]);

const MULTIPLY_LHS_TO_RHS: CompatibilityMap = CompatibilityMap::new(&[
    (S, ANY),
    (V, ONLY_S),
    (M, ANY),
]);

const MULTIPLY_RHS_TO_LHS: CompatibilityMap = CompatibilityMap::new(&[
    (S, ANY),
    (V, SocketSet::of(&[S, M])),
    (M, SocketSet::of(&[S, M])),
]);

const MULTIPLY_OUTPUT: OutputMap = OutputMap::Binary(&[
    ((S, S), ONLY_S),
    ((S, V), ONLY_V),
    ((S, M), ONLY_M),
    ((V, S), ONLY_V),
    ((V, V), INVALID),
    ((V, M), INVALID),
    ((M, S), ONLY_M),
    ((M, V), ONLY_V),
    ((M, M), ONLY_M),
]);

const DIVIDE_OUTPUT: OutputMap =
    OutputMap::Binary(&[((S, S), ONLY_S), ((V, S), ONLY_V), ((M, S), ONLY_M)]);

const EXPONENT_OUTPUT: OutputMap = OutputMap::Binary(&[((S, S), ONLY_S), ((M, S), ONLY_M)]);

fn invalid(kind: OperationKind, inputs: &[Value]) -> OpError {
    OpError::InvalidInput {
        operation: kind,
        types: inputs.iter().map(Value::socket_type).collect(),
    }
}

fn nonzero(v: DVec3, message: &str) -> Result<DVec3, CalculationError> {
    if v.length_squared() == 0.0 {
        Err(CalculationError::new(message))
    } else {
        Ok(v)
    }
}

/// Elementwise sum of two values of the same kind.
pub struct Add;

impl Operation for Add {
    fn kind(&self) -> OperationKind {
        OperationKind::Add
    }
    fn output_name(&self) -> &'static str {
        "Sum"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        ANYTHING_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Anything
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(SAME_KIND_OUTPUT)
    }
    fn lhs_to_rhs(&self) -> Option<CompatibilityMap> {
        Some(SAME_KIND)
    }
    fn rhs_to_lhs(&self) -> Option<CompatibilityMap> {
        Some(SAME_KIND)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match inputs {
            [Value::Scalar(a), Value::Scalar(b)] => Ok(Value::Scalar(a + b)),
            [Value::Vector(a), Value::Vector(b)] => Ok(Value::Vector(*a + *b)),
            [Value::Matrix(a), Value::Matrix(b)] => Ok(Value::Matrix(*a + *b)),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Elementwise difference of two values of the same kind.
pub struct Subtract;

impl Operation for Subtract {
    fn kind(&self) -> OperationKind {
        OperationKind::Subtract
    }
    fn output_name(&self) -> &'static str {
        "Difference"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        ANYTHING_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Anything
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(SAME_KIND_OUTPUT)
    }
    fn lhs_to_rhs(&self) -> Option<CompatibilityMap> {
        Some(SAME_KIND)
    }
    fn rhs_to_lhs(&self) -> Option<CompatibilityMap> {
        Some(SAME_KIND)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match inputs {
            [Value::Scalar(a), Value::Scalar(b)] => Ok(Value::Scalar(a - b)),
            [Value::Vector(a), Value::Vector(b)] => Ok(Value::Vector(*a - *b)),
            [Value::Matrix(a), Value::Matrix(b)] => Ok(Value::Matrix(*a - *b)),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Scaling, matrix products and matrix-vector transforms.
///
/// A vector on the right of a matrix is treated as a direction, so the
/// translation part of the matrix does not apply.
pub struct Multiply;

impl Operation for Multiply {
    fn kind(&self) -> OperationKind {
        OperationKind::Multiply
    }
    fn output_name(&self) -> &'static str {
        "Product"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        ANYTHING_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Anything
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(MULTIPLY_OUTPUT)
    }
    fn lhs_to_rhs(&self) -> Option<CompatibilityMap> {
        Some(MULTIPLY_LHS_TO_RHS)
    }
    fn rhs_to_lhs(&self) -> Option<CompatibilityMap> {
        Some(MULTIPLY_RHS_TO_LHS)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Scalar(a), Value::Scalar(b)] => Ok(Value::Scalar(a * b)),
            [Value::Scalar(s), Value::Vector(v)] | [Value::Vector(v), Value::Scalar(s)] => {
                Ok(Value::Vector(v * s))
            }
            [Value::Scalar(s), Value::Matrix(m)] | [Value::Matrix(m), Value::Scalar(s)] => {
                Ok(Value::Matrix(m * s))
            }
            [Value::Matrix(a), Value::Matrix(b)] => Ok(Value::Matrix(a * b)),
            [Value::Matrix(m), Value::Vector(v)] => Ok(Value::Vector(m.transform_vector3(v))),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Division by a scalar.
pub struct Divide;

impl Operation for Divide {
    fn kind(&self) -> OperationKind {
        OperationKind::Divide
    }
    fn output_name(&self) -> &'static str {
        "Quotient"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::Anything, CompoundSocket::Scalar]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Anything
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(DIVIDE_OUTPUT)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        let divisor = inputs[1].as_scalar().map_err(|_| invalid(self.kind(), inputs))?;
        if divisor == 0.0 {
            return Err(CalculationError::division_by_zero().into());
        }
        match inputs[0] {
            Value::Scalar(a) => Ok(Value::Scalar(a / divisor)),
            Value::Vector(v) => Ok(Value::Vector(v / divisor)),
            Value::Matrix(m) => Ok(Value::Matrix(m * (1.0 / divisor))),
        }
    }
}

/// Dot product of two vectors.
pub struct Dot;

impl Operation for Dot {
    fn kind(&self) -> OperationKind {
        OperationKind::Dot
    }
    fn output_name(&self) -> &'static str {
        "Dot product"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        VECTOR_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Scalar
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(a), Value::Vector(b)] => Ok(Value::Scalar(a.dot(b))),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Cross product of two vectors.
pub struct Cross;

impl Operation for Cross {
    fn kind(&self) -> OperationKind {
        OperationKind::Cross
    }
    fn output_name(&self) -> &'static str {
        "Cross product"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        VECTOR_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Vector
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(a), Value::Vector(b)] => Ok(Value::Vector(a.cross(b))),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Angle between two vectors, in radians.
pub struct Angle;

impl Operation for Angle {
    fn kind(&self) -> OperationKind {
        OperationKind::Angle
    }
    fn output_name(&self) -> &'static str {
        "Angle"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        VECTOR_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Scalar
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(a), Value::Vector(b)] => {
                const MESSAGE: &str = "Angle is undefined for a zero-length vector";
                let a = nonzero(a, MESSAGE)?;
                let b = nonzero(b, MESSAGE)?;
                let cos = (a.dot(b) / (a.length() * b.length())).clamp(-1.0, 1.0);
                Ok(Value::Scalar(cos.acos()))
            }
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Projection of `lhs` onto `rhs`.
pub struct Projection;

impl Operation for Projection {
    fn kind(&self) -> OperationKind {
        OperationKind::Projection
    }
    fn output_name(&self) -> &'static str {
        "Projection"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        VECTOR_PAIR
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Vector
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(a), Value::Vector(b)] => {
                let b = nonzero(b, "Cannot project onto a zero-length vector")?;
                Ok(Value::Vector(b * (a.dot(b) / b.dot(b))))
            }
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Scalar powers and integer matrix powers.
pub struct Exponent;

impl Exponent {
    fn matrix_power(base: DMat4, exponent: f64) -> Result<DMat4, CalculationError> {
        if exponent.fract() != 0.0 || !exponent.is_finite() {
            return Err(CalculationError::new("Matrix exponent must be an integer"));
        }
        let mut base = if exponent < 0.0 {
            invert_matrix(base)?
        } else {
            base
        };
        let mut remaining = exponent.abs() as u64;
        let mut result = DMat4::IDENTITY;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result * base;
            }
            base = base * base;
            remaining >>= 1;
        }
        Ok(result)
    }
}

impl Operation for Exponent {
    fn kind(&self) -> OperationKind {
        OperationKind::Exponent
    }
    fn output_name(&self) -> &'static str {
        "Power"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::ScalarOrMatrix, CompoundSocket::Scalar]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::ScalarOrMatrix
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(EXPONENT_OUTPUT)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Scalar(base), Value::Scalar(exponent)] => {
                if base == 0.0 && exponent < 0.0 {
                    return Err(CalculationError::division_by_zero().into());
                }
                let result = base.powf(exponent);
                if result.is_nan() {
                    return Err(CalculationError::new("Result is not a real number").into());
                }
                Ok(Value::Scalar(result))
            }
            [Value::Matrix(base), Value::Scalar(exponent)] => {
                Ok(Value::Matrix(Self::matrix_power(base, exponent)?))
            }
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}
