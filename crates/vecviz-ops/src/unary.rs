//! Operations taking a single `value`.

use glam::DMat4;
use vecviz_core::{CompoundSocket, SocketSet, SocketType, Value};

use crate::error::{CalculationError, OpError};
use crate::operation::{check_inputs, Operation, OperationKind, OutputMap};

const S: SocketType = SocketType::Scalar;
const M: SocketType = SocketType::Matrix;

/// The output socket is fixed; the table only validates the input kind.
const MATRIX_IN_IGNORE_OUT: OutputMap =
    OutputMap::Unary(&[(M, SocketSet::of(&[SocketType::Ignore]))]);

const INVERT_OUTPUT: OutputMap =
    OutputMap::Unary(&[(S, SocketSet::of(&[S])), (M, SocketSet::of(&[M]))]);

/// Inverts a matrix, failing when its determinant is exactly zero.
pub(crate) fn invert_matrix(m: DMat4) -> Result<DMat4, CalculationError> {
    if m.determinant() == 0.0 {
        return Err(CalculationError::singular_matrix());
    }
    Ok(m.inverse())
}

fn invalid(kind: OperationKind, inputs: &[Value]) -> OpError {
    OpError::InvalidInput {
        operation: kind,
        types: inputs.iter().map(Value::socket_type).collect(),
    }
}

/// Euclidean length of a vector.
pub struct Length;

impl Operation for Length {
    fn kind(&self) -> OperationKind {
        OperationKind::Length
    }
    fn output_name(&self) -> &'static str {
        "Length"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::Vector]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Scalar
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(v)] => Ok(Value::Scalar(v.length())),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Reciprocal of a scalar or inverse of a matrix.
pub struct Invert;

impl Operation for Invert {
    fn kind(&self) -> OperationKind {
        OperationKind::Invert
    }
    fn output_name(&self) -> &'static str {
        "Inverse"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::ScalarOrMatrix]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::ScalarOrMatrix
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(INVERT_OUTPUT)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Scalar(s)] => {
                if s == 0.0 {
                    return Err(CalculationError::division_by_zero().into());
                }
                Ok(Value::Scalar(1.0 / s))
            }
            [Value::Matrix(m)] => Ok(Value::Matrix(invert_matrix(m)?)),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Unit vector with the same direction.
pub struct Normalize;

impl Operation for Normalize {
    fn kind(&self) -> OperationKind {
        OperationKind::Normalize
    }
    fn output_name(&self) -> &'static str {
        "Unit vector"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::Vector]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Vector
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Vector(v)] => {
                let length = v.length();
                if length == 0.0 {
                    return Err(
                        CalculationError::new("Cannot normalize a zero-length vector").into(),
                    );
                }
                Ok(Value::Vector(v / length))
            }
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Matrix transpose.
pub struct Transpose;

impl Operation for Transpose {
    fn kind(&self) -> OperationKind {
        OperationKind::Transpose
    }
    fn output_name(&self) -> &'static str {
        "Transpose"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::Matrix]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Matrix
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(MATRIX_IN_IGNORE_OUT)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Matrix(m)] => Ok(Value::Matrix(m.transpose())),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

/// Determinant of a matrix. Singular matrices yield 0, not an error.
pub struct Determinant;

impl Operation for Determinant {
    fn kind(&self) -> OperationKind {
        OperationKind::Determinant
    }
    fn output_name(&self) -> &'static str {
        "Determinant"
    }
    fn default_inputs(&self) -> &'static [CompoundSocket] {
        &[CompoundSocket::Matrix]
    }
    fn default_output(&self) -> CompoundSocket {
        CompoundSocket::Scalar
    }
    fn output_map(&self) -> Option<OutputMap> {
        Some(MATRIX_IN_IGNORE_OUT)
    }

    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError> {
        check_inputs(self, inputs)?;
        match *inputs {
            [Value::Matrix(m)] => Ok(Value::Scalar(m.determinant())),
            _ => Err(invalid(self.kind(), inputs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use vecviz_core::matrix_from_rows;

    #[test]
    fn test_length() {
        let result = Length
            .calculate(&[Value::Vector(DVec3::new(3.0, 4.0, 0.0))])
            .unwrap();
        assert_eq!(result, Value::Scalar(5.0));
    }

    #[test]
    fn test_invert_singular_matrix() {
        let zero = Value::from_payload(SocketType::Matrix, &[0.0; 16]).unwrap();
        match Invert.calculate(&[zero]) {
            Err(OpError::Calculation(e)) => {
                assert_eq!(e.message, "Determinant is 0; matrix cannot be inverted")
            }
            other => panic!("expected calculation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invert_scalar() {
        assert_eq!(
            Invert.calculate(&[Value::Scalar(4.0)]).unwrap(),
            Value::Scalar(0.25)
        );
        assert!(matches!(
            Invert.calculate(&[Value::Scalar(0.0)]),
            Err(OpError::Calculation(_))
        ));
    }

    #[test]
    fn test_invert_matrix() {
        let m = DMat4::from_scale(DVec3::new(2.0, 4.0, 8.0));
        let result = Invert.calculate(&[Value::Matrix(m)]).unwrap();
        let expected = DMat4::from_scale(DVec3::new(0.5, 0.25, 0.125));
        assert!(result.as_matrix().unwrap().abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn test_normalize() {
        let result = Normalize
            .calculate(&[Value::Vector(DVec3::new(0.0, 0.0, 5.0))])
            .unwrap();
        assert_eq!(result, Value::Vector(DVec3::Z));
        assert!(matches!(
            Normalize.calculate(&[Value::Vector(DVec3::ZERO)]),
            Err(OpError::Calculation(_))
        ));
    }

    #[test]
    fn test_transpose_row_major() {
        let rows: Vec<f64> = (0..16).map(f64::from).collect();
        let m = Value::from_payload(SocketType::Matrix, &rows).unwrap();
        let t = Transpose.calculate(&[m]).unwrap().payload();
        assert_eq!(t[1], 4.0);
        assert_eq!(t[4], 1.0);
    }

    #[test]
    fn test_determinant_of_singular_is_zero() {
        let zero = Value::from_payload(SocketType::Matrix, &[0.0; 16]).unwrap();
        assert_eq!(
            Determinant.calculate(&[zero]).unwrap().payload(),
            vec![0.0]
        );
        let mut rows = [0.0; 16];
        rows[0] = 2.0;
        rows[5] = 3.0;
        rows[10] = 4.0;
        rows[15] = 1.0;
        let m = Value::Matrix(matrix_from_rows(&rows));
        assert_eq!(Determinant.calculate(&[m]).unwrap(), Value::Scalar(24.0));
    }

    #[test]
    fn test_ignore_table_validates_but_does_not_move_output() {
        let set = Determinant
            .output_types(&[CompoundSocket::Matrix])
            .unwrap()
            .unwrap();
        assert_eq!(set, SocketSet::of(&[SocketType::Ignore]));
        assert!(Determinant.calculate(&[Value::Scalar(1.0)]).is_err());
    }
}
