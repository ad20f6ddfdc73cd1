//! Concrete values flowing through connections.
//!
//! Every value is tagged with its kind. The numeric payload is a flat list:
//! one number for a scalar, three for a vector and sixteen row-major numbers
//! for a matrix. Internally matrices are glam's column-major [`DMat4`]; the
//! conversions below transpose at the boundary so callers only ever see the
//! row-major convention.
//!
//! ```
//! use vecviz_core::{SocketType, Value};
//!
//! let v = Value::from_payload(SocketType::Vector, &[1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(v.socket_type(), SocketType::Vector);
//! assert_eq!(v.payload(), vec![1.0, 2.0, 3.0]);
//! ```

use std::fmt;

use glam::{DMat4, DVec3};
use serde_json::Value as JsonValue;

use crate::error::{TypeError, ValueError};
use crate::socket::SocketType;

/// A concrete scalar, vector or matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A single number.
    Scalar(f64),
    /// A 3D vector.
    Vector(DVec3),
    /// A 4x4 matrix.
    Matrix(DMat4),
}

/// Builds a matrix from 16 row-major numbers.
pub fn matrix_from_rows(rows: &[f64; 16]) -> DMat4 {
    DMat4::from_cols_array(rows).transpose()
}

/// Flattens a matrix into 16 row-major numbers.
pub fn matrix_to_rows(matrix: &DMat4) -> [f64; 16] {
    matrix.transpose().to_cols_array()
}

impl Value {
    /// Returns the kind of this value.
    pub fn socket_type(&self) -> SocketType {
        match self {
            Value::Scalar(_) => SocketType::Scalar,
            Value::Vector(_) => SocketType::Vector,
            Value::Matrix(_) => SocketType::Matrix,
        }
    }

    /// Number of payload components for a kind.
    pub fn payload_len(kind: SocketType) -> Result<usize, ValueError> {
        match kind {
            SocketType::Scalar => Ok(1),
            SocketType::Vector => Ok(3),
            SocketType::Matrix => Ok(16),
            other => Err(ValueError::NotAValueKind(other)),
        }
    }

    /// The zero scalar, zero vector or identity matrix.
    pub fn default_for(kind: SocketType) -> Result<Value, ValueError> {
        match kind {
            SocketType::Scalar => Ok(Value::Scalar(0.0)),
            SocketType::Vector => Ok(Value::Vector(DVec3::ZERO)),
            SocketType::Matrix => Ok(Value::Matrix(DMat4::IDENTITY)),
            other => Err(ValueError::NotAValueKind(other)),
        }
    }

    /// Decodes a tagged numeric payload.
    pub fn from_payload(kind: SocketType, payload: &[f64]) -> Result<Value, ValueError> {
        let expected = Self::payload_len(kind)?;
        if payload.len() != expected {
            return Err(ValueError::WrongLength {
                kind,
                expected,
                got: payload.len(),
            });
        }
        Ok(match kind {
            SocketType::Scalar => Value::Scalar(payload[0]),
            SocketType::Vector => Value::Vector(DVec3::from_slice(payload)),
            _ => {
                let mut rows = [0.0; 16];
                rows.copy_from_slice(payload);
                Value::Matrix(matrix_from_rows(&rows))
            }
        })
    }

    /// The flat payload (row-major for matrices).
    pub fn payload(&self) -> Vec<f64> {
        match self {
            Value::Scalar(s) => vec![*s],
            Value::Vector(v) => v.to_array().to_vec(),
            Value::Matrix(m) => matrix_to_rows(m).to_vec(),
        }
    }

    /// Reads a persisted field value.
    ///
    /// Scalars are stored as a bare number; vectors and matrices as flat
    /// arrays. A one-element array is accepted for scalars too.
    pub fn from_json(kind: SocketType, json: &JsonValue) -> Result<Value, ValueError> {
        let bad = || ValueError::Json {
            kind,
            found: json.to_string(),
        };
        let payload: Vec<f64> = match json {
            JsonValue::Number(n) => vec![n.as_f64().ok_or_else(bad)?],
            JsonValue::Array(items) => items
                .iter()
                .map(|item| item.as_f64().ok_or_else(bad))
                .collect::<Result<_, _>>()?,
            _ => return Err(bad()),
        };
        Self::from_payload(kind, &payload)
    }

    /// Encodes the value for the persisted data bag.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Scalar(s) => JsonValue::from(*s),
            other => JsonValue::from(other.payload()),
        }
    }

    /// Attempts to extract a scalar.
    pub fn as_scalar(&self) -> Result<f64, TypeError> {
        match self {
            Value::Scalar(s) => Ok(*s),
            other => Err(TypeError::expected(SocketType::Scalar, other.socket_type())),
        }
    }

    /// Attempts to extract a vector.
    pub fn as_vector(&self) -> Result<DVec3, TypeError> {
        match self {
            Value::Vector(v) => Ok(*v),
            other => Err(TypeError::expected(SocketType::Vector, other.socket_type())),
        }
    }

    /// Attempts to extract a matrix.
    pub fn as_matrix(&self) -> Result<DMat4, TypeError> {
        match self {
            Value::Matrix(m) => Ok(*m),
            other => Err(TypeError::expected(SocketType::Matrix, other.socket_type())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.socket_type(), self.payload())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Value::Vector(v)
    }
}

impl From<DMat4> for Value {
    fn from(m: DMat4) -> Self {
        Value::Matrix(m)
    }
}
