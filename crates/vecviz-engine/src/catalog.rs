//! Node kinds, their port layouts and default data.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use vecviz_core::{CompoundSocket, Node, NodePorts, Port, SocketType, Value};
use vecviz_ops::{Arity, OperationKind, OperationRegistry};

use crate::config::EditorConfig;
use crate::error::EngineError;

/// Literal value of a value node.
pub const VALUE_FIELD: &str = "value";
/// Selected operation of an operation node.
pub const OPERATION_FIELD: &str = "operation";
/// Display colour.
pub const COLOR_FIELD: &str = "color";
/// Whether the render origin input is present.
pub const ADVANCED_RENDER_FIELD: &str = "advanced_render";

/// Output port of value nodes.
pub const VALUE_PORT: &str = "value";
/// Dynamic input holding the point a vector is drawn from.
pub const RENDER_PORT: &str = "render_origin";

/// The kinds of node an editor can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Literal scalar.
    Scalar,
    /// Literal 3D vector.
    Vector,
    /// Literal 4x4 matrix.
    Matrix,
    /// Node running one of the binary operations.
    BinaryOperation,
    /// Node running one of the unary operations.
    UnaryOperation,
}

impl NodeKind {
    /// Every node kind.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Scalar,
        NodeKind::Vector,
        NodeKind::Matrix,
        NodeKind::BinaryOperation,
        NodeKind::UnaryOperation,
    ];

    /// Type name stored on nodes of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Scalar => "Scalar",
            NodeKind::Vector => "Vector",
            NodeKind::Matrix => "Matrix",
            NodeKind::BinaryOperation => "BinaryOperation",
            NodeKind::UnaryOperation => "UnaryOperation",
        }
    }

    /// Kind of an existing node.
    pub fn of(node: &Node) -> Result<Self, EngineError> {
        node.type_name.parse()
    }

    /// Value kind produced by a value node, `None` for operation nodes.
    pub fn value_type(self) -> Option<SocketType> {
        match self {
            NodeKind::Scalar => Some(SocketType::Scalar),
            NodeKind::Vector => Some(SocketType::Vector),
            NodeKind::Matrix => Some(SocketType::Matrix),
            NodeKind::BinaryOperation | NodeKind::UnaryOperation => None,
        }
    }

    /// Input count of an operation node, `None` for value nodes.
    pub fn arity(self) -> Option<Arity> {
        match self {
            NodeKind::BinaryOperation => Some(Arity::Binary),
            NodeKind::UnaryOperation => Some(Arity::Unary),
            _ => None,
        }
    }

    /// Operation a new node of this kind starts with.
    pub fn default_operation(self) -> Option<OperationKind> {
        match self.arity()? {
            Arity::Binary => Some(OperationKind::Add),
            Arity::Unary => Some(OperationKind::Length),
        }
    }

    /// Whether the node can grow a [`RENDER_PORT`] input.
    pub fn supports_advanced_render(self) -> bool {
        self != NodeKind::Scalar && self != NodeKind::Matrix
    }

    /// Ports of a fresh node of this kind running `operation`.
    pub fn ports(
        self,
        registry: &OperationRegistry,
        operation: Option<OperationKind>,
    ) -> Result<NodePorts, EngineError> {
        if let Some(ty) = self.value_type() {
            return Ok(NodePorts::new().output(VALUE_PORT, CompoundSocket::from_type(ty)?));
        }
        let operation = operation
            .or_else(|| self.default_operation())
            .ok_or_else(|| EngineError::InvalidNodeKind(self.to_string()))?;
        Ok(registry.get(operation)?.setup_sockets())
    }

    /// Data bag of a fresh node.
    pub fn default_data(
        self,
        config: &EditorConfig,
        operation: Option<OperationKind>,
    ) -> Result<BTreeMap<String, JsonValue>, EngineError> {
        let mut data = BTreeMap::new();
        if let Some(ty) = self.value_type() {
            data.insert(VALUE_FIELD.to_string(), Value::default_for(ty)?.to_json());
        }
        if let Some(operation) = operation.or_else(|| self.default_operation()) {
            data.insert(
                OPERATION_FIELD.to_string(),
                JsonValue::from(operation.as_str()),
            );
        }
        data.insert(
            COLOR_FIELD.to_string(),
            JsonValue::from(config.node_color().to_vec()),
        );
        data.insert(ADVANCED_RENDER_FIELD.to_string(), JsonValue::Bool(false));
        Ok(data)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::InvalidNodeKind(s.to_string()))
    }
}

/// Operation selected on an operation node.
pub fn operation_of(node: &Node) -> Result<OperationKind, EngineError> {
    let missing = || EngineError::MissingField {
        node: node.id,
        field: OPERATION_FIELD.to_string(),
    };
    let name = node
        .field(OPERATION_FIELD)
        .and_then(JsonValue::as_str)
        .ok_or_else(missing)?;
    Ok(name.parse::<OperationKind>()?)
}

/// Literal held by a value node.
pub fn value_of(node: &Node, ty: SocketType) -> Result<Value, EngineError> {
    let json = node
        .field(VALUE_FIELD)
        .ok_or_else(|| EngineError::MissingField {
            node: node.id,
            field: VALUE_FIELD.to_string(),
        })?;
    Ok(Value::from_json(ty, json)?)
}

/// The render origin input.
pub fn render_port() -> Port {
    Port::new(RENDER_PORT, CompoundSocket::Vector)
}
