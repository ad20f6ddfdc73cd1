//! Nodes and their ports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::graph::NodeId;
use crate::socket::CompoundSocket;

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    /// Consumes a value.
    Input,
    /// Produces a value.
    Output,
}

impl fmt::Display for PortSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSide::Input => f.write_str("input"),
            PortSide::Output => f.write_str("output"),
        }
    }
}

/// A named input or output with its current socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique per side of a node.
    pub name: String,
    /// Value kinds the port currently accepts.
    pub socket: CompoundSocket,
}

impl Port {
    /// Create a new port.
    pub fn new(name: impl Into<String>, socket: CompoundSocket) -> Self {
        Self {
            name: name.into(),
            socket,
        }
    }
}

/// Port layout of a freshly created node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePorts {
    /// Input ports in display order.
    pub inputs: Vec<Port>,
    /// Output ports in display order.
    pub outputs: Vec<Port>,
}

impl NodePorts {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input port.
    pub fn input(mut self, name: impl Into<String>, socket: CompoundSocket) -> Self {
        self.inputs.push(Port::new(name, socket));
        self
    }

    /// Adds an output port.
    pub fn output(mut self, name: impl Into<String>, socket: CompoundSocket) -> Self {
        self.outputs.push(Port::new(name, socket));
        self
    }
}

/// A node instance in the graph arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// Node type name, interpreted by the editor.
    pub type_name: String,
    /// Input ports.
    pub inputs: Vec<Port>,
    /// Output ports.
    pub outputs: Vec<Port>,
    /// Persisted field values keyed by field name.
    pub data: BTreeMap<String, JsonValue>,
}

impl Node {
    /// Create a node from its layout and data.
    pub fn new(
        id: NodeId,
        type_name: impl Into<String>,
        ports: NodePorts,
        data: BTreeMap<String, JsonValue>,
    ) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            inputs: ports.inputs,
            outputs: ports.outputs,
            data,
        }
    }

    /// Ports on one side.
    pub fn ports(&self, side: PortSide) -> &[Port] {
        match side {
            PortSide::Input => &self.inputs,
            PortSide::Output => &self.outputs,
        }
    }

    /// Looks up a port by side and name.
    pub fn port(&self, side: PortSide, name: &str) -> Option<&Port> {
        self.ports(side).iter().find(|p| p.name == name)
    }

    /// Mutable port lookup.
    pub fn port_mut(&mut self, side: PortSide, name: &str) -> Option<&mut Port> {
        let ports = match side {
            PortSide::Input => &mut self.inputs,
            PortSide::Output => &mut self.outputs,
        };
        ports.iter_mut().find(|p| p.name == name)
    }

    /// Looks up an input port.
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.port(PortSide::Input, name)
    }

    /// Looks up an output port.
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.port(PortSide::Output, name)
    }

    /// Reads a data field.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.data.get(name)
    }

    /// Writes or clears a data field, returning the previous value.
    pub fn set_field(&mut self, name: &str, value: Option<JsonValue>) -> Option<JsonValue> {
        match value {
            Some(value) => self.data.insert(name.to_string(), value),
            None => self.data.remove(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_lookup() {
        let ports = NodePorts::new()
            .input("lhs", CompoundSocket::Anything)
            .input("rhs", CompoundSocket::Anything)
            .output("result", CompoundSocket::Anything);
        let mut node = Node::new(3, "BinaryOperation", ports, BTreeMap::new());

        assert_eq!(node.inputs.len(), 2);
        assert!(node.input("rhs").is_some());
        assert!(node.output("rhs").is_none());

        node.port_mut(PortSide::Input, "lhs").unwrap().socket = CompoundSocket::Vector;
        assert_eq!(node.input("lhs").unwrap().socket, CompoundSocket::Vector);
    }

    #[test]
    fn test_fields() {
        let mut node = Node::new(0, "Scalar", NodePorts::new(), BTreeMap::new());
        assert_eq!(node.set_field("value", Some(json!(1.0))), None);
        assert_eq!(node.set_field("value", Some(json!(2.0))), Some(json!(1.0)));
        assert_eq!(node.field("value"), Some(&json!(2.0)));
        assert_eq!(node.set_field("value", None), Some(json!(2.0)));
        assert!(node.field("value").is_none());
    }
}
