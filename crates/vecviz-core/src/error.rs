//! Error types for vecviz-core.

use thiserror::Error;

use crate::graph::{ConnectionId, NodeId};
use crate::socket::{CompoundSocket, SocketSet, SocketType};

/// Error when a set of socket types is not a legal port type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The set does not equal any canonical union.
    #[error("socket set {0} is not a canonical compound socket")]
    InvalidSocketSet(SocketSet),
}

/// Error when a value has the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type error: expected {expected}, got {got}")]
pub struct TypeError {
    /// The kind that was expected.
    pub expected: SocketType,
    /// The kind that was actually provided.
    pub got: SocketType,
}

impl TypeError {
    /// Create a new type error.
    pub fn expected(expected: SocketType, got: SocketType) -> Self {
        Self { expected, got }
    }
}

/// Errors converting between values and their numeric or JSON forms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Markers never carry a value.
    #[error("{0} does not describe a value kind")]
    NotAValueKind(SocketType),

    /// Payload has the wrong number of components.
    #[error("{kind} payload needs {expected} numbers, got {got}")]
    WrongLength {
        /// Kind being decoded.
        kind: SocketType,
        /// Required length.
        expected: usize,
        /// Provided length.
        got: usize,
    },

    /// JSON data is not a number or an array of numbers.
    #[error("cannot read a {kind} from {found}")]
    Json {
        /// Kind being decoded.
        kind: SocketType,
        /// The offending JSON text.
        found: String,
    },

    /// Wrong value kind.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Node with the given ID was not found.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node ID is already in use.
    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),

    /// Port on a node was not found.
    #[error("port not found: node {node}, port {port}")]
    PortNotFound {
        /// Node ID.
        node: NodeId,
        /// Port name.
        port: String,
    },

    /// Port name is already in use on the node.
    #[error("port already exists: node {node}, port {port}")]
    DuplicatePort {
        /// Node ID.
        node: NodeId,
        /// Port name.
        port: String,
    },

    /// Connection with the given ID was not found.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Connection ID is already in use.
    #[error("connection already exists: {0}")]
    DuplicateConnection(ConnectionId),

    /// Input already has a producer.
    #[error("input already connected: node {node}, port {port}")]
    InputOccupied {
        /// Node ID.
        node: NodeId,
        /// Port name.
        port: String,
    },

    /// Output and input sockets share no value kind.
    #[error("incompatible sockets: {from} cannot feed {to}")]
    IncompatibleSockets {
        /// Producer socket.
        from: CompoundSocket,
        /// Consumer socket.
        to: CompoundSocket,
    },

    /// Connecting the two nodes would close a loop.
    #[error("connecting node {from} to node {to} would create a cycle")]
    WouldCreateCycle {
        /// Producer node.
        from: NodeId,
        /// Consumer node.
        to: NodeId,
    },

    /// Graph contains a cycle.
    #[error("cycle detected in graph")]
    CycleDetected,

    /// Illegal socket set.
    #[error(transparent)]
    Socket(#[from] SocketError),
}
