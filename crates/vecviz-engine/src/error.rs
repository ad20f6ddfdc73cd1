//! Engine error types.

use thiserror::Error;
use vecviz_core::{CompoundSocket, GraphError, NodeId, SocketError, ValueError};
use vecviz_history::HistoryError;
use vecviz_ops::{OpError, OperationKind};

/// Errors raised by propagation, evaluation and the editor.
///
/// Calculation failures never surface here; they become node warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Graph structure error.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// History error.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Operation lookup or invalid operation input.
    #[error("operation error: {0}")]
    Op(#[from] OpError),

    /// Malformed persisted value.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A resolved type set is not a canonical socket.
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    /// A compatibility map allowed nothing for a port.
    #[error("no compatible socket for input {port} of node {node}")]
    AmbiguousSockets {
        /// Node ID.
        node: NodeId,
        /// Input port name.
        port: String,
    },

    /// Output resolution reached an invalid input combination.
    #[error("invalid input combination {inputs:?} for {operation} on node {node}")]
    InvalidTypeCombination {
        /// Node ID.
        node: NodeId,
        /// Operation of the node.
        operation: OperationKind,
        /// Resolved input sockets.
        inputs: Vec<CompoundSocket>,
    },

    /// The node's type name is not a known node kind.
    #[error("unknown node kind: {0}")]
    InvalidNodeKind(String),

    /// A required data field is absent or malformed.
    #[error("node {node} has no valid field '{field}'")]
    MissingField {
        /// Node ID.
        node: NodeId,
        /// Field name.
        field: String,
    },

    /// The node is not an operation node.
    #[error("node {0} is not an operation node")]
    NotAnOperation(NodeId),

    /// The node is not a value node.
    #[error("node {0} is not a value node")]
    NotAValue(NodeId),

    /// The operation takes a different number of inputs than the node has.
    #[error("{operation} does not fit the inputs of node {node}")]
    ArityMismatch {
        /// Node ID.
        node: NodeId,
        /// Requested operation.
        operation: OperationKind,
    },

    /// The node kind has no render origin.
    #[error("node {0} does not support advanced rendering")]
    AdvancedRenderUnsupported(NodeId),
}
