//! Socket type propagation, evaluation and the editor facade for VecViz.
//!
//! The [`Editor`] owns a graph and its history. After every mutation it runs
//! a propagation sweep that narrows or widens each operation node's sockets
//! to what its producers can deliver, prunes connections the new types rule
//! out, and evaluates every node in dependency order. Whatever the sweep
//! changes is folded into the undo entry of the mutation that caused it.
//!
//! - [`Editor`] - the mutation and undo/redo surface a host drives
//! - [`propagate()`] - one socket type sweep over a graph
//! - [`evaluate()`] - one value pass over a graph
//! - [`EditorObserver`] - hooks for host notifications
//! - [`NodeKind`] - the node kinds and their default layouts
//!
//! ```
//! use vecviz_core::{CompoundSocket, PortSide, Value};
//! use vecviz_engine::{Editor, NodeKind};
//! use vecviz_ops::{OperationKind, RESULT_PORT};
//!
//! let mut editor = Editor::default();
//! let vector = editor.add_node(NodeKind::Vector).unwrap();
//! let scale = editor.add_node(NodeKind::Scalar).unwrap();
//! editor.set_value(scale, Value::Scalar(2.0)).unwrap();
//!
//! let multiply = editor.add_operation_node(OperationKind::Multiply).unwrap();
//! editor.connect(vector, "value", multiply, "lhs").unwrap();
//! editor.connect(scale, "value", multiply, "rhs").unwrap();
//!
//! let result = editor.graph().port(multiply, PortSide::Output, RESULT_PORT).unwrap();
//! assert_eq!(result.socket, CompoundSocket::Vector);
//!
//! editor.undo().unwrap();
//! assert!(editor.graph().input_connection(multiply, "rhs").is_none());
//! ```

mod catalog;
mod config;
mod editor;
mod error;
mod evaluate;
mod observer;
mod propagate;

pub use catalog::{
    operation_of, render_port, value_of, NodeKind, ADVANCED_RENDER_FIELD, COLOR_FIELD,
    OPERATION_FIELD, RENDER_PORT, VALUE_FIELD, VALUE_PORT,
};
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::EngineError;
pub use evaluate::{evaluate, Evaluation};
pub use observer::{EditorObserver, NullObserver};
pub use propagate::{propagate, SweepReport};
