//! Undo/redo for VecViz graphs.
//!
//! Every graph mutation is a reversible [`Command`]. The [`History`] keeps
//! undo and redo stacks of them, can merge adjacent entries into one atomic
//! step, and can suppress recording while derived mutations run.
//!
//! ```
//! use std::collections::BTreeMap;
//! use vecviz_core::{CompoundSocket, Graph, NodePorts};
//! use vecviz_history::{Command, History, HistoryConfig};
//!
//! let mut graph = Graph::new();
//! let node = graph.add_node(
//!     "Scalar",
//!     NodePorts::new().output("result", CompoundSocket::Scalar),
//!     BTreeMap::new(),
//! );
//! let mut history = History::new(HistoryConfig::default());
//!
//! let command = Command::set_field(&graph, node, "value", Some(2.0.into())).unwrap();
//! history.add_and_do(command, &mut graph).unwrap();
//! history.undo(&mut graph).unwrap();
//! assert!(graph.node(node).unwrap().field("value").is_none());
//! ```

mod command;
mod error;
mod history;

pub use command::Command;
pub use error::HistoryError;
pub use history::{History, HistoryConfig, Suppressed};
