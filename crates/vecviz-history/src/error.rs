//! History error types.

use thiserror::Error;
use vecviz_core::GraphError;

/// Errors that can occur during history operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    /// Graph operation error.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Fewer entries on the undo stack than a squash asked for.
    #[error("cannot squash {requested} entries, only {available} recorded")]
    NotEnoughEntries {
        /// Entries requested.
        requested: usize,
        /// Entries on the undo stack.
        available: usize,
    },

    /// The command does not match the graph it is applied to.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
