//! Notifications from the engine to its host.

use vecviz_core::{NodeId, Value};

/// Hooks the host implements to follow graph changes.
///
/// All methods default to doing nothing.
pub trait EditorObserver {
    /// A port socket of `node` changed or one of its connections was pruned.
    fn node_changed(&mut self, node: NodeId) {
        let _ = node;
    }

    /// Shows (`Some`) or clears (`None`) the calculation warning of `node`.
    fn set_warning(&mut self, node: NodeId, warning: Option<&str>) {
        let _ = (node, warning);
    }

    /// `node` evaluated to `value`.
    fn value_computed(&mut self, node: NodeId, value: &Value) {
        let _ = (node, value);
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl EditorObserver for NullObserver {}
