//! Socket type propagation.
//!
//! One sweep visits every node in topological order, so upstream outputs are
//! final before a downstream node reads them. For an operation node:
//!
//! 1. Each input starts from the socket of its producer intersected with the
//!    operation's default; a disconnected input reverts to the default.
//! 2. For binary operations, `rhs` is narrowed against `lhs`, then `lhs`
//!    against the new `rhs`. A side already inside the compatible set stays.
//! 3. Changed sockets are written back and every input whose producer no
//!    longer intersects it is disconnected.
//! 4. The output is derived from the input sockets and connections it no
//!    longer satisfies are disconnected.
//!
//! Every change is applied through a [`Command`] and offered to the history,
//! so the caller can fold the sweep into the action that triggered it.

use vecviz_core::{
    CompoundSocket, Connection, Graph, NodeId, PortSide, SocketSet, SocketType,
};
use vecviz_history::{Command, History};
use vecviz_ops::{CompatibilityMap, Operation, OperationKind, OperationRegistry, RESULT_PORT};

use crate::catalog::{self, NodeKind};
use crate::error::EngineError;
use crate::observer::EditorObserver;

/// What one sweep changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Nodes with at least one changed socket, in visiting order.
    pub changed: Vec<NodeId>,
    /// Connections removed because their ends no longer intersect.
    pub pruned: Vec<Connection>,
    /// Commands the history accepted.
    pub recorded: usize,
}

impl SweepReport {
    /// Returns true when the sweep left the graph untouched.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.pruned.is_empty()
    }
}

/// Runs one propagation sweep over the whole graph.
pub fn propagate(
    graph: &mut Graph,
    history: &mut History,
    registry: &OperationRegistry,
    observer: &mut dyn EditorObserver,
) -> Result<SweepReport, EngineError> {
    let order: Vec<NodeId> = graph.topological_order()?.collect();
    log::trace!("propagation sweep over {} nodes", order.len());

    let mut sweep = Sweep {
        graph,
        history,
        observer,
        report: SweepReport::default(),
    };
    for id in order {
        let node = sweep.graph.try_node(id)?;
        let changed = match NodeKind::of(node)? {
            NodeKind::BinaryOperation | NodeKind::UnaryOperation => {
                let operation = registry.get(catalog::operation_of(node)?)?;
                sweep.resolve_operation(id, operation)?
            }
            _ => false,
        };
        // Fixed sockets (value outputs, the render origin) only need pruning.
        sweep.prune_inputs(id)?;
        if changed {
            sweep.report.changed.push(id);
            sweep.observer.node_changed(id);
        }
    }

    let report = sweep.report;
    if !report.is_empty() {
        log::debug!(
            "sweep changed {} nodes and pruned {} connections",
            report.changed.len(),
            report.pruned.len()
        );
    }
    Ok(report)
}

struct Sweep<'a> {
    graph: &'a mut Graph,
    history: &'a mut History,
    observer: &'a mut dyn EditorObserver,
    report: SweepReport,
}

impl Sweep<'_> {
    fn resolve_operation(
        &mut self,
        id: NodeId,
        operation: &dyn Operation,
    ) -> Result<bool, EngineError> {
        let names = operation.input_names();
        let defaults = operation.default_inputs();

        let mut sockets = names
            .iter()
            .zip(defaults)
            .map(|(name, default)| self.resolve_input(id, name, *default))
            .collect::<Result<Vec<_>, _>>()?;

        if let [lhs, rhs] = sockets.as_mut_slice() {
            let kind = operation.kind();
            if let Some(map) = operation.lhs_to_rhs() {
                *rhs = narrow(id, names[1], kind, map, *lhs, *rhs, defaults[1])?;
            }
            if let Some(map) = operation.rhs_to_lhs() {
                *lhs = narrow(id, names[0], kind, map, *rhs, *lhs, defaults[0])?;
            }
        }

        let mut changed = false;
        for (name, socket) in names.iter().zip(&sockets) {
            changed |= self.set_socket(id, PortSide::Input, name, *socket)?;
        }
        self.prune_inputs(id)?;
        changed |= self.resolve_output(id, operation, &sockets)?;
        Ok(changed)
    }

    /// Step 1 for one input.
    fn resolve_input(
        &self,
        id: NodeId,
        name: &str,
        default: CompoundSocket,
    ) -> Result<CompoundSocket, EngineError> {
        let Some(connection) = self.graph.input_connection(id, name) else {
            return Ok(default);
        };
        let current = self.graph.port(id, PortSide::Input, name)?.socket;
        // A socket outside the default belongs to the previous operation.
        let base = if current.is_subset(default) {
            current
        } else {
            default
        };
        let connected = self
            .graph
            .port(connection.from_node, PortSide::Output, &connection.from_port)?
            .socket;
        if connected == base {
            return Ok(base);
        }
        Ok(connected.intersection(default).unwrap_or(base))
    }

    /// Step 4.
    fn resolve_output(
        &mut self,
        id: NodeId,
        operation: &dyn Operation,
        inputs: &[CompoundSocket],
    ) -> Result<bool, EngineError> {
        let default = operation.default_output();
        let current = self.graph.port(id, PortSide::Output, RESULT_PORT)?.socket;
        let mut target = if current.is_subset(default) {
            current
        } else {
            default
        };

        if let Some(types) = operation.output_types(inputs)? {
            let invalid = || EngineError::InvalidTypeCombination {
                node: id,
                operation: operation.kind(),
                inputs: inputs.to_vec(),
            };
            if types.contains(SocketType::Invalid) {
                return Err(invalid());
            }
            if types != SocketSet::single(SocketType::Ignore) {
                let types = types.without_markers();
                if types.is_empty() {
                    return Err(invalid());
                }
                target = CompoundSocket::from_set(types)?;
            }
        }

        if !self.set_socket(id, PortSide::Output, RESULT_PORT, target)? {
            return Ok(false);
        }
        let stale: Vec<Connection> = self
            .graph
            .output_connections(id, RESULT_PORT)
            .filter(|c| {
                self.graph
                    .port(c.to_node, PortSide::Input, &c.to_port)
                    .map_or(true, |port| !port.socket.intersects(target))
            })
            .cloned()
            .collect();
        for connection in stale {
            self.prune(connection)?;
        }
        Ok(true)
    }

    /// Disconnects every input of `id` whose producer no longer intersects it.
    fn prune_inputs(&mut self, id: NodeId) -> Result<(), EngineError> {
        let mut stale = Vec::new();
        for port in &self.graph.try_node(id)?.inputs {
            let Some(connection) = self.graph.input_connection(id, &port.name) else {
                continue;
            };
            let producer = self.graph.port(
                connection.from_node,
                PortSide::Output,
                &connection.from_port,
            )?;
            if !producer.socket.intersects(port.socket) {
                stale.push(connection.clone());
            }
        }
        for connection in stale {
            self.prune(connection)?;
        }
        Ok(())
    }

    fn set_socket(
        &mut self,
        id: NodeId,
        side: PortSide,
        name: &str,
        socket: CompoundSocket,
    ) -> Result<bool, EngineError> {
        let old = self.graph.port(id, side, name)?.socket;
        if old == socket {
            return Ok(false);
        }
        log::trace!("node {id}: {side} {name} {old} -> {socket}");
        self.record(Command::SetSocket {
            node: id,
            side,
            port: name.to_string(),
            old,
            new: socket,
        })?;
        Ok(true)
    }

    fn prune(&mut self, connection: Connection) -> Result<(), EngineError> {
        log::debug!(
            "pruning incompatible connection {}:{} -> {}:{}",
            connection.from_node,
            connection.from_port,
            connection.to_node,
            connection.to_port
        );
        self.record(Command::RemoveConnection {
            connection: connection.clone(),
        })?;
        self.observer.node_changed(connection.to_node);
        self.report.pruned.push(connection);
        Ok(())
    }

    fn record(&mut self, command: Command) -> Result<(), EngineError> {
        command.apply(self.graph)?;
        if self.history.add(command) {
            self.report.recorded += 1;
        }
        Ok(())
    }
}

/// Step 2 for one side: the union of what the opposite side allows, unless
/// the current socket already fits inside it.
fn narrow(
    node: NodeId,
    port: &str,
    operation: OperationKind,
    map: CompatibilityMap,
    opposite: CompoundSocket,
    current: CompoundSocket,
    default: CompoundSocket,
) -> Result<CompoundSocket, EngineError> {
    let allowed = map
        .compatible_with(operation, opposite)?
        .intersection(default.types());
    if allowed.is_empty() {
        return Err(EngineError::AmbiguousSockets {
            node,
            port: port.to_string(),
        });
    }
    if current.types().is_subset(allowed) {
        Ok(current)
    } else {
        Ok(CompoundSocket::from_set(allowed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecviz_history::HistoryConfig;

    struct Fixture {
        graph: Graph,
        history: History,
        registry: OperationRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: Graph::new(),
                history: History::new(HistoryConfig::unlimited()),
                registry: OperationRegistry::builtin(),
            }
        }

        fn add(&mut self, kind: NodeKind, operation: Option<OperationKind>) -> NodeId {
            let ports = kind.ports(&self.registry, operation).unwrap();
            let data = kind
                .default_data(&crate::EditorConfig::default(), operation)
                .unwrap();
            self.graph.add_node(kind.as_str(), ports, data)
        }

        fn op(&mut self, operation: OperationKind) -> NodeId {
            let kind = match operation.arity() {
                vecviz_ops::Arity::Binary => NodeKind::BinaryOperation,
                vecviz_ops::Arity::Unary => NodeKind::UnaryOperation,
            };
            self.add(kind, Some(operation))
        }

        fn sweep(&mut self) -> SweepReport {
            propagate(
                &mut self.graph,
                &mut self.history,
                &self.registry,
                &mut crate::NullObserver,
            )
            .unwrap()
        }

        fn socket(&self, node: NodeId, side: PortSide, name: &str) -> CompoundSocket {
            self.graph.port(node, side, name).unwrap().socket
        }

        fn sockets(&self, node: NodeId) -> (CompoundSocket, CompoundSocket, CompoundSocket) {
            (
                self.socket(node, PortSide::Input, "lhs"),
                self.socket(node, PortSide::Input, "rhs"),
                self.socket(node, PortSide::Output, RESULT_PORT),
            )
        }
    }

    #[test]
    fn test_fresh_graph_is_settled() {
        let mut f = Fixture::new();
        for operation in OperationKind::BINARY.into_iter().chain(OperationKind::UNARY) {
            f.op(operation);
        }
        assert!(f.sweep().is_empty());
    }

    #[test]
    fn test_add_syncs_both_sides() {
        let mut f = Fixture::new();
        let vector = f.add(NodeKind::Vector, None);
        let add = f.op(OperationKind::Add);
        f.graph.connect(vector, "value", add, "lhs").unwrap();

        let report = f.sweep();
        assert_eq!(report.changed, vec![add]);
        assert_eq!(
            f.sockets(add),
            (
                CompoundSocket::Vector,
                CompoundSocket::Vector,
                CompoundSocket::Vector
            )
        );
        // lhs, rhs and result.
        assert_eq!(report.recorded, 3);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut f = Fixture::new();
        let matrix = f.add(NodeKind::Matrix, None);
        let multiply = f.op(OperationKind::Multiply);
        let length = f.op(OperationKind::Length);
        f.graph.connect(matrix, "value", multiply, "lhs").unwrap();
        f.graph.connect(multiply, RESULT_PORT, length, "value").unwrap();

        assert!(!f.sweep().is_empty());
        let settled = f.graph.clone();
        assert!(f.sweep().is_empty());
        assert_eq!(f.graph, settled);
    }

    #[test]
    fn test_multiply_cascade_prunes_rhs() {
        let mut f = Fixture::new();
        let a = f.add(NodeKind::Vector, None);
        let b = f.add(NodeKind::Vector, None);
        let multiply = f.op(OperationKind::Multiply);
        f.graph.connect(a, "value", multiply, "lhs").unwrap();
        // vector * vector has no meaning; force the second edge in.
        f.graph.connect_unchecked(b, "value", multiply, "rhs").unwrap();

        let report = f.sweep();
        assert_eq!(report.pruned.len(), 1);
        assert_eq!(report.pruned[0].from_node, b);
        assert!(f.graph.input_connection(multiply, "rhs").is_none());
        assert_eq!(
            f.sockets(multiply),
            (
                CompoundSocket::Vector,
                CompoundSocket::Scalar,
                CompoundSocket::Vector
            )
        );
    }

    #[test]
    fn test_output_change_prunes_downstream() {
        let mut f = Fixture::new();
        let scalar = f.add(NodeKind::Scalar, None);
        let add = f.op(OperationKind::Add);
        let length = f.op(OperationKind::Length);
        f.graph.connect(add, RESULT_PORT, length, "value").unwrap();
        f.graph.connect(scalar, "value", add, "lhs").unwrap();

        let report = f.sweep();
        assert_eq!(f.socket(add, PortSide::Output, RESULT_PORT), CompoundSocket::Scalar);
        assert_eq!(report.pruned.len(), 1);
        assert_eq!(report.pruned[0].to_node, length);
        assert_eq!(f.graph.connection_count(), 1);
    }

    #[test]
    fn test_disconnect_reverts_to_default() {
        let mut f = Fixture::new();
        let scalar = f.add(NodeKind::Scalar, None);
        let add = f.op(OperationKind::Add);
        let id = f.graph.connect(scalar, "value", add, "lhs").unwrap();
        f.sweep();
        assert_eq!(f.sockets(add).2, CompoundSocket::Scalar);

        f.graph.disconnect(id).unwrap();
        f.sweep();
        assert_eq!(
            f.sockets(add),
            (
                CompoundSocket::Anything,
                CompoundSocket::Anything,
                CompoundSocket::Anything
            )
        );
    }

    #[test]
    fn test_operation_switch_resets_sockets() {
        let mut f = Fixture::new();
        let scalar = f.add(NodeKind::Scalar, None);
        let node = f.op(OperationKind::Add);
        f.graph.connect(scalar, "value", node, "lhs").unwrap();
        f.sweep();

        f.graph
            .node_mut(node)
            .unwrap()
            .set_field(catalog::OPERATION_FIELD, Some("dot".into()));
        let report = f.sweep();

        assert_eq!(
            f.sockets(node),
            (
                CompoundSocket::Vector,
                CompoundSocket::Vector,
                CompoundSocket::Scalar
            )
        );
        // A scalar cannot feed a dot product.
        assert_eq!(report.pruned.len(), 1);
        assert_eq!(f.graph.connection_count(), 0);
    }

    #[test]
    fn test_ignore_keeps_output() {
        let mut f = Fixture::new();
        let matrix = f.add(NodeKind::Matrix, None);
        let transpose = f.op(OperationKind::Transpose);
        f.graph.connect(matrix, "value", transpose, "value").unwrap();
        assert!(f.sweep().is_empty());
        assert_eq!(
            f.socket(transpose, PortSide::Output, RESULT_PORT),
            CompoundSocket::Matrix
        );
    }

    #[test]
    fn test_render_port_is_pruned_when_incompatible() {
        let mut f = Fixture::new();
        let scalar = f.add(NodeKind::Scalar, None);
        let vector = f.add(NodeKind::Vector, None);
        f.graph.add_input(vector, catalog::render_port()).unwrap();
        f.graph
            .connect_unchecked(scalar, "value", vector, catalog::RENDER_PORT)
            .unwrap();

        let report = f.sweep();
        assert_eq!(report.pruned.len(), 1);
        assert!(report.changed.is_empty());
    }

    #[test]
    fn test_sockets_never_widen_past_defaults() {
        let mut f = Fixture::new();
        let sources = [
            f.add(NodeKind::Scalar, None),
            f.add(NodeKind::Vector, None),
            f.add(NodeKind::Matrix, None),
        ];
        let mut ops = Vec::new();
        for operation in OperationKind::BINARY {
            let node = f.op(operation);
            for (i, port) in ["lhs", "rhs"].into_iter().enumerate() {
                let source = sources[(ops.len() + i) % sources.len()];
                f.graph.connect_unchecked(source, "value", node, port).unwrap();
            }
            ops.push((node, operation));
        }
        f.sweep();

        for (node, operation) in ops {
            let op = f.registry.get(operation).unwrap();
            for (name, default) in op.input_names().iter().zip(op.default_inputs()) {
                assert!(f.socket(node, PortSide::Input, name).is_subset(*default));
            }
            assert!(f
                .socket(node, PortSide::Output, RESULT_PORT)
                .is_subset(op.default_output()));
        }
        for c in f.graph.connections() {
            let from = f.socket(c.from_node, PortSide::Output, &c.from_port);
            let to = f.socket(c.to_node, PortSide::Input, &c.to_port);
            assert!(from.intersects(to));
        }
    }

    #[test]
    fn test_sweep_rejects_cycles() {
        let mut f = Fixture::new();
        let a = f.op(OperationKind::Add);
        let b = f.op(OperationKind::Add);
        f.graph.connect(a, RESULT_PORT, b, "lhs").unwrap();
        f.graph.connect(b, RESULT_PORT, a, "lhs").unwrap();
        let result = propagate(
            &mut f.graph,
            &mut f.history,
            &f.registry,
            &mut crate::NullObserver,
        );
        assert_eq!(
            result,
            Err(EngineError::Graph(vecviz_core::GraphError::CycleDetected))
        );
    }
}
