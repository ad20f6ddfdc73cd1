//! The editor facade a host drives.
//!
//! Every public mutation is one undoable unit: the user's command is
//! recorded, the graph is re-propagated and re-evaluated, and whatever that
//! changed (socket updates, pruned connections) is squashed into the same
//! history entry.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;
use vecviz_core::{ConnectionId, Graph, GraphError, NodeId, PortSide, TypeError, Value, ValueError};
use vecviz_history::{Command, History};
use vecviz_ops::{Arity, OperationKind, OperationRegistry};

use crate::catalog::{self, NodeKind};
use crate::config::EditorConfig;
use crate::error::EngineError;
use crate::evaluate::{self, Evaluation};
use crate::observer::{EditorObserver, NullObserver};
use crate::propagate::{self, SweepReport};

/// Owns a graph, its history and its last evaluation.
pub struct Editor<O: EditorObserver = NullObserver> {
    graph: Graph,
    history: History,
    registry: OperationRegistry,
    config: EditorConfig,
    observer: O,
    values: BTreeMap<NodeId, Value>,
    warnings: BTreeMap<NodeId, String>,
}

impl Editor<NullObserver> {
    /// Creates an editor without a host observer.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_observer(config, NullObserver)
    }
}

impl Default for Editor<NullObserver> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl<O: EditorObserver> Editor<O> {
    /// Creates an editor reporting to `observer`.
    pub fn with_observer(config: EditorConfig, observer: O) -> Self {
        Self {
            graph: Graph::new(),
            history: History::new(config.history.clone()),
            registry: OperationRegistry::builtin(),
            config,
            observer,
            values: BTreeMap::new(),
            warnings: BTreeMap::new(),
        }
    }

    /// Replaces the operation table.
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The undo log.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The operation table.
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The host observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The host observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Last computed value of a node.
    pub fn value(&self, node: NodeId) -> Option<&Value> {
        self.values.get(&node)
    }

    /// Every value of the last evaluation.
    pub fn values(&self) -> &BTreeMap<NodeId, Value> {
        &self.values
    }

    /// Calculation warning of a node, if its last calculation failed.
    pub fn warning(&self, node: NodeId) -> Option<&str> {
        self.warnings.get(&node).map(String::as_str)
    }

    /// Returns true if undo is possible.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns true if redo is possible.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Adds a node of `kind` with its default data.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, EngineError> {
        self.create_node(kind, None)
    }

    /// Adds an operation node running `operation`.
    pub fn add_operation_node(&mut self, operation: OperationKind) -> Result<NodeId, EngineError> {
        let kind = match operation.arity() {
            Arity::Binary => NodeKind::BinaryOperation,
            Arity::Unary => NodeKind::UnaryOperation,
        };
        self.create_node(kind, Some(operation))
    }

    fn create_node(
        &mut self,
        kind: NodeKind,
        operation: Option<OperationKind>,
    ) -> Result<NodeId, EngineError> {
        let ports = kind.ports(&self.registry, operation)?;
        let data = kind.default_data(&self.config, operation)?;
        let id = self.graph.add_node(kind.as_str(), ports, data);
        let node = self.graph.try_node(id)?.clone();
        self.performed(Command::AddNode { node })?;
        Ok(id)
    }

    /// Removes a node and its connections.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), EngineError> {
        let command = Command::remove_node(&self.graph, node)?;
        self.perform(command)
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connects an output to an input.
    ///
    /// A connection already feeding the input is replaced. Fails when the
    /// sockets share no value kind or the edge would close a cycle.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, EngineError> {
        self.connect_ports(from_node, from_port, to_node, to_port, true)
    }

    /// Connects without comparing sockets; the following sweep prunes the
    /// edge if the types cannot agree.
    pub fn connect_unchecked(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, EngineError> {
        self.connect_ports(from_node, from_port, to_node, to_port, false)
    }

    fn connect_ports(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
        check_sockets: bool,
    ) -> Result<ConnectionId, EngineError> {
        let from = self.graph.port(from_node, PortSide::Output, from_port)?.socket;
        let to = self.graph.port(to_node, PortSide::Input, to_port)?.socket;
        if self.graph.would_create_cycle(from_node, to_node) {
            return Err(GraphError::WouldCreateCycle {
                from: from_node,
                to: to_node,
            }
            .into());
        }
        if check_sockets && !from.intersects(to) {
            return Err(GraphError::IncompatibleSockets { from, to }.into());
        }

        let replaced = match self.graph.input_connection(to_node, to_port).map(|c| c.id) {
            Some(existing) => Some(self.graph.disconnect(existing)?),
            None => None,
        };
        let id = self
            .graph
            .connect_unchecked(from_node, from_port, to_node, to_port)?;
        let connection = self
            .graph
            .connection(id)
            .cloned()
            .ok_or(GraphError::ConnectionNotFound(id))?;

        let add = Command::AddConnection { connection };
        let command = match replaced {
            Some(old) => {
                let description = add.description();
                Command::batch(
                    vec![Command::RemoveConnection { connection: old }, add],
                    Some(description),
                )
            }
            None => add,
        };
        self.performed(command)?;
        Ok(id)
    }

    /// Removes a connection.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Result<(), EngineError> {
        let command = Command::remove_connection(&self.graph, connection)?;
        self.perform(command)
    }

    /// Removes every connection leaving `node`.
    pub fn remove_output_connections(&mut self, node: NodeId) -> Result<(), EngineError> {
        let command = Command::remove_output_connections(&self.graph, node)?;
        if let Command::RemoveOutputConnections { connections, .. } = &command {
            if connections.is_empty() {
                return Ok(());
            }
        }
        self.perform(command)
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Writes a field of a node's data bag.
    pub fn set_field(
        &mut self,
        node: NodeId,
        field: &str,
        value: JsonValue,
    ) -> Result<(), EngineError> {
        let command = Command::set_field(&self.graph, node, field, Some(value))?;
        if let Command::SetField { old, new, .. } = &command {
            if old == new {
                return Ok(());
            }
        }
        self.perform(command)
    }

    /// Sets the literal of a value node.
    pub fn set_value(&mut self, node: NodeId, value: Value) -> Result<(), EngineError> {
        let kind = NodeKind::of(self.graph.try_node(node)?)?;
        let expected = kind.value_type().ok_or(EngineError::NotAValue(node))?;
        if value.socket_type() != expected {
            let error = TypeError::expected(expected, value.socket_type());
            return Err(ValueError::from(error).into());
        }
        self.set_field(node, catalog::VALUE_FIELD, value.to_json())
    }

    /// Switches the operation of an operation node.
    pub fn set_operation(
        &mut self,
        node: NodeId,
        operation: OperationKind,
    ) -> Result<(), EngineError> {
        let kind = NodeKind::of(self.graph.try_node(node)?)?;
        let arity = kind.arity().ok_or(EngineError::NotAnOperation(node))?;
        if arity != operation.arity() {
            return Err(EngineError::ArityMismatch { node, operation });
        }
        self.set_field(node, catalog::OPERATION_FIELD, operation.as_str().into())
    }

    /// Adds or removes the render origin input of a node.
    pub fn set_advanced_render(&mut self, node: NodeId, enabled: bool) -> Result<(), EngineError> {
        let target = self.graph.try_node(node)?;
        if !NodeKind::of(target)?.supports_advanced_render() {
            return Err(EngineError::AdvancedRenderUnsupported(node));
        }
        if target.input(catalog::RENDER_PORT).is_some() == enabled {
            return Ok(());
        }

        let port = if enabled {
            Command::AddRenderPort {
                node,
                port: catalog::render_port(),
            }
        } else {
            Command::remove_render_port(&self.graph, node, catalog::RENDER_PORT)?
        };
        let flag = Command::set_field(
            &self.graph,
            node,
            catalog::ADVANCED_RENDER_FIELD,
            Some(JsonValue::Bool(enabled)),
        )?;
        let description = port.description();
        self.perform(Command::batch(vec![port, flag], Some(description)))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Undoes the last action. Returns false when there is none.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(touched) = self.history.peek_undo().map(Command::touched_nodes) else {
            return Ok(false);
        };
        self.history.undo(&mut self.graph)?;
        self.refresh(touched)?;
        Ok(true)
    }

    /// Redoes the last undone action. Returns false when there is none.
    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(touched) = self.history.peek_redo().map(Command::touched_nodes) else {
            return Ok(false);
        };
        self.history.redo(&mut self.graph)?;
        self.refresh(touched)?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Propagation and evaluation
    // ------------------------------------------------------------------

    /// Runs one propagation sweep, recording its changes as one entry.
    pub fn propagate(&mut self) -> Result<SweepReport, EngineError> {
        self.action(|editor| {
            let report = propagate::propagate(
                &mut editor.graph,
                &mut editor.history,
                &editor.registry,
                &mut editor.observer,
            )?;
            let recorded = report.recorded;
            Ok((report, recorded))
        })
    }

    /// Propagates and evaluates until no calculation error prunes anything.
    pub fn evaluate(&mut self) -> Result<(), EngineError> {
        self.action(|editor| Ok(((), editor.settle()?)))
    }

    /// Performs `command`, then settles the graph.
    fn perform(&mut self, command: Command) -> Result<(), EngineError> {
        log::debug!("{}", command.description());
        self.action(|editor| {
            let recorded = editor.history.add_and_do(command, &mut editor.graph)?;
            Ok(((), usize::from(recorded) + editor.settle()?))
        })
    }

    /// Records an already performed `command`, then settles the graph.
    fn performed(&mut self, command: Command) -> Result<(), EngineError> {
        log::debug!("{}", command.description());
        self.action(|editor| {
            let recorded = editor.history.add(command);
            Ok(((), usize::from(recorded) + editor.settle()?))
        })
    }

    /// Runs `run` as one history entry.
    ///
    /// `run` returns how many entries it recorded; they are squashed before
    /// the history limit applies.
    fn action<T>(
        &mut self,
        run: impl FnOnce(&mut Self) -> Result<(T, usize), EngineError>,
    ) -> Result<T, EngineError> {
        self.history.begin_group();
        let result = run(self).and_then(|(value, recorded)| {
            self.history.squash_top_actions(recorded)?;
            Ok(value)
        });
        self.history.end_group();
        result
    }

    fn settle(&mut self) -> Result<usize, EngineError> {
        let (recorded, evaluation) = settle(
            &mut self.graph,
            &mut self.history,
            &self.registry,
            &mut self.observer,
            self.config.prune_on_calculation_error,
        )?;
        self.store(evaluation);
        Ok(recorded)
    }

    /// Re-evaluates after undo or redo without recording anything, then
    /// reports the nodes the reverted or reapplied entry touched.
    fn refresh(&mut self, touched: BTreeSet<NodeId>) -> Result<(), EngineError> {
        let evaluation = {
            let mut history = self.history.suppress();
            settle(
                &mut self.graph,
                &mut history,
                &self.registry,
                &mut self.observer,
                false,
            )?
            .1
        };
        self.store(evaluation);
        for node in touched {
            if self.graph.node(node).is_some() {
                self.observer.node_changed(node);
            }
        }
        Ok(())
    }

    fn store(&mut self, evaluation: Evaluation) {
        self.values = evaluation.values;
        self.warnings = evaluation.warnings;
    }
}

/// Sweeps and evaluates until evaluation prunes nothing more.
///
/// Returns the number of commands recorded and the final evaluation.
fn settle(
    graph: &mut Graph,
    history: &mut History,
    registry: &OperationRegistry,
    observer: &mut dyn EditorObserver,
    prune_on_error: bool,
) -> Result<(usize, Evaluation), EngineError> {
    let mut recorded = 0;
    loop {
        recorded += propagate::propagate(graph, history, registry, observer)?.recorded;
        let prune = prune_on_error && history.is_enabled();
        let evaluation = evaluate::evaluate(graph, history, registry, observer, prune)?;
        recorded += evaluation.recorded;
        if evaluation.pruned.is_empty() {
            return Ok((recorded, evaluation));
        }
    }
}
