//! Value evaluation in dependency order.

use std::collections::BTreeMap;

use vecviz_core::{Connection, Graph, NodeId, Value};
use vecviz_history::{Command, History};
use vecviz_ops::{OpError, OperationRegistry};

use crate::catalog::{self, NodeKind};
use crate::error::EngineError;
use crate::observer::EditorObserver;

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Value of every node that produced one.
    pub values: BTreeMap<NodeId, Value>,
    /// Calculation warnings by node.
    pub warnings: BTreeMap<NodeId, String>,
    /// Connections removed after calculation errors.
    pub pruned: Vec<Connection>,
    /// Commands the history accepted.
    pub recorded: usize,
}

/// Evaluates every node in topological order.
///
/// Value nodes produce their literal. Operation nodes with every operation
/// input connected to a node that produced a value run their calculation;
/// the others produce nothing. A calculation error becomes a warning and,
/// when `prune` is set, the failing node loses its outgoing connections.
pub fn evaluate(
    graph: &mut Graph,
    history: &mut History,
    registry: &OperationRegistry,
    observer: &mut dyn EditorObserver,
    prune: bool,
) -> Result<Evaluation, EngineError> {
    let order: Vec<NodeId> = graph.topological_order()?.collect();
    let mut evaluation = Evaluation::default();

    for id in order {
        let node = graph.try_node(id)?;
        let kind = NodeKind::of(node)?;
        let result = match kind.value_type() {
            Some(ty) => Ok(Some(catalog::value_of(node, ty)?)),
            None => {
                let operation = registry.get(catalog::operation_of(node)?)?;
                let inputs: Option<Vec<Value>> = operation
                    .input_names()
                    .iter()
                    .map(|name| {
                        graph
                            .input_connection(id, name)
                            .and_then(|c| evaluation.values.get(&c.from_node))
                            .copied()
                    })
                    .collect();
                match inputs {
                    Some(inputs) => operation.calculate(&inputs).map(Some),
                    None => Ok(None),
                }
            }
        };

        match result {
            Ok(value) => {
                if kind.arity().is_some() {
                    observer.set_warning(id, None);
                }
                if let Some(value) = value {
                    observer.value_computed(id, &value);
                    evaluation.values.insert(id, value);
                }
            }
            Err(OpError::Calculation(error)) => {
                log::debug!("node {id}: {error}");
                observer.set_warning(id, Some(error.message.as_str()));
                evaluation.warnings.insert(id, error.message);
                if prune && graph.outgoing(id).next().is_some() {
                    let command = Command::remove_output_connections(graph, id)?;
                    command.apply(graph)?;
                    if let Command::RemoveOutputConnections { connections, .. } = &command {
                        for connection in connections {
                            observer.node_changed(connection.to_node);
                        }
                        evaluation.pruned.extend(connections.iter().cloned());
                    }
                    if history.add(command) {
                        evaluation.recorded += 1;
                    }
                }
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vecviz_core::glam::DVec3;
    use vecviz_history::HistoryConfig;
    use vecviz_ops::{OperationKind, RESULT_PORT};

    #[derive(Default)]
    struct Recorder {
        warnings: Vec<(NodeId, Option<String>)>,
        computed: Vec<NodeId>,
    }

    impl EditorObserver for Recorder {
        fn set_warning(&mut self, node: NodeId, warning: Option<&str>) {
            self.warnings.push((node, warning.map(str::to_string)));
        }

        fn value_computed(&mut self, node: NodeId, _value: &Value) {
            self.computed.push(node);
        }
    }

    fn add_node(graph: &mut Graph, kind: NodeKind, operation: Option<OperationKind>) -> NodeId {
        let registry = OperationRegistry::builtin();
        let config = crate::EditorConfig::default();
        graph.add_node(
            kind.as_str(),
            kind.ports(&registry, operation).unwrap(),
            kind.default_data(&config, operation).unwrap(),
        )
    }

    fn scalar(graph: &mut Graph, value: f64) -> NodeId {
        let id = add_node(graph, NodeKind::Scalar, None);
        graph
            .node_mut(id)
            .unwrap()
            .set_field(catalog::VALUE_FIELD, Some(json!(value)));
        id
    }

    fn run(graph: &mut Graph, observer: &mut Recorder, prune: bool) -> (Evaluation, History) {
        let mut history = History::new(HistoryConfig::unlimited());
        let registry = OperationRegistry::builtin();
        let evaluation = evaluate(graph, &mut history, &registry, observer, prune).unwrap();
        (evaluation, history)
    }

    #[test]
    fn test_values_flow_downstream() {
        let mut graph = Graph::new();
        let a = scalar(&mut graph, 2.0);
        let b = scalar(&mut graph, 3.0);
        let add = add_node(&mut graph, NodeKind::BinaryOperation, None);
        graph.connect(a, "value", add, "lhs").unwrap();
        graph.connect(b, "value", add, "rhs").unwrap();

        let mut observer = Recorder::default();
        let (evaluation, _) = run(&mut graph, &mut observer, true);
        assert_eq!(evaluation.values[&add], Value::Scalar(5.0));
        assert!(evaluation.warnings.is_empty());
        assert_eq!(observer.computed, vec![a, b, add]);
        assert_eq!(observer.warnings, vec![(add, None)]);
    }

    #[test]
    fn test_missing_input_produces_nothing() {
        let mut graph = Graph::new();
        let vector = add_node(&mut graph, NodeKind::Vector, None);
        let length = add_node(&mut graph, NodeKind::UnaryOperation, None);
        let dot = add_node(
            &mut graph,
            NodeKind::BinaryOperation,
            Some(OperationKind::Dot),
        );
        graph.connect(vector, "value", dot, "lhs").unwrap();

        let mut observer = Recorder::default();
        let (evaluation, _) = run(&mut graph, &mut observer, true);
        assert_eq!(evaluation.values.len(), 1);
        assert_eq!(evaluation.values[&vector], Value::Vector(DVec3::ZERO));
        assert!(!evaluation.values.contains_key(&length));
        assert!(!evaluation.values.contains_key(&dot));
    }

    #[test]
    fn test_calculation_error_prunes_outputs() {
        let mut graph = Graph::new();
        let matrix = add_node(&mut graph, NodeKind::Matrix, None);
        let zero = scalar(&mut graph, 0.0);
        let divide = add_node(
            &mut graph,
            NodeKind::BinaryOperation,
            Some(OperationKind::Divide),
        );
        let transpose = add_node(
            &mut graph,
            NodeKind::UnaryOperation,
            Some(OperationKind::Transpose),
        );
        graph.connect(matrix, "value", divide, "lhs").unwrap();
        graph.connect(zero, "value", divide, "rhs").unwrap();
        graph.connect(divide, RESULT_PORT, transpose, "value").unwrap();

        let mut observer = Recorder::default();
        let (evaluation, history) = run(&mut graph, &mut observer, true);
        assert_eq!(evaluation.warnings[&divide], "Division by zero");
        assert_eq!(evaluation.pruned.len(), 1);
        assert_eq!(evaluation.recorded, 1);
        assert_eq!(history.undo_len(), 1);
        assert!(graph.input_connection(transpose, "value").is_none());
        assert!(!evaluation.values.contains_key(&transpose));
        assert!(observer
            .warnings
            .contains(&(divide, Some("Division by zero".to_string()))));
    }

    #[test]
    fn test_calculation_error_without_pruning() {
        let mut graph = Graph::new();
        let matrix = add_node(&mut graph, NodeKind::Matrix, None);
        let zero = scalar(&mut graph, 0.0);
        let divide = add_node(
            &mut graph,
            NodeKind::BinaryOperation,
            Some(OperationKind::Divide),
        );
        let transpose = add_node(
            &mut graph,
            NodeKind::UnaryOperation,
            Some(OperationKind::Transpose),
        );
        graph.connect(matrix, "value", divide, "lhs").unwrap();
        graph.connect(zero, "value", divide, "rhs").unwrap();
        graph.connect(divide, RESULT_PORT, transpose, "value").unwrap();

        let mut observer = Recorder::default();
        let (evaluation, history) = run(&mut graph, &mut observer, false);
        assert!(evaluation.pruned.is_empty());
        assert_eq!(history.undo_len(), 0);
        assert_eq!(graph.connection_count(), 3);
        assert_eq!(evaluation.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_literal_is_fatal() {
        let mut graph = Graph::new();
        let vector = add_node(&mut graph, NodeKind::Vector, None);
        graph
            .node_mut(vector)
            .unwrap()
            .set_field(catalog::VALUE_FIELD, Some(json!([1.0, 2.0])));
        let mut history = History::default();
        let result = evaluate(
            &mut graph,
            &mut history,
            &OperationRegistry::builtin(),
            &mut crate::NullObserver,
            true,
        );
        assert!(matches!(result, Err(EngineError::Value(_))));
    }
}
