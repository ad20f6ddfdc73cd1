//! Reversible graph mutations.
//!
//! Each [`Command`] captures enough state to perform and to reverse one
//! mutation. Removal commands are built from the live graph with the
//! constructors below so they carry everything needed to restore it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use vecviz_core::{
    CompoundSocket, Connection, ConnectionId, Graph, Node, NodeId, Port, PortSide,
};

use crate::error::HistoryError;

/// Commands that modify a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Change a persisted field value.
    SetField {
        /// Node ID.
        node: NodeId,
        /// Field name.
        field: String,
        /// Previous value (for inverse); `None` when absent.
        old: Option<JsonValue>,
        /// New value; `None` clears the field.
        new: Option<JsonValue>,
    },

    /// Add a node.
    AddNode {
        /// The node, including its ID.
        node: Node,
    },

    /// Remove a node (and its connections).
    RemoveNode {
        /// Captured node (for inverse).
        node: Node,
        /// Captured connections touching the node (for inverse).
        connections: Vec<Connection>,
    },

    /// Connect two ports.
    AddConnection {
        /// Connection to add.
        connection: Connection,
    },

    /// Disconnect two ports.
    RemoveConnection {
        /// Connection to remove.
        connection: Connection,
    },

    /// Remove every connection leaving a node.
    RemoveOutputConnections {
        /// Node ID.
        node: NodeId,
        /// Captured connections (for inverse).
        connections: Vec<Connection>,
    },

    /// Add the dynamic render input to a node.
    AddRenderPort {
        /// Node ID.
        node: NodeId,
        /// Port to add.
        port: Port,
    },

    /// Remove the dynamic render input and the connection feeding it.
    RemoveRenderPort {
        /// Node ID.
        node: NodeId,
        /// Captured port (for inverse).
        port: Port,
        /// Captured connection (for inverse).
        connection: Option<Connection>,
    },

    /// Change the socket of a port.
    SetSocket {
        /// Node ID.
        node: NodeId,
        /// Side of the port.
        side: PortSide,
        /// Port name.
        port: String,
        /// Previous socket (for inverse).
        old: CompoundSocket,
        /// New socket.
        new: CompoundSocket,
    },

    /// Multiple commands as a single atomic operation.
    Batch {
        /// Commands in application order.
        commands: Vec<Command>,
        /// Human-readable description of the batch.
        description: Option<String>,
    },
}

impl Command {
    /// Creates a SetField command, capturing the current value.
    pub fn set_field(
        graph: &Graph,
        node: NodeId,
        field: impl Into<String>,
        new: Option<JsonValue>,
    ) -> Result<Self, HistoryError> {
        let field = field.into();
        let old = graph.try_node(node)?.field(&field).cloned();
        Ok(Self::SetField {
            node,
            field,
            old,
            new,
        })
    }

    /// Creates a RemoveNode command, capturing the node and its connections.
    pub fn remove_node(graph: &Graph, id: NodeId) -> Result<Self, HistoryError> {
        let node = graph.try_node(id)?.clone();
        let connections = graph
            .connections()
            .filter(|c| c.involves_node(id))
            .cloned()
            .collect();
        Ok(Self::RemoveNode { node, connections })
    }

    /// Creates a RemoveConnection command, capturing the connection.
    pub fn remove_connection(graph: &Graph, id: ConnectionId) -> Result<Self, HistoryError> {
        let connection = graph
            .connection(id)
            .cloned()
            .ok_or(vecviz_core::GraphError::ConnectionNotFound(id))?;
        Ok(Self::RemoveConnection { connection })
    }

    /// Creates a RemoveOutputConnections command for every edge leaving `node`.
    pub fn remove_output_connections(graph: &Graph, node: NodeId) -> Result<Self, HistoryError> {
        graph.try_node(node)?;
        let connections = graph.outgoing(node).cloned().collect();
        Ok(Self::RemoveOutputConnections { node, connections })
    }

    /// Creates a RemoveRenderPort command, capturing the port and its connection.
    pub fn remove_render_port(
        graph: &Graph,
        node: NodeId,
        port: &str,
    ) -> Result<Self, HistoryError> {
        let captured = graph.port(node, PortSide::Input, port)?.clone();
        let connection = graph.input_connection(node, port).cloned();
        Ok(Self::RemoveRenderPort {
            node,
            port: captured,
            connection,
        })
    }

    /// Creates a Batch command.
    pub fn batch(commands: Vec<Command>, description: Option<String>) -> Self {
        Self::Batch {
            commands,
            description,
        }
    }

    /// Computes the inverse of this command (for undo).
    pub fn inverse(&self) -> Self {
        match self {
            Command::SetField {
                node,
                field,
                old,
                new,
            } => Command::SetField {
                node: *node,
                field: field.clone(),
                old: new.clone(),
                new: old.clone(),
            },

            Command::AddNode { node } => Command::RemoveNode {
                node: node.clone(),
                connections: Vec::new(),
            },

            Command::RemoveNode { node, connections } => {
                // Add the node back, then reconnect
                let mut commands = vec![Command::AddNode { node: node.clone() }];
                commands.extend(connections.iter().map(|c| Command::AddConnection {
                    connection: c.clone(),
                }));
                Command::batch(commands, Some("Restore node".to_string()))
            }

            Command::AddConnection { connection } => Command::RemoveConnection {
                connection: connection.clone(),
            },

            Command::RemoveConnection { connection } => Command::AddConnection {
                connection: connection.clone(),
            },

            Command::RemoveOutputConnections { connections, .. } => Command::batch(
                connections
                    .iter()
                    .map(|c| Command::AddConnection {
                        connection: c.clone(),
                    })
                    .collect(),
                Some("Restore output connections".to_string()),
            ),

            Command::AddRenderPort { node, port } => Command::RemoveRenderPort {
                node: *node,
                port: port.clone(),
                connection: None,
            },

            Command::RemoveRenderPort {
                node,
                port,
                connection,
            } => {
                let mut commands = vec![Command::AddRenderPort {
                    node: *node,
                    port: port.clone(),
                }];
                if let Some(connection) = connection {
                    commands.push(Command::AddConnection {
                        connection: connection.clone(),
                    });
                }
                Command::batch(commands, Some("Restore render port".to_string()))
            }

            Command::SetSocket {
                node,
                side,
                port,
                old,
                new,
            } => Command::SetSocket {
                node: *node,
                side: *side,
                port: port.clone(),
                old: *new,
                new: *old,
            },

            Command::Batch {
                commands,
                description,
            } => {
                // Inverse of batch is reversed order of inverse commands
                let inverse = commands.iter().rev().map(Command::inverse).collect();
                Command::batch(inverse, description.clone().map(|d| format!("Undo: {d}")))
            }
        }
    }

    /// Performs this command on a graph.
    pub fn apply(&self, graph: &mut Graph) -> Result<(), HistoryError> {
        match self {
            Command::SetField {
                node, field, new, ..
            } => {
                graph.node_mut(*node)?.set_field(field, new.clone());
            }

            Command::AddNode { node } => {
                graph.insert_node(node.clone())?;
            }

            Command::RemoveNode { node, .. } => {
                graph.remove_node(node.id)?;
            }

            Command::AddConnection { connection } => {
                graph.insert_connection(connection.clone())?;
            }

            Command::RemoveConnection { connection } => {
                graph.disconnect(connection.id)?;
            }

            Command::RemoveOutputConnections { connections, .. } => {
                for connection in connections {
                    graph.disconnect(connection.id)?;
                }
            }

            Command::AddRenderPort { node, port } => {
                graph.add_input(*node, port.clone())?;
            }

            Command::RemoveRenderPort { node, port, .. } => {
                graph.remove_input(*node, &port.name)?;
            }

            Command::SetSocket {
                node,
                side,
                port,
                old,
                new,
            } => {
                let current = graph.port(*node, *side, port)?.socket;
                if current != *old {
                    return Err(HistoryError::InvalidCommand(format!(
                        "{side} {port} of node {node} is {current}, expected {old}"
                    )));
                }
                graph.set_socket(*node, *side, port, *new)?;
            }

            Command::Batch { commands, .. } => {
                for (applied, command) in commands.iter().enumerate() {
                    if let Err(error) = command.apply(graph) {
                        // Leave the graph as it was before the batch.
                        for done in commands[..applied].iter().rev() {
                            if let Err(rollback) = done.revert(graph) {
                                log::warn!("batch rollback failed: {rollback}");
                            }
                        }
                        return Err(error);
                    }
                }
            }
        }
        Ok(())
    }

    /// Reverses this command on a graph.
    pub fn revert(&self, graph: &mut Graph) -> Result<(), HistoryError> {
        self.inverse().apply(graph)
    }

    /// Nodes whose ports, fields or input connections this command changes.
    ///
    /// A connection change counts for the node it feeds.
    pub fn touched_nodes(&self) -> BTreeSet<NodeId> {
        let mut nodes = BTreeSet::new();
        self.collect_nodes(&mut nodes);
        nodes
    }

    fn collect_nodes(&self, nodes: &mut BTreeSet<NodeId>) {
        match self {
            Command::SetField { node, .. }
            | Command::AddRenderPort { node, .. }
            | Command::SetSocket { node, .. } => {
                nodes.insert(*node);
            }
            Command::RemoveRenderPort {
                node, connection, ..
            } => {
                nodes.insert(*node);
                nodes.extend(connection.iter().map(|c| c.to_node));
            }
            Command::AddNode { node } => {
                nodes.insert(node.id);
            }
            Command::RemoveNode { node, connections } => {
                nodes.insert(node.id);
                nodes.extend(connections.iter().map(|c| c.to_node));
            }
            Command::AddConnection { connection } | Command::RemoveConnection { connection } => {
                nodes.insert(connection.to_node);
            }
            Command::RemoveOutputConnections { connections, .. } => {
                nodes.extend(connections.iter().map(|c| c.to_node));
            }
            Command::Batch { commands, .. } => {
                for command in commands {
                    command.collect_nodes(nodes);
                }
            }
        }
    }

    /// Returns a human-readable description of this command.
    pub fn description(&self) -> String {
        match self {
            Command::SetField { node, field, .. } => {
                format!("Set {field} of node {node}")
            }
            Command::AddNode { node } => format!("Add node {} ({})", node.id, node.type_name),
            Command::RemoveNode { node, .. } => {
                format!("Remove node {} ({})", node.id, node.type_name)
            }
            Command::AddConnection { connection: c } => format!(
                "Connect {}:{} -> {}:{}",
                c.from_node, c.from_port, c.to_node, c.to_port
            ),
            Command::RemoveConnection { connection: c } => format!(
                "Disconnect {}:{} -> {}:{}",
                c.from_node, c.from_port, c.to_node, c.to_port
            ),
            Command::RemoveOutputConnections { node, connections } => format!(
                "Remove {} output connections of node {node}",
                connections.len()
            ),
            Command::AddRenderPort { node, port } => {
                format!("Add render port {} to node {node}", port.name)
            }
            Command::RemoveRenderPort { node, port, .. } => {
                format!("Remove render port {} from node {node}", port.name)
            }
            Command::SetSocket {
                node,
                side,
                port,
                new,
                ..
            } => format!("Set {side} {port} of node {node} to {new}"),
            Command::Batch {
                description,
                commands,
            } => description
                .clone()
                .unwrap_or_else(|| format!("Batch of {} commands", commands.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use vecviz_core::NodePorts;

    fn test_graph() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let ports = || {
            NodePorts::new()
                .input("in", CompoundSocket::Anything)
                .output("out", CompoundSocket::Anything)
        };
        let a = graph.add_node("Test", ports(), BTreeMap::new());
        let b = graph.add_node("Test", ports(), BTreeMap::new());
        (graph, a, b)
    }

    #[test]
    fn test_set_field_round_trip() {
        let (mut graph, a, _) = test_graph();
        let before = graph.clone();

        let command = Command::set_field(&graph, a, "value", Some(json!(3.0))).unwrap();
        command.apply(&mut graph).unwrap();
        assert_eq!(graph.node(a).unwrap().field("value"), Some(&json!(3.0)));

        command.revert(&mut graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_remove_node_restores_connections() {
        let (mut graph, a, b) = test_graph();
        graph.connect(a, "out", b, "in").unwrap();
        let before = graph.clone();

        let command = Command::remove_node(&graph, b).unwrap();
        command.apply(&mut graph).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.connection_count(), 0);

        command.revert(&mut graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_remove_output_connections() {
        let (mut graph, a, b) = test_graph();
        let c = graph.add_node(
            "Test",
            NodePorts::new().input("in", CompoundSocket::Anything),
            BTreeMap::new(),
        );
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(a, "out", c, "in").unwrap();
        let before = graph.clone();

        let command = Command::remove_output_connections(&graph, a).unwrap();
        command.apply(&mut graph).unwrap();
        assert_eq!(graph.connection_count(), 0);

        command.revert(&mut graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_render_port_bundle() {
        let (mut graph, a, b) = test_graph();
        let add = Command::AddRenderPort {
            node: b,
            port: Port::new("origin", CompoundSocket::Vector),
        };
        add.apply(&mut graph).unwrap();
        graph.connect(a, "out", b, "origin").unwrap();
        let before = graph.clone();

        let remove = Command::remove_render_port(&graph, b, "origin").unwrap();
        remove.apply(&mut graph).unwrap();
        assert!(graph.node(b).unwrap().input("origin").is_none());
        assert_eq!(graph.connection_count(), 0);

        remove.revert(&mut graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_set_socket_checks_previous_value() {
        let (mut graph, a, _) = test_graph();
        let command = Command::SetSocket {
            node: a,
            side: PortSide::Output,
            port: "out".to_string(),
            old: CompoundSocket::Anything,
            new: CompoundSocket::Vector,
        };
        command.apply(&mut graph).unwrap();
        assert_eq!(
            graph.port(a, PortSide::Output, "out").unwrap().socket,
            CompoundSocket::Vector
        );
        // Applying again no longer matches the recorded previous socket.
        assert!(matches!(
            command.apply(&mut graph),
            Err(HistoryError::InvalidCommand(_))
        ));
        command.revert(&mut graph).unwrap();
        assert_eq!(
            graph.port(a, PortSide::Output, "out").unwrap().socket,
            CompoundSocket::Anything
        );
    }

    #[test]
    fn test_batch_inverse_reverses_order() {
        let (mut graph, a, b) = test_graph();
        let before = graph.clone();
        let connection = Connection {
            id: 7,
            from_node: a,
            from_port: "out".to_string(),
            to_node: b,
            to_port: "in".to_string(),
        };
        let batch = Command::batch(
            vec![
                Command::AddConnection {
                    connection: connection.clone(),
                },
                Command::SetSocket {
                    node: b,
                    side: PortSide::Input,
                    port: "in".to_string(),
                    old: CompoundSocket::Anything,
                    new: CompoundSocket::Scalar,
                },
            ],
            Some("Connect".to_string()),
        );
        batch.apply(&mut graph).unwrap();
        assert_eq!(graph.connection(7), Some(&connection));

        match batch.inverse() {
            Command::Batch {
                commands,
                description,
            } => {
                assert!(matches!(commands[0], Command::SetSocket { .. }));
                assert!(matches!(commands[1], Command::RemoveConnection { .. }));
                assert_eq!(description.as_deref(), Some("Undo: Connect"));
            }
            other => panic!("expected batch, got {other:?}"),
        }

        batch.revert(&mut graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_failed_batch_leaves_graph_untouched() {
        let (mut graph, a, b) = test_graph();
        let before = graph.clone();
        let batch = Command::batch(
            vec![
                Command::set_field(&graph, a, "value", Some(json!(1.0))).unwrap(),
                Command::SetSocket {
                    node: b,
                    side: PortSide::Input,
                    port: "in".to_string(),
                    old: CompoundSocket::Anything,
                    new: CompoundSocket::Scalar,
                },
                // Recorded against a socket the port no longer has.
                Command::SetSocket {
                    node: a,
                    side: PortSide::Output,
                    port: "out".to_string(),
                    old: CompoundSocket::Matrix,
                    new: CompoundSocket::Scalar,
                },
            ],
            None,
        );
        assert!(matches!(
            batch.apply(&mut graph),
            Err(HistoryError::InvalidCommand(_))
        ));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_touched_nodes() {
        let (mut graph, a, b) = test_graph();
        let id = graph.connect(a, "out", b, "in").unwrap();
        let batch = Command::batch(
            vec![
                Command::remove_connection(&graph, id).unwrap(),
                Command::SetSocket {
                    node: a,
                    side: PortSide::Output,
                    port: "out".to_string(),
                    old: CompoundSocket::Anything,
                    new: CompoundSocket::Vector,
                },
            ],
            None,
        );
        assert_eq!(batch.touched_nodes().into_iter().collect::<Vec<_>>(), vec![a, b]);

        let removal = Command::remove_output_connections(&graph, a).unwrap();
        assert_eq!(removal.touched_nodes().into_iter().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_command_description() {
        let (graph, a, _) = test_graph();
        let command = Command::remove_node(&graph, a).unwrap();
        assert!(command.description().contains("Remove node"));
        assert!(command.description().contains("Test"));
    }

    #[test]
    fn test_command_serializes() {
        let (graph, a, _) = test_graph();
        let command = Command::set_field(&graph, a, "value", Some(json!([1, 2, 3]))).unwrap();
        let text = serde_json::to_string(&command).unwrap();
        let back: Command = serde_json::from_str(&text).unwrap();
        assert_eq!(back, command);
    }
}
