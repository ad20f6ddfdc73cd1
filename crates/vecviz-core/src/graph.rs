//! Graph arena and topological ordering.
//!
//! Nodes and connections live in id-keyed maps. Ports refer to each other
//! only through [`Connection`] records, so removing a node or port removes
//! its connections and nothing else holds a dangling link.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::GraphError;
use crate::node::{Node, NodePorts, Port, PortSide};
use crate::socket::CompoundSocket;

/// Unique identifier for a node in a graph.
pub type NodeId = u32;

/// Unique identifier for a connection in a graph.
pub type ConnectionId = u32;

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Stable identifier.
    pub id: ConnectionId,
    /// Source node.
    pub from_node: NodeId,
    /// Output port name on the source node.
    pub from_port: String,
    /// Destination node.
    pub to_node: NodeId,
    /// Input port name on the destination node.
    pub to_port: String,
}

impl Connection {
    /// Returns true if either end is on `node`.
    pub fn involves_node(&self, node: NodeId) -> bool {
        self.from_node == node || self.to_node == node
    }
}

/// A graph of nodes connected by edges.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_node_id: NodeId,
    next_connection_id: ConnectionId,
}

/// Two graphs are equal when their nodes and connections are; id counters
/// are not observable state.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.connections == other.connections
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph and returns its ID.
    pub fn add_node(
        &mut self,
        type_name: impl Into<String>,
        ports: NodePorts,
        data: BTreeMap<String, JsonValue>,
    ) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(id, Node::new(id, type_name, ports, data));
        id
    }

    /// Inserts a node under its own ID (used to restore removed nodes).
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.next_node_id = self.next_node_id.max(node.id.saturating_add(1));
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Removes a node together with every connection touching it.
    ///
    /// Returns the node and the removed connections in id order.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(Node, Vec<Connection>), GraphError> {
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        let ids: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(id))
            .map(|c| c.id)
            .collect();
        let removed = ids
            .into_iter()
            .filter_map(|cid| self.connections.remove(&cid))
            .collect();
        Ok((node, removed))
    }

    /// Returns a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns a node by ID, or a [`GraphError::NodeNotFound`].
    pub fn try_node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Returns a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Iterates nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Looks up a port, failing loudly when it does not exist.
    pub fn port(&self, node: NodeId, side: PortSide, name: &str) -> Result<&Port, GraphError> {
        self.try_node(node)?
            .port(side, name)
            .ok_or_else(|| GraphError::PortNotFound {
                node,
                port: name.to_string(),
            })
    }

    /// Replaces a port's socket, returning the previous one.
    pub fn set_socket(
        &mut self,
        node: NodeId,
        side: PortSide,
        name: &str,
        socket: CompoundSocket,
    ) -> Result<CompoundSocket, GraphError> {
        let port = self
            .node_mut(node)?
            .port_mut(side, name)
            .ok_or_else(|| GraphError::PortNotFound {
                node,
                port: name.to_string(),
            })?;
        Ok(std::mem::replace(&mut port.socket, socket))
    }

    /// Appends a dynamic input port.
    pub fn add_input(&mut self, node: NodeId, port: Port) -> Result<(), GraphError> {
        let target = self.node_mut(node)?;
        if target.input(&port.name).is_some() {
            return Err(GraphError::DuplicatePort {
                node,
                port: port.name,
            });
        }
        target.inputs.push(port);
        Ok(())
    }

    /// Removes an input port and the connection feeding it.
    pub fn remove_input(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<(Port, Option<Connection>), GraphError> {
        let target = self.node_mut(node)?;
        let index = target
            .inputs
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| GraphError::PortNotFound {
                node,
                port: name.to_string(),
            })?;
        let port = target.inputs.remove(index);
        let connection = self
            .input_connection(node, name)
            .map(|c| c.id)
            .and_then(|id| self.connections.remove(&id));
        Ok((port, connection))
    }

    /// Connects an output port to an input port.
    ///
    /// Fails when either port is missing, the input already has a producer,
    /// or the sockets share no value kind.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        let from = self.port(from_node, PortSide::Output, from_port)?.socket;
        let to = self.port(to_node, PortSide::Input, to_port)?.socket;
        if !from.intersects(to) {
            return Err(GraphError::IncompatibleSockets { from, to });
        }
        self.connect_unchecked(from_node, from_port, to_node, to_port)
    }

    /// Connects two ports without comparing their sockets.
    pub fn connect_unchecked(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        let connection = Connection {
            id: self.next_connection_id,
            from_node,
            from_port: from_port.to_string(),
            to_node,
            to_port: to_port.to_string(),
        };
        let id = connection.id;
        self.insert_connection(connection)?;
        Ok(id)
    }

    /// Inserts a connection under its own ID (used to restore removed edges).
    pub fn insert_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        if self.connections.contains_key(&connection.id) {
            return Err(GraphError::DuplicateConnection(connection.id));
        }
        self.port(connection.from_node, PortSide::Output, &connection.from_port)?;
        self.port(connection.to_node, PortSide::Input, &connection.to_port)?;
        if self.input_connection(connection.to_node, &connection.to_port).is_some() {
            return Err(GraphError::InputOccupied {
                node: connection.to_node,
                port: connection.to_port,
            });
        }
        self.next_connection_id = self.next_connection_id.max(connection.id.saturating_add(1));
        self.connections.insert(connection.id, connection);
        Ok(())
    }

    /// Removes a connection.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection, GraphError> {
        self.connections
            .remove(&id)
            .ok_or(GraphError::ConnectionNotFound(id))
    }

    /// Returns a connection by ID.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Iterates connections in ID order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Returns the number of connections in the graph.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The connection feeding an input port, if any.
    pub fn input_connection(&self, node: NodeId, port: &str) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.to_node == node && c.to_port == port)
    }

    /// Connections leaving one output port.
    pub fn output_connections<'a>(
        &'a self,
        node: NodeId,
        port: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .values()
            .filter(move |c| c.from_node == node && c.from_port == port)
    }

    /// Connections leaving any output of a node.
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.values().filter(move |c| c.from_node == node)
    }

    /// Returns true if a path already leads from `to` back to `from`, so that
    /// an edge `from -> to` would close a cycle.
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut stack = vec![to];
        while let Some(node) = stack.pop() {
            if node == from {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.outgoing(node).map(|c| c.to_node));
            }
        }
        false
    }

    /// Computes a topological order using Kahn's algorithm.
    ///
    /// Start nodes are the nodes without connected inputs. Each node keeps a
    /// count of unresolved input edges; a node becomes ready once that count
    /// reaches zero. Ready nodes are visited first-in first-out, seeded in ID
    /// order, so the result is deterministic.
    pub fn topological_order(&self) -> Result<TopoOrder, GraphError> {
        let mut unresolved: BTreeMap<NodeId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        let mut adj: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();

        for c in self.connections.values() {
            adj.entry(c.from_node).or_default().push(c.to_node);
            if let Some(count) = unresolved.get_mut(&c.to_node) {
                *count += 1;
            }
        }

        let mut queue: VecDeque<NodeId> = unresolved
            .iter()
            .filter(|&(_, count)| *count == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for neighbor in adj.get(&node).into_iter().flatten() {
                if let Some(count) = unresolved.get_mut(neighbor) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*neighbor);
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            log::debug!(
                "topological sort left {} of {} nodes unresolved",
                self.nodes.len() - result.len(),
                self.nodes.len()
            );
            return Err(GraphError::CycleDetected);
        }

        Ok(TopoOrder {
            order: result.into_iter(),
        })
    }
}

/// One-shot sequence of node IDs in dependency order.
#[derive(Debug)]
pub struct TopoOrder {
    order: std::vec::IntoIter<NodeId>,
}

impl Iterator for TopoOrder {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.order.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for TopoOrder {}
