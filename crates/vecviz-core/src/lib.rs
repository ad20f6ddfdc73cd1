//! Core types for the VecViz graph engine.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - [`SocketType`], [`SocketSet`], [`CompoundSocket`] - the socket type algebra
//! - [`Value`] - concrete scalars, vectors and matrices
//! - [`Graph`] - id-addressed arena of nodes and connections, with
//!   [`Graph::topological_order`]
//! - [`Node`], [`Port`] - node instances and their ports

mod error;
mod graph;
mod node;
mod socket;
mod value;

pub use error::{GraphError, SocketError, TypeError, ValueError};
pub use glam;
pub use graph::{Connection, ConnectionId, Graph, NodeId, TopoOrder};
pub use node::{Node, NodePorts, Port, PortSide};
pub use socket::{is_compatible, CompoundSocket, SocketSet, SocketType};
pub use value::{matrix_from_rows, matrix_to_rows, Value};
