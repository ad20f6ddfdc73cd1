//! Lookup table from [`OperationKind`] to its implementation.

use std::collections::BTreeMap;

use crate::binary::{Add, Angle, Cross, Divide, Dot, Exponent, Multiply, Projection, Subtract};
use crate::error::OpError;
use crate::operation::{Operation, OperationKind};
use crate::unary::{Determinant, Invert, Length, Normalize, Transpose};

/// Registry of operations keyed by kind.
pub struct OperationRegistry {
    operations: BTreeMap<OperationKind, Box<dyn Operation>>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Creates a registry holding every built-in operation.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Add);
        registry.register(Subtract);
        registry.register(Multiply);
        registry.register(Divide);
        registry.register(Dot);
        registry.register(Cross);
        registry.register(Angle);
        registry.register(Projection);
        registry.register(Exponent);
        registry.register(Length);
        registry.register(Invert);
        registry.register(Normalize);
        registry.register(Transpose);
        registry.register(Determinant);
        registry
    }

    /// Registers an operation under its own kind, replacing any previous one.
    pub fn register<O: Operation + 'static>(&mut self, operation: O) {
        self.operations.insert(operation.kind(), Box::new(operation));
    }

    /// Looks up an operation.
    pub fn get(&self, kind: OperationKind) -> Result<&dyn Operation, OpError> {
        self.operations
            .get(&kind)
            .map(|op| op.as_ref())
            .ok_or(OpError::NotRegistered(kind))
    }

    /// Iterates registered operations in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Operation> {
        self.operations.values().map(|op| op.as_ref())
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Arity, RESULT_PORT};
    use vecviz_core::{CompoundSocket, SocketType};

    #[test]
    fn test_builtin_has_every_kind() {
        let registry = OperationRegistry::builtin();
        for kind in OperationKind::BINARY.into_iter().chain(OperationKind::UNARY) {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
        assert_eq!(registry.len(), 14);
    }

    #[test]
    fn test_missing_registration() {
        let registry = OperationRegistry::new();
        assert!(matches!(
            registry.get(OperationKind::Add),
            Err(OpError::NotRegistered(OperationKind::Add))
        ));
    }

    #[test]
    fn test_setup_sockets() {
        let registry = OperationRegistry::builtin();
        let ports = registry.get(OperationKind::Divide).unwrap().setup_sockets();
        assert_eq!(ports.inputs.len(), 2);
        assert_eq!(ports.inputs[0].name, "lhs");
        assert_eq!(ports.inputs[1].socket, CompoundSocket::Scalar);
        assert_eq!(ports.outputs[0].name, RESULT_PORT);

        let ports = registry.get(OperationKind::Length).unwrap().setup_sockets();
        assert_eq!(ports.inputs.len(), 1);
        assert_eq!(ports.inputs[0].name, "value");
        assert_eq!(ports.outputs[0].socket, CompoundSocket::Scalar);
    }

    #[test]
    fn test_output_names_are_distinct() {
        let registry = OperationRegistry::builtin();
        let mut names: Vec<&str> = registry.iter().map(|op| op.output_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), registry.len());
    }

    /// Every concrete combination of default input types has a table entry,
    /// and every compatibility map covers the types its side can carry.
    #[test]
    fn test_tables_are_total() {
        let registry = OperationRegistry::builtin();
        for op in registry.iter() {
            let defaults = op.default_inputs();
            assert_eq!(defaults.len(), op.input_names().len());
            assert!(op.output_types(defaults).is_ok(), "{}", op.kind());

            if op.arity() == Arity::Binary {
                if let Some(map) = op.lhs_to_rhs() {
                    let set = map.compatible_with(op.kind(), defaults[0]).unwrap();
                    assert!(set.intersects(defaults[1].types()));
                }
                if let Some(map) = op.rhs_to_lhs() {
                    let set = map.compatible_with(op.kind(), defaults[1]).unwrap();
                    assert!(set.intersects(defaults[0].types()));
                }
            }

            if op.output_map().is_some() {
                let set = op.output_types(defaults).unwrap().unwrap();
                assert!(!set.is_empty());
                assert!(
                    set == vecviz_core::SocketSet::single(SocketType::Ignore)
                        || set.without_markers().is_subset(op.default_output().types()),
                    "{}",
                    op.kind()
                );
            }
        }
    }
}
