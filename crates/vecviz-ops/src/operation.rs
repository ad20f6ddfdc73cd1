//! The operation interface and its type tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vecviz_core::{CompoundSocket, NodePorts, SocketSet, SocketType, Value};

use crate::error::OpError;

/// Name of the single output port every operation exposes.
pub const RESULT_PORT: &str = "result";
/// Input port names of binary operations.
pub const BINARY_INPUTS: &[&str] = &["lhs", "rhs"];
/// Input port name of unary operations.
pub const UNARY_INPUTS: &[&str] = &["value"];

/// Number of inputs an operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// One input, named `value`.
    Unary,
    /// Two inputs, named `lhs` and `rhs`.
    Binary,
}

/// Every built-in operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Dot,
    Cross,
    Angle,
    Projection,
    Exponent,
    Length,
    Invert,
    Normalize,
    Transpose,
    Determinant,
}

impl OperationKind {
    /// Operations taking `lhs` and `rhs`.
    pub const BINARY: [OperationKind; 9] = [
        OperationKind::Add,
        OperationKind::Subtract,
        OperationKind::Multiply,
        OperationKind::Divide,
        OperationKind::Dot,
        OperationKind::Cross,
        OperationKind::Angle,
        OperationKind::Projection,
        OperationKind::Exponent,
    ];

    /// Operations taking a single `value`.
    pub const UNARY: [OperationKind; 5] = [
        OperationKind::Length,
        OperationKind::Invert,
        OperationKind::Normalize,
        OperationKind::Transpose,
        OperationKind::Determinant,
    ];

    /// Number of inputs.
    pub fn arity(self) -> Arity {
        if Self::UNARY.contains(&self) {
            Arity::Unary
        } else {
            Arity::Binary
        }
    }

    /// Stable lowercase identifier, as stored in node data.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Subtract => "subtract",
            OperationKind::Multiply => "multiply",
            OperationKind::Divide => "divide",
            OperationKind::Dot => "dot",
            OperationKind::Cross => "cross",
            OperationKind::Angle => "angle",
            OperationKind::Projection => "projection",
            OperationKind::Exponent => "exponent",
            OperationKind::Length => "length",
            OperationKind::Invert => "invert",
            OperationKind::Normalize => "normalize",
            OperationKind::Transpose => "transpose",
            OperationKind::Determinant => "determinant",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::BINARY
            .into_iter()
            .chain(Self::UNARY)
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OpError::UnknownOperation(s.to_string()))
    }
}

/// For each type on one input, the types the other input may carry.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityMap(&'static [(SocketType, SocketSet)]);

impl CompatibilityMap {
    /// Wraps a static table.
    pub const fn new(entries: &'static [(SocketType, SocketSet)]) -> Self {
        Self(entries)
    }

    /// Entry for one type.
    pub fn get(&self, ty: SocketType) -> Option<SocketSet> {
        self.0.iter().find(|(key, _)| *key == ty).map(|(_, set)| *set)
    }

    /// Union of the compatible types over every type in `opposite`.
    pub fn compatible_with(
        &self,
        operation: OperationKind,
        opposite: CompoundSocket,
    ) -> Result<SocketSet, OpError> {
        opposite.iter().try_fold(SocketSet::EMPTY, |acc, ty| {
            self.get(ty)
                .map(|set| acc.union(set))
                .ok_or_else(|| OpError::MissingTypeEntry {
                    operation,
                    types: vec![ty],
                })
        })
    }
}

/// Maps each concrete input combination to the set of output types it yields.
///
/// Entries may contain [`SocketType::Invalid`] (illegal combination) or be
/// exactly [`SocketType::Ignore`] (leave the output socket alone).
#[derive(Debug, Clone, Copy)]
pub enum OutputMap {
    /// Keyed by the single input type.
    Unary(&'static [(SocketType, SocketSet)]),
    /// Keyed by the `(lhs, rhs)` type pair.
    Binary(&'static [((SocketType, SocketType), SocketSet)]),
}

impl OutputMap {
    /// Entry for one concrete combination.
    pub fn lookup(&self, types: &[SocketType]) -> Option<SocketSet> {
        match (self, types) {
            (OutputMap::Unary(entries), [ty]) => entries
                .iter()
                .find(|(key, _)| key == ty)
                .map(|(_, set)| *set),
            (OutputMap::Binary(entries), [lhs, rhs]) => entries
                .iter()
                .find(|(key, _)| *key == (*lhs, *rhs))
                .map(|(_, set)| *set),
            _ => None,
        }
    }

    /// Union of the entries over every concrete combination drawn from the
    /// given input sockets.
    pub fn resolve(
        &self,
        operation: OperationKind,
        inputs: &[CompoundSocket],
    ) -> Result<SocketSet, OpError> {
        self.resolve_where(operation, inputs, |_| true)
    }

    /// Like [`OutputMap::resolve`], but only over the combinations `keep`
    /// accepts.
    pub fn resolve_where(
        &self,
        operation: OperationKind,
        inputs: &[CompoundSocket],
        keep: impl Fn(&[SocketType]) -> bool,
    ) -> Result<SocketSet, OpError> {
        let combos: Vec<Vec<SocketType>> = match inputs {
            [value] => value.iter().map(|ty| vec![ty]).collect(),
            [lhs, rhs] => lhs
                .iter()
                .flat_map(|l| rhs.iter().map(move |r| vec![l, r]))
                .collect(),
            _ => {
                return Err(OpError::MissingTypeEntry {
                    operation,
                    types: Vec::new(),
                })
            }
        };
        combos
            .into_iter()
            .filter(|types| keep(types))
            .try_fold(SocketSet::EMPTY, |acc, types| match self.lookup(&types) {
                Some(set) => Ok(acc.union(set)),
                None => Err(OpError::MissingTypeEntry { operation, types }),
            })
    }
}

/// A math operation usable by an operation node.
///
/// Implemented once per concrete operation and looked up by
/// [`OperationKind`] in an [`OperationRegistry`](crate::OperationRegistry).
pub trait Operation: Send + Sync {
    /// Which operation this is.
    fn kind(&self) -> OperationKind;

    /// Display label of the result.
    fn output_name(&self) -> &'static str;

    /// Default (and widest allowed) socket of each input, in port order.
    fn default_inputs(&self) -> &'static [CompoundSocket];

    /// Default socket of the result.
    fn default_output(&self) -> CompoundSocket;

    /// Input-combination to output-type table; `None` means the output
    /// socket never changes.
    fn output_map(&self) -> Option<OutputMap> {
        None
    }

    /// Types `rhs` may carry for each `lhs` type; `None` means `rhs` is fixed.
    fn lhs_to_rhs(&self) -> Option<CompatibilityMap> {
        None
    }

    /// Types `lhs` may carry for each `rhs` type; `None` means `lhs` is fixed.
    fn rhs_to_lhs(&self) -> Option<CompatibilityMap> {
        None
    }

    /// Computes the result from concrete inputs.
    fn calculate(&self, inputs: &[Value]) -> Result<Value, OpError>;

    /// Number of inputs.
    fn arity(&self) -> Arity {
        self.kind().arity()
    }

    /// Input port names, in order.
    fn input_names(&self) -> &'static [&'static str] {
        match self.arity() {
            Arity::Unary => UNARY_INPUTS,
            Arity::Binary => BINARY_INPUTS,
        }
    }

    /// Port layout with every socket at its default.
    fn setup_sockets(&self) -> NodePorts {
        let ports = self
            .input_names()
            .iter()
            .zip(self.default_inputs())
            .fold(NodePorts::new(), |ports, (name, socket)| {
                ports.input(*name, *socket)
            });
        ports.output(RESULT_PORT, self.default_output())
    }

    /// Returns false for an `(lhs, rhs)` pair the compatibility maps rule out.
    fn accepts_pair(&self, lhs: SocketType, rhs: SocketType) -> bool {
        let allowed = |map: Option<CompatibilityMap>, from: SocketType, to: SocketType| {
            map.map_or(true, |map| map.get(from).is_some_and(|set| set.contains(to)))
        };
        allowed(self.lhs_to_rhs(), lhs, rhs) && allowed(self.rhs_to_lhs(), rhs, lhs)
    }

    /// Expected output types for the given input sockets, or `None` when the
    /// operation declares no output table.
    ///
    /// Binary combinations the compatibility maps rule out are skipped, so
    /// two unresolved `ANYTHING` inputs of `add` yield `ANYTHING` rather than
    /// the invalid mixed-kind entries.
    fn output_types(&self, inputs: &[CompoundSocket]) -> Result<Option<SocketSet>, OpError> {
        self.output_map()
            .map(|map| {
                map.resolve_where(self.kind(), inputs, |types| match types {
                    [lhs, rhs] => self.accepts_pair(*lhs, *rhs),
                    _ => true,
                })
            })
            .transpose()
    }
}

/// Checks arity and input kinds against the operation's declared tables.
///
/// Returns the concrete input kinds on success.
pub(crate) fn check_inputs(
    op: &dyn Operation,
    inputs: &[Value],
) -> Result<Vec<SocketType>, OpError> {
    let types: Vec<SocketType> = inputs.iter().map(Value::socket_type).collect();
    let invalid = || OpError::InvalidInput {
        operation: op.kind(),
        types: types.clone(),
    };
    let defaults = op.default_inputs();
    if types.len() != defaults.len() {
        return Err(invalid());
    }
    if types
        .iter()
        .zip(defaults)
        .any(|(ty, socket)| !socket.contains(*ty))
    {
        return Err(invalid());
    }
    if let Some(map) = op.output_map() {
        match map.lookup(&types) {
            Some(set) if !set.contains(SocketType::Invalid) => {}
            _ => return Err(invalid()),
        }
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in OperationKind::BINARY.into_iter().chain(OperationKind::UNARY) {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
        assert!(matches!(
            "modulo".parse::<OperationKind>(),
            Err(OpError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_arity() {
        assert_eq!(OperationKind::Cross.arity(), Arity::Binary);
        assert_eq!(OperationKind::Determinant.arity(), Arity::Unary);
    }

    #[test]
    fn test_compatibility_union() {
        const MAP: CompatibilityMap = CompatibilityMap::new(&[
            (SocketType::Scalar, SocketSet::of(&[SocketType::Scalar])),
            (SocketType::Vector, SocketSet::of(&[SocketType::Scalar, SocketType::Vector])),
        ]);
        let set = MAP
            .compatible_with(OperationKind::Add, CompoundSocket::ScalarOrVector)
            .unwrap();
        assert_eq!(set, SocketSet::of(&[SocketType::Scalar, SocketType::Vector]));

        let missing = MAP.compatible_with(OperationKind::Add, CompoundSocket::Matrix);
        assert!(matches!(missing, Err(OpError::MissingTypeEntry { .. })));
    }

    #[test]
    fn test_output_map_resolve() {
        use SocketType::*;
        const MAP: OutputMap = OutputMap::Binary(&[
            ((Scalar, Scalar), SocketSet::of(&[Scalar])),
            ((Scalar, Vector), SocketSet::of(&[Vector])),
            ((Vector, Scalar), SocketSet::of(&[Vector])),
            ((Vector, Vector), SocketSet::of(&[Invalid])),
        ]);
        let set = MAP
            .resolve(
                OperationKind::Multiply,
                &[CompoundSocket::Scalar, CompoundSocket::ScalarOrVector],
            )
            .unwrap();
        assert_eq!(set, SocketSet::of(&[Scalar, Vector]));

        let set = MAP
            .resolve(
                OperationKind::Multiply,
                &[CompoundSocket::ScalarOrVector, CompoundSocket::Vector],
            )
            .unwrap();
        assert!(set.contains(Invalid));

        let missing = MAP.resolve(
            OperationKind::Multiply,
            &[CompoundSocket::Matrix, CompoundSocket::Scalar],
        );
        assert!(matches!(missing, Err(OpError::MissingTypeEntry { .. })));
    }
}
