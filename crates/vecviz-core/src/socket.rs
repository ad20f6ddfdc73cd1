//! Socket type algebra.
//!
//! Every port carries a [`CompoundSocket`]: the set of primitive value kinds
//! ([`SocketType`]) it currently accepts. Only the seven canonical unions of
//! scalar, vector and matrix are legal port types. Operation tables work on
//! plain [`SocketSet`]s, which may additionally hold the [`SocketType::Invalid`]
//! and [`SocketType::Ignore`] markers.
//!
//! # Example
//!
//! ```
//! use vecviz_core::{CompoundSocket, SocketSet, SocketType};
//!
//! let set = SocketSet::of(&[SocketType::Scalar, SocketType::Vector]);
//! let socket = CompoundSocket::from_set(set).unwrap();
//! assert_eq!(socket, CompoundSocket::ScalarOrVector);
//! assert!(socket.intersects(CompoundSocket::Vector));
//! assert!(!socket.intersects(CompoundSocket::Matrix));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SocketError;

/// A primitive value kind, or one of the two table markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    /// A single number.
    Scalar,
    /// A 3-component vector.
    Vector,
    /// A 4x4 matrix.
    Matrix,
    /// Marks an illegal input combination in an operation table.
    Invalid,
    /// Marks "leave the output socket as it is" in an operation table.
    Ignore,
}

impl SocketType {
    /// The three value kinds that can flow through a connection.
    pub const PRIMITIVES: [SocketType; 3] =
        [SocketType::Scalar, SocketType::Vector, SocketType::Matrix];

    /// Returns true for [`SocketType::Invalid`] and [`SocketType::Ignore`].
    pub fn is_marker(self) -> bool {
        matches!(self, SocketType::Invalid | SocketType::Ignore)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Lowercase name, as used in persisted data.
    pub fn as_str(self) -> &'static str {
        match self {
            SocketType::Scalar => "scalar",
            SocketType::Vector => "vector",
            SocketType::Matrix => "matrix",
            SocketType::Invalid => "invalid",
            SocketType::Ignore => "ignore",
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain set of [`SocketType`]s.
///
/// All operations are pure and follow ordinary set semantics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SocketSet(u8);

impl SocketSet {
    /// The empty set.
    pub const EMPTY: SocketSet = SocketSet(0);

    /// Builds a set from a list of types.
    pub const fn of(types: &[SocketType]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }
        SocketSet(bits)
    }

    /// A set holding a single type.
    pub const fn single(ty: SocketType) -> Self {
        SocketSet(ty.bit())
    }

    /// Adds a type to the set.
    pub fn insert(&mut self, ty: SocketType) {
        self.0 |= ty.bit();
    }

    /// Returns true if `ty` is a member.
    pub fn contains(self, ty: SocketType) -> bool {
        self.0 & ty.bit() != 0
    }

    /// Returns true if the set has no members.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of members.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Set union.
    pub fn union(self, other: SocketSet) -> SocketSet {
        SocketSet(self.0 | other.0)
    }

    /// Set intersection.
    pub fn intersection(self, other: SocketSet) -> SocketSet {
        SocketSet(self.0 & other.0)
    }

    /// Returns true if the sets share at least one member.
    pub fn intersects(self, other: SocketSet) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Returns true if every member of `self` is in `other`.
    pub fn is_subset(self, other: SocketSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// The set with [`SocketType::Invalid`] and [`SocketType::Ignore`] removed.
    pub fn without_markers(self) -> SocketSet {
        SocketSet(self.0 & SocketSet::of(&SocketType::PRIMITIVES).0)
    }

    /// Iterates the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = SocketType> {
        [
            SocketType::Scalar,
            SocketType::Vector,
            SocketType::Matrix,
            SocketType::Invalid,
            SocketType::Ignore,
        ]
        .into_iter()
        .filter(move |ty| self.contains(*ty))
    }
}

impl FromIterator<SocketType> for SocketSet {
    fn from_iter<I: IntoIterator<Item = SocketType>>(iter: I) -> Self {
        let mut set = SocketSet::EMPTY;
        for ty in iter {
            set.insert(ty);
        }
        set
    }
}

impl fmt::Debug for SocketSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for SocketSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, ty) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str("}")
    }
}

/// One of the seven canonical unions a live port may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompoundSocket {
    /// Scalars only.
    Scalar,
    /// Vectors only.
    Vector,
    /// Matrices only.
    Matrix,
    /// Scalars or vectors.
    ScalarOrVector,
    /// Scalars or matrices.
    ScalarOrMatrix,
    /// Vectors or matrices.
    VectorOrMatrix,
    /// Any value kind.
    Anything,
}

impl CompoundSocket {
    /// Every canonical union.
    pub const ALL: [CompoundSocket; 7] = [
        CompoundSocket::Scalar,
        CompoundSocket::Vector,
        CompoundSocket::Matrix,
        CompoundSocket::ScalarOrVector,
        CompoundSocket::ScalarOrMatrix,
        CompoundSocket::VectorOrMatrix,
        CompoundSocket::Anything,
    ];

    /// The primitive types in this union.
    pub const fn types(self) -> SocketSet {
        use SocketType::*;
        match self {
            CompoundSocket::Scalar => SocketSet::of(&[Scalar]),
            CompoundSocket::Vector => SocketSet::of(&[Vector]),
            CompoundSocket::Matrix => SocketSet::of(&[Matrix]),
            CompoundSocket::ScalarOrVector => SocketSet::of(&[Scalar, Vector]),
            CompoundSocket::ScalarOrMatrix => SocketSet::of(&[Scalar, Matrix]),
            CompoundSocket::VectorOrMatrix => SocketSet::of(&[Vector, Matrix]),
            CompoundSocket::Anything => SocketSet::of(&[Scalar, Vector, Matrix]),
        }
    }

    /// Names the union that exactly equals `set`.
    ///
    /// Fails for the empty set and for any set holding a marker.
    pub fn from_set(set: SocketSet) -> Result<Self, SocketError> {
        CompoundSocket::ALL
            .into_iter()
            .find(|socket| socket.types() == set)
            .ok_or(SocketError::InvalidSocketSet(set))
    }

    /// The single-type union for a primitive.
    pub fn from_type(ty: SocketType) -> Result<Self, SocketError> {
        Self::from_set(SocketSet::single(ty))
    }

    /// Returns true if values of kind `ty` are accepted.
    pub fn contains(self, ty: SocketType) -> bool {
        self.types().contains(ty)
    }

    /// Returns true if the two unions share a primitive.
    pub fn intersects(self, other: CompoundSocket) -> bool {
        self.types().intersects(other.types())
    }

    /// Returns true if every primitive of `self` is in `other`.
    pub fn is_subset(self, other: CompoundSocket) -> bool {
        self.types().is_subset(other.types())
    }

    /// The union of the shared primitives, or `None` when disjoint.
    pub fn intersection(self, other: CompoundSocket) -> Option<CompoundSocket> {
        Self::from_set(self.types().intersection(other.types())).ok()
    }

    /// Iterates the primitive types in this union.
    pub fn iter(self) -> impl Iterator<Item = SocketType> {
        self.types().iter()
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            CompoundSocket::Scalar => "SCALAR",
            CompoundSocket::Vector => "VECTOR",
            CompoundSocket::Matrix => "MATRIX",
            CompoundSocket::ScalarOrVector => "SCALAR_OR_VECTOR",
            CompoundSocket::ScalarOrMatrix => "SCALAR_OR_MATRIX",
            CompoundSocket::VectorOrMatrix => "VECTOR_OR_MATRIX",
            CompoundSocket::Anything => "ANYTHING",
        }
    }
}

impl fmt::Display for CompoundSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two sockets may be wired together iff they share a primitive.
pub fn is_compatible(output: CompoundSocket, input: CompoundSocket) -> bool {
    output.intersects(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SocketType::*;

    #[test]
    fn test_set_operations() {
        let sv = SocketSet::of(&[Scalar, Vector]);
        let vm = SocketSet::of(&[Vector, Matrix]);

        assert_eq!(sv.intersection(vm), SocketSet::single(Vector));
        assert!(sv.intersects(vm));
        assert!(!SocketSet::single(Scalar).intersects(SocketSet::single(Matrix)));
        assert_eq!(sv.union(vm).len(), 3);
        assert!(SocketSet::single(Vector).is_subset(sv));
        assert!(!sv.is_subset(vm));
        assert!(SocketSet::EMPTY.is_subset(sv));
    }

    #[test]
    fn test_markers_stripped() {
        let set = SocketSet::of(&[Scalar, Invalid, Ignore]);
        assert_eq!(set.without_markers(), SocketSet::single(Scalar));
        assert!(Invalid.is_marker());
        assert!(!Matrix.is_marker());
    }

    #[test]
    fn test_every_nonempty_primitive_subset_is_canonical() {
        for bits in 1u8..8 {
            let set: SocketSet = SocketType::PRIMITIVES
                .into_iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, ty)| ty)
                .collect();
            let socket = CompoundSocket::from_set(set).unwrap();
            assert_eq!(socket.types(), set);
        }
    }

    #[test]
    fn test_from_set_rejects_illegal_sets() {
        assert!(matches!(
            CompoundSocket::from_set(SocketSet::EMPTY),
            Err(SocketError::InvalidSocketSet(_))
        ));
        assert!(CompoundSocket::from_set(SocketSet::of(&[Scalar, Ignore])).is_err());
        assert!(CompoundSocket::from_type(Invalid).is_err());
    }

    #[test]
    fn test_compound_intersection() {
        assert_eq!(
            CompoundSocket::Anything.intersection(CompoundSocket::ScalarOrMatrix),
            Some(CompoundSocket::ScalarOrMatrix)
        );
        assert_eq!(
            CompoundSocket::Vector.intersection(CompoundSocket::ScalarOrMatrix),
            None
        );
        assert!(is_compatible(CompoundSocket::Anything, CompoundSocket::Vector));
        assert!(!is_compatible(CompoundSocket::Vector, CompoundSocket::Scalar));
    }

    #[test]
    fn test_display() {
        assert_eq!(SocketSet::of(&[Vector, Scalar]).to_string(), "{scalar, vector}");
        assert_eq!(CompoundSocket::VectorOrMatrix.to_string(), "VECTOR_OR_MATRIX");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CompoundSocket::ScalarOrVector).unwrap();
        assert_eq!(json, "\"SCALAR_OR_VECTOR\"");
        let ty: SocketType = serde_json::from_str("\"matrix\"").unwrap();
        assert_eq!(ty, Matrix);
    }
}
