//! Type identifiers and the type-universe collaborator boundary
//!
//! The lattice does not own type metadata. The host analysis assigns dense,
//! stable, zero-based integer ids to every instantiated class and array type
//! and exposes them through [`TypeUniverse`]. The id order is load-bearing:
//! sorted-array representations and the galloping merge both rely on it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dense, stable, zero-based identifier for a concrete instantiated type.
///
/// The total order on `TypeId` is the order the universe assigned ids in;
/// every sorted representation in this crate is sorted by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Position of this type in a dense per-type table or bit-vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Classification of a registered type, used only for input validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// A concrete, instantiable class.
    Class,
    /// An abstract class; never appears in a type state.
    AbstractClass,
    /// An interface; never appears in a type state.
    Interface,
    /// An array type (arrays are always instantiable).
    Array,
}

impl TypeKind {
    /// Whether heap objects of this type can exist at runtime.
    pub fn is_instantiable(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Array)
    }
}

/// The collaborator boundary towards the host type universe.
///
/// The lattice needs three things from its host: the size of the dense id
/// space, an instantiability test for validating constructed states, and a
/// per-type notification channel for merge events (the host keeps one summary
/// object per type; [`crate::typestate::Lattice::note_merge`] reports when a
/// state's types lose allocation-site precision).
pub trait TypeUniverse {
    /// Number of types in the universe; valid ids are `0..type_count()`.
    fn type_count(&self) -> usize;

    /// True if the type is a concrete class or array type.
    fn is_instantiable(&self, id: TypeId) -> bool;

    /// Called at most once per logical type-state value for each contained
    /// type when that state's objects are merged into the type's summary
    /// object.
    fn note_type_merged(&self, id: TypeId);
}

/// A concrete in-memory [`TypeUniverse`].
///
/// Registration order defines the id order. Hosts with their own type tables
/// implement [`TypeUniverse`] directly; this registry exists for tests and
/// for hosts without one.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeKind>,
    merge_counts: Vec<AtomicUsize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, assigning it the next dense id.
    pub fn register(&mut self, name: impl Into<String>, kind: TypeKind) -> TypeId {
        let (index, _) = self.types.insert_full(name.into(), kind);
        if index == self.merge_counts.len() {
            self.merge_counts.push(AtomicUsize::new(0));
        }
        TypeId(index as u32)
    }

    /// Look up a previously registered type by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.types.get_index_of(name).map(|i| TypeId(i as u32))
    }

    pub fn kind(&self, id: TypeId) -> Option<TypeKind> {
        self.types.get_index(id.index()).map(|(_, kind)| *kind)
    }

    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.types.get_index(id.index()).map(|(name, _)| name.as_str())
    }

    /// How many times merge notifications arrived for this type's summary
    /// object.
    pub fn merge_count(&self, id: TypeId) -> usize {
        self.merge_counts[id.index()].load(Ordering::Relaxed)
    }
}

impl TypeUniverse for TypeRegistry {
    fn type_count(&self) -> usize {
        self.types.len()
    }

    fn is_instantiable(&self, id: TypeId) -> bool {
        self.kind(id).is_some_and(TypeKind::is_instantiable)
    }

    fn note_type_merged(&self, id: TypeId) {
        self.merge_counts[id.index()].fetch_add(1, Ordering::Relaxed);
    }
}
