//! Caller-contract violations
//!
//! The lattice is a closed algebraic system over validated inputs; the only
//! error class it knows is a programming error in the consumer. The `try_*`
//! entry points surface these as values so the scheduler can report them,
//! while the plain entry points panic with the same message.

use thiserror::Error;

use crate::universe::TypeId;

/// A programming error in the consumer of the lattice.
///
/// These must never be silently coerced: tolerating one would corrupt
/// analysis soundness. Capacity growth is not an error; representation
/// switches absorb it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A `Single`/`Constant` state was requested for an abstract class,
    /// interface, or otherwise non-instantiable type.
    #[error("type {0} is not instantiable; only concrete class and array types may appear in a type state")]
    NotInstantiable(TypeId),

    /// A type id outside the universe's dense id space.
    #[error("type id {id} is out of bounds for a universe of {universe} types")]
    UnknownType { id: TypeId, universe: usize },

    /// A reference-shape operation received a primitive operand or vice
    /// versa.
    #[error("{op} is undefined between primitive and reference type states ({left} vs {right})")]
    MixedKinds {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// `filter_primitive` received a reference-shaped operand.
    #[error("primitive comparison filtering is undefined for {0} states")]
    NonPrimitiveFilter(&'static str),

    /// `note_merge` on a shape that never holds allocation-site objects.
    #[error("note_merge is not applicable to {0} states; constants and primitives are never allocation-site objects")]
    MergeNotApplicable(&'static str),
}
