//! # Typeflow Core
//!
//! The type-state lattice engine of a whole-program points-to analysis.
//!
//! A [`TypeState`] is an immutable lattice value describing, at one program
//! point, the set of runtime types (and optionally the exact constant value)
//! a value may hold. The fixed-point scheduler of the analysis recomputes
//! these values along data-flow edges with the algebra in [`Lattice`]:
//! union while propagating forward, intersection and subtraction when a
//! branch filters a flow by type, and comparison filtering for the
//! primitive sub-lattice.
//!
//! ## Modules
//!
//! - **[`typestate`]** - The lattice value, its set representations and the
//!   algebra over it
//! - **[`universe`]** - Type identifiers and the collaborator boundary
//!   towards the host type universe
//! - **[`observer`]** - Optional per-operation instrumentation hook
//! - **[`error`]** - Caller-contract violations
//!
//! ## Quick Start
//!
//! ```rust
//! use typeflow_core::prelude::*;
//!
//! let mut registry = TypeRegistry::new();
//! let string = registry.register("java.lang.String", TypeKind::Class);
//! let buffer = registry.register("java.lang.StringBuilder", TypeKind::Class);
//!
//! let lattice = Lattice::new(&registry);
//! let either = lattice.union(
//!     &lattice.for_type(string, false),
//!     &lattice.for_type(buffer, true),
//! );
//! assert_eq!(either.type_count(), 2);
//! assert!(either.can_be_null());
//! ```

pub mod error;
pub mod observer;
pub mod typestate;
pub mod universe;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::ContractViolation;
    pub use crate::observer::{NoopObserver, OpKind, StateObserver};
    pub use crate::typestate::{
        Constant, ConstantValue, Lattice, LatticeConfig, PrimitiveComparison, TypeState,
    };
    pub use crate::universe::{TypeId, TypeKind, TypeRegistry, TypeUniverse};
}

// Re-export main types at crate root for convenience
pub use error::ContractViolation;
pub use observer::{NoopObserver, OpKind, StateObserver};
pub use typestate::{
    BitVec, CompactIdSet, Constant, ConstantValue, Lattice, LatticeConfig, PrimitiveComparison,
    TypeIdSet, TypeState, COMPACT_CAPACITY,
};
pub use universe::{TypeId, TypeKind, TypeRegistry, TypeUniverse};
