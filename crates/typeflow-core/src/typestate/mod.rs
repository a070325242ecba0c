//! Immutable type-state lattice values and their algebra
//!
//! The submodules are layered leaf-first: [`bits`] and [`compact`] are the
//! two physical set representations, [`set`] selects between them by
//! cardinality, [`state`] is the lattice value itself, [`ops`] the algebra
//! over values, and [`filter`] the branch-condition narrowing for the
//! primitive sub-lattice.

pub mod bits;
pub mod compact;
pub mod constant;
pub mod filter;
pub mod ops;
pub mod set;
pub mod state;

pub use bits::BitVec;
pub use compact::{CompactIdSet, COMPACT_CAPACITY};
pub use constant::{Constant, ConstantValue};
pub use filter::PrimitiveComparison;
pub use ops::{Lattice, LatticeConfig};
pub use set::TypeIdSet;
pub use state::TypeState;
