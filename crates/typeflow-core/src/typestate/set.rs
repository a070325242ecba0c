//! Dual-backing type-id sets
//!
//! A [`TypeIdSet`] is either [`Compact`](TypeIdSet::Compact) (inline sorted
//! array) or [`Dense`](TypeIdSet::Dense) (bit-vector). The two backings are
//! semantically interchangeable; which one a set uses is decided purely by
//! cardinality against the configured threshold and is invisible through
//! this module's API. Crossing the threshold is an explicit state
//! transition performed by [`TypeIdSet::normalize`], which every
//! set-producing operation runs before returning.

use std::hash::{Hash, Hasher};

use super::bits::BitVec;
use super::compact::CompactIdSet;
use crate::universe::TypeId;

/// Set of type ids with cardinality-selected physical backing.
#[derive(Debug, Clone)]
pub enum TypeIdSet {
    /// Inline sorted array; used at or below the compact limit.
    Compact(CompactIdSet),
    /// Full bit-vector; used above the compact limit.
    Dense(BitVec),
}

impl TypeIdSet {
    /// Build from a bit-vector, choosing the backing for its cardinality.
    pub fn from_bitvec(bits: BitVec, compact_limit: usize) -> TypeIdSet {
        if bits.cardinality() <= compact_limit {
            TypeIdSet::Compact(CompactIdSet::from_bitvec(&bits))
        } else {
            TypeIdSet::Dense(bits)
        }
    }

    /// Re-check the backing against the threshold and convert if needed.
    pub fn normalize(self, compact_limit: usize) -> TypeIdSet {
        match self {
            TypeIdSet::Compact(set) if set.len() > compact_limit => {
                tracing::trace!(len = set.len(), "type-id set grew past compact limit");
                TypeIdSet::Dense(set.to_bitvec())
            }
            TypeIdSet::Dense(bits) if bits.cardinality() <= compact_limit => {
                tracing::trace!(
                    len = bits.cardinality(),
                    "type-id set shrank below compact limit"
                );
                TypeIdSet::Compact(CompactIdSet::from_bitvec(&bits))
            }
            normalized => normalized,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypeIdSet::Compact(set) => set.len(),
            TypeIdSet::Dense(bits) => bits.cardinality(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TypeIdSet::Compact(set) => set.is_empty(),
            TypeIdSet::Dense(bits) => bits.is_empty(),
        }
    }

    pub fn contains(&self, id: TypeId) -> bool {
        match self {
            TypeIdSet::Compact(set) => set.contains(id),
            TypeIdSet::Dense(bits) => bits.contains(id.index()),
        }
    }

    pub fn first(&self) -> Option<TypeId> {
        match self {
            TypeIdSet::Compact(set) => set.first(),
            TypeIdSet::Dense(bits) => bits.first_set().map(|bit| TypeId(bit as u32)),
        }
    }

    pub fn last(&self) -> Option<TypeId> {
        match self {
            TypeIdSet::Compact(set) => set.last(),
            TypeIdSet::Dense(bits) => bits.last_set().map(|bit| TypeId(bit as u32)),
        }
    }

    /// Ascending iteration, independent of backing.
    pub fn iter(&self) -> TypeIdIter<'_> {
        match self {
            TypeIdSet::Compact(set) => TypeIdIter::Compact(set.as_slice().iter()),
            TypeIdSet::Dense(bits) => TypeIdIter::Dense(bits.ones()),
        }
    }

    pub fn to_bitvec(&self) -> BitVec {
        match self {
            TypeIdSet::Compact(set) => set.to_bitvec(),
            TypeIdSet::Dense(bits) => bits.clone(),
        }
    }

    /// Copy with `id` added, normalized against the threshold.
    pub fn inserted(&self, id: TypeId, compact_limit: usize) -> TypeIdSet {
        match self {
            TypeIdSet::Compact(set) => TypeIdSet::Compact(set.inserted(id)).normalize(compact_limit),
            TypeIdSet::Dense(bits) => TypeIdSet::Dense(bits.with_set(id.index())),
        }
    }

    /// Copy with `id` removed, normalized against the threshold.
    pub fn removed(&self, id: TypeId, compact_limit: usize) -> TypeIdSet {
        match self {
            TypeIdSet::Compact(set) => TypeIdSet::Compact(set.removed(id)),
            TypeIdSet::Dense(bits) => {
                TypeIdSet::Dense(bits.with_cleared(id.index())).normalize(compact_limit)
            }
        }
    }

    /// Full set union. Compact inputs merge by galloping; anything dense
    /// goes through a word-level OR. Neither input is mutated.
    pub fn union(&self, other: &TypeIdSet, compact_limit: usize) -> TypeIdSet {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => {
                TypeIdSet::Compact(a.union(b)).normalize(compact_limit)
            }
            _ => TypeIdSet::from_bitvec(self.to_bitvec().or(&other.to_bitvec()), compact_limit),
        }
    }

    pub fn intersect(&self, other: &TypeIdSet, compact_limit: usize) -> TypeIdSet {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => {
                TypeIdSet::Compact(a.intersect(b))
            }
            _ => TypeIdSet::from_bitvec(self.to_bitvec().and(&other.to_bitvec()), compact_limit),
        }
    }

    pub fn subtract(&self, other: &TypeIdSet, compact_limit: usize) -> TypeIdSet {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => {
                TypeIdSet::Compact(a.subtract(b))
            }
            _ => {
                TypeIdSet::from_bitvec(self.to_bitvec().and_not(&other.to_bitvec()), compact_limit)
            }
        }
    }

    pub fn is_superset(&self, other: &TypeIdSet) -> bool {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => a.is_superset(b),
            (TypeIdSet::Dense(a), TypeIdSet::Dense(b)) => a.is_superset(b),
            (TypeIdSet::Dense(a), TypeIdSet::Compact(b)) => {
                b.iter().all(|id| a.contains(id.index()))
            }
            // A compact set can still cover a dense one that shrank.
            (TypeIdSet::Compact(a), TypeIdSet::Dense(b)) => {
                b.ones().all(|bit| a.contains(TypeId(bit as u32)))
            }
        }
    }

    pub fn intersects(&self, other: &TypeIdSet) -> bool {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => a.intersects(b),
            (TypeIdSet::Dense(a), TypeIdSet::Dense(b)) => a.intersects(b),
            (TypeIdSet::Compact(a), TypeIdSet::Dense(b))
            | (TypeIdSet::Dense(b), TypeIdSet::Compact(a)) => {
                a.iter().any(|id| b.contains(id.index()))
            }
        }
    }
}

/// Ascending id iterator over either backing.
pub enum TypeIdIter<'a> {
    Compact(std::slice::Iter<'a, TypeId>),
    Dense(super::bits::Ones<'a>),
}

impl Iterator for TypeIdIter<'_> {
    type Item = TypeId;

    fn next(&mut self) -> Option<TypeId> {
        match self {
            TypeIdIter::Compact(iter) => iter.next().copied(),
            TypeIdIter::Dense(ones) => ones.next().map(|bit| TypeId(bit as u32)),
        }
    }
}

impl PartialEq for TypeIdSet {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeIdSet::Compact(a), TypeIdSet::Compact(b)) => a == b,
            (TypeIdSet::Dense(a), TypeIdSet::Dense(b)) => a == b,
            // Backings differ only physically; compare contents.
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl Eq for TypeIdSet {}

impl Hash for TypeIdSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the id sequence so equal sets hash equally across backings.
        for id in self.iter() {
            id.hash(state);
        }
    }
}
