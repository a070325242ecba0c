//! Inline small-set representation
//!
//! A [`CompactIdSet`] is a sorted, strictly ascending array of type ids held
//! inline (no heap allocation up to [`COMPACT_CAPACITY`] elements). It stands
//! in for a bit-vector when cardinality is small, avoiding large sparse word
//! arrays for the overwhelmingly common two-to-ten-type states.
//!
//! The capacity bound is not enforced here; [`super::set::TypeIdSet`]
//! normalizes any set that outgrows the configured threshold into the dense
//! backing.

use smallvec::SmallVec;

use super::bits::{galloping_union, BitVec};
use crate::universe::TypeId;

/// Inline storage bound for the small representation.
pub const COMPACT_CAPACITY: usize = 10;

/// Sorted inline array of type ids, strictly ascending, no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompactIdSet {
    ids: SmallVec<[TypeId; COMPACT_CAPACITY]>,
}

impl CompactIdSet {
    /// Build from an already sorted, duplicate-free sequence.
    pub fn from_sorted(ids: impl IntoIterator<Item = TypeId>) -> Self {
        let ids: SmallVec<[TypeId; COMPACT_CAPACITY]> = ids.into_iter().collect();
        debug_assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "compact sets must be strictly ascending"
        );
        CompactIdSet { ids }
    }

    /// The canonical two-element set.
    pub fn pair(a: TypeId, b: TypeId) -> Self {
        debug_assert_ne!(a, b);
        let ids = if a < b { [a, b] } else { [b, a] };
        CompactIdSet {
            ids: SmallVec::from_slice(&ids),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Id at position `index` in ascending order.
    pub fn get(&self, index: usize) -> Option<TypeId> {
        self.ids.get(index).copied()
    }

    pub fn first(&self) -> Option<TypeId> {
        self.ids.first().copied()
    }

    pub fn last(&self) -> Option<TypeId> {
        self.ids.last().copied()
    }

    /// Smallest contained id at or after `id`, mirroring a bit-vector's
    /// next-set-bit scan.
    pub fn next_at_or_after(&self, id: TypeId) -> Option<TypeId> {
        let idx = self.ids.partition_point(|&x| x < id);
        self.ids.get(idx).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[TypeId] {
        &self.ids
    }

    /// Copy with `id` inserted at its sort position; unchanged copy if
    /// already present.
    pub fn inserted(&self, id: TypeId) -> CompactIdSet {
        match self.ids.binary_search(&id) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut ids = self.ids.clone();
                ids.insert(pos, id);
                CompactIdSet { ids }
            }
        }
    }

    /// Set union via galloping merge. The result may exceed
    /// [`COMPACT_CAPACITY`]; the caller decides whether it stays compact.
    pub fn union(&self, other: &CompactIdSet) -> CompactIdSet {
        let mut merged = Vec::new();
        galloping_union(&self.ids, &other.ids, &mut merged);
        CompactIdSet {
            ids: SmallVec::from_vec(merged),
        }
    }

    /// Sorted-merge intersection.
    pub fn intersect(&self, other: &CompactIdSet) -> CompactIdSet {
        let mut ids = SmallVec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ids.len() && j < other.ids.len() {
            match self.ids[i].cmp(&other.ids[j]) {
                std::cmp::Ordering::Equal => {
                    ids.push(self.ids[i]);
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        CompactIdSet { ids }
    }

    /// Elements of `self` not present in `other`.
    pub fn subtract(&self, other: &CompactIdSet) -> CompactIdSet {
        let ids = self
            .ids
            .iter()
            .copied()
            .filter(|&id| !other.contains(id))
            .collect();
        CompactIdSet { ids }
    }

    /// Copy with `id` removed, if present.
    pub fn removed(&self, id: TypeId) -> CompactIdSet {
        match self.ids.binary_search(&id) {
            Ok(pos) => {
                let mut ids = self.ids.clone();
                ids.remove(pos);
                CompactIdSet { ids }
            }
            Err(_) => self.clone(),
        }
    }

    /// Sorted merge-compare superset test, O(len of `other`) probes.
    pub fn is_superset(&self, other: &CompactIdSet) -> bool {
        if other.ids.len() > self.ids.len() {
            return false;
        }
        let mut i = 0;
        for &id in &other.ids {
            // Advance over own elements smaller than the probe.
            i += self.ids[i..].partition_point(|&x| x < id);
            if self.ids.get(i).copied() != Some(id) {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn intersects(&self, other: &CompactIdSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ids.len() && j < other.ids.len() {
            match self.ids[i].cmp(&other.ids[j]) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        false
    }

    pub fn to_bitvec(&self) -> BitVec {
        BitVec::from_ids(self.iter())
    }

    /// Extract the set bits of a bit-vector into the compact form.
    pub fn from_bitvec(bits: &BitVec) -> CompactIdSet {
        CompactIdSet {
            ids: bits.ones().map(|bit| TypeId(bit as u32)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(raw: &[u32]) -> CompactIdSet {
        CompactIdSet::from_sorted(raw.iter().copied().map(TypeId))
    }

    #[test]
    fn test_pair_orders_ids() {
        let p = CompactIdSet::pair(TypeId(9), TypeId(2));
        assert_eq!(p.as_slice(), &[TypeId(2), TypeId(9)]);
    }

    #[test]
    fn test_contains_and_positional_get() {
        let s = set(&[1, 4, 9]);
        assert!(s.contains(TypeId(4)));
        assert!(!s.contains(TypeId(5)));
        assert_eq!(s.get(0), Some(TypeId(1)));
        assert_eq!(s.get(2), Some(TypeId(9)));
        assert_eq!(s.get(3), None);
    }

    #[test]
    fn test_next_at_or_after() {
        let s = set(&[1, 4, 9]);
        assert_eq!(s.next_at_or_after(TypeId(0)), Some(TypeId(1)));
        assert_eq!(s.next_at_or_after(TypeId(4)), Some(TypeId(4)));
        assert_eq!(s.next_at_or_after(TypeId(5)), Some(TypeId(9)));
        assert_eq!(s.next_at_or_after(TypeId(10)), None);
    }

    #[test]
    fn test_inserted_keeps_sort_order() {
        let s = set(&[1, 9]);
        assert_eq!(s.inserted(TypeId(4)).as_slice(), &[TypeId(1), TypeId(4), TypeId(9)]);
        assert_eq!(s.inserted(TypeId(9)).as_slice(), s.as_slice());
    }

    #[test]
    fn test_union_intersect_subtract() {
        let a = set(&[1, 2, 5]);
        let b = set(&[2, 3, 5, 8]);
        assert_eq!(a.union(&b).as_slice(), set(&[1, 2, 3, 5, 8]).as_slice());
        assert_eq!(a.intersect(&b).as_slice(), set(&[2, 5]).as_slice());
        assert_eq!(a.subtract(&b).as_slice(), set(&[1]).as_slice());
        assert_eq!(b.subtract(&a).as_slice(), set(&[3, 8]).as_slice());
    }

    #[test]
    fn test_superset_and_intersects() {
        let a = set(&[1, 2, 5, 9]);
        assert!(a.is_superset(&set(&[2, 9])));
        assert!(a.is_superset(&a));
        assert!(!a.is_superset(&set(&[2, 3])));
        assert!(a.intersects(&set(&[3, 5])));
        assert!(!a.intersects(&set(&[0, 3, 8])));
    }

    #[test]
    fn test_bitvec_round_trip() {
        let s = set(&[0, 63, 64, 300]);
        let bits = s.to_bitvec();
        assert_eq!(bits.cardinality(), 4);
        assert_eq!(CompactIdSet::from_bitvec(&bits), s);
    }
}
