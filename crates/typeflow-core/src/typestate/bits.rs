//! Bit-vector primitives for dense type-id sets
//!
//! [`BitVec`] owns its word array outright so the set algebra can combine
//! words directly: every binary operation allocates a fresh result and never
//! mutates an input (clone-on-write is an invariant of the type, not a
//! convention). Trailing zero words are semantically irrelevant; equality,
//! hashing, and the subset test all treat a missing word as zero.
//!
//! [`galloping_union`] is the sorted-array counterpart: it merges two
//! strictly ascending id slices by copying whole non-overlapping runs found
//! via binary search instead of advancing one element at a time.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::universe::TypeId;

const WORD_BITS: usize = 64;

#[inline]
fn word_of(bit: usize) -> usize {
    bit / WORD_BITS
}

#[inline]
fn mask_of(bit: usize) -> u64 {
    1u64 << (bit % WORD_BITS)
}

/// Growable bit-vector with explicit word ownership.
#[derive(Clone, Default)]
pub struct BitVec {
    words: Vec<u64>,
}

impl BitVec {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty bit-vector with room for `bits` bits before reallocating.
    pub fn with_bit_capacity(bits: usize) -> Self {
        BitVec {
            words: Vec::with_capacity(bits.div_ceil(WORD_BITS)),
        }
    }

    /// Build from ascending type ids.
    pub fn from_ids<I: IntoIterator<Item = TypeId>>(ids: I) -> Self {
        let mut bits = BitVec::new();
        for id in ids {
            bits.set(id.index());
        }
        bits
    }

    /// Set a bit in place. Only builders own a `BitVec` mutably; shared
    /// vectors are combined through the pure operations below.
    pub fn set(&mut self, bit: usize) {
        let word = word_of(bit);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= mask_of(bit);
    }

    /// Clear a bit in place.
    pub fn clear(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(word_of(bit)) {
            *word &= !mask_of(bit);
        }
    }

    pub fn contains(&self, bit: usize) -> bool {
        self.words
            .get(word_of(bit))
            .is_some_and(|word| word & mask_of(bit) != 0)
    }

    /// Copy with one extra bit set.
    pub fn with_set(&self, bit: usize) -> BitVec {
        let mut result = self.clone();
        result.set(bit);
        result
    }

    /// Copy with one bit cleared.
    pub fn with_cleared(&self, bit: usize) -> BitVec {
        let mut result = self.clone();
        result.clear(bit);
        result
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Logical OR; the result's word array covers the longer input.
    pub fn or(&self, other: &BitVec) -> BitVec {
        let (long, short) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut words = long.words.clone();
        for (word, &short_word) in words.iter_mut().zip(&short.words) {
            *word |= short_word;
        }
        BitVec { words }
    }

    /// Logical AND; size mismatches truncate (missing words are zero).
    pub fn and(&self, other: &BitVec) -> BitVec {
        let len = self.words.len().min(other.words.len());
        let words = self.words[..len]
            .iter()
            .zip(&other.words[..len])
            .map(|(&a, &b)| a & b)
            .collect();
        BitVec { words }
    }

    /// Logical AND NOT: bits of `self` not present in `other`.
    pub fn and_not(&self, other: &BitVec) -> BitVec {
        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, &word)| word & !other.words.get(i).copied().unwrap_or(0))
            .collect();
        BitVec { words }
    }

    /// Word-by-word superset test: every bit of `other` is set in `self`.
    pub fn is_superset(&self, other: &BitVec) -> bool {
        for (i, &word) in other.words.iter().enumerate() {
            let own = self.words.get(i).copied().unwrap_or(0);
            if own & word != word {
                return false;
            }
        }
        true
    }

    /// True if the two vectors share at least one set bit.
    pub fn intersects(&self, other: &BitVec) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(&a, &b)| a & b != 0)
    }

    pub fn first_set(&self) -> Option<usize> {
        self.next_set_at_or_after(0)
    }

    pub fn last_set(&self) -> Option<usize> {
        for (i, &word) in self.words.iter().enumerate().rev() {
            if word != 0 {
                return Some(i * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize));
            }
        }
        None
    }

    /// Smallest set bit at or after `bit`, if any.
    pub fn next_set_at_or_after(&self, bit: usize) -> Option<usize> {
        let mut word_idx = word_of(bit);
        if word_idx >= self.words.len() {
            return None;
        }
        // Mask off bits below the starting position in the first word.
        let mut word = self.words[word_idx] & (u64::MAX << (bit % WORD_BITS));
        loop {
            if word != 0 {
                return Some(word_idx * WORD_BITS + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Iterate set bits in ascending order.
    pub fn ones(&self) -> Ones<'_> {
        Ones {
            bits: self,
            next: 0,
        }
    }
}

/// Ascending iterator over the set bits of a [`BitVec`].
pub struct Ones<'a> {
    bits: &'a BitVec,
    next: usize,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let bit = self.bits.next_set_at_or_after(self.next)?;
        self.next = bit + 1;
        Some(bit)
    }
}

impl PartialEq for BitVec {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        for i in 0..len {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            if a != b {
                return false;
            }
        }
        true
    }
}

impl Eq for BitVec {}

impl Hash for BitVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Skip trailing zero words so equal vectors hash equally.
        let len = self
            .words
            .iter()
            .rposition(|&word| word != 0)
            .map_or(0, |i| i + 1);
        self.words[..len].hash(state);
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

/// Union of two strictly ascending id slices.
///
/// Runs of one input entirely below the other's cursor are located with a
/// binary search and copied wholesale, which beats element-at-a-time merging
/// whenever the inputs interleave in blocks, the common case for type-id
/// sets built from class hierarchies.
pub fn galloping_union(a: &[TypeId], b: &[TypeId], out: &mut Vec<TypeId>) {
    out.reserve(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                let run = a[i..].partition_point(|&id| id < b[j]);
                out.extend_from_slice(&a[i..i + run]);
                i += run;
            }
            std::cmp::Ordering::Greater => {
                let run = b[j..].partition_point(|&id| id < a[i]);
                out.extend_from_slice(&b[j..j + run]);
                j += run;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<TypeId> {
        raw.iter().copied().map(TypeId).collect()
    }

    #[test]
    fn test_set_contains_clear() {
        let mut bits = BitVec::new();
        bits.set(3);
        bits.set(64);
        bits.set(130);
        assert!(bits.contains(3));
        assert!(bits.contains(64));
        assert!(bits.contains(130));
        assert!(!bits.contains(4));
        assert!(!bits.contains(1000));
        bits.clear(64);
        assert!(!bits.contains(64));
        assert_eq!(bits.cardinality(), 2);
    }

    #[test]
    fn test_or_is_pure_and_covers_both() {
        let a = BitVec::from_ids(ids(&[1, 70]));
        let b = BitVec::from_ids(ids(&[2, 200]));
        let c = a.or(&b);
        assert_eq!(c.ones().collect::<Vec<_>>(), vec![1, 2, 70, 200]);
        // Inputs untouched.
        assert_eq!(a.cardinality(), 2);
        assert_eq!(b.cardinality(), 2);
    }

    #[test]
    fn test_and_with_size_mismatch() {
        let small = BitVec::from_ids(ids(&[1, 5]));
        let large = BitVec::from_ids(ids(&[5, 500]));
        assert_eq!(small.and(&large).ones().collect::<Vec<_>>(), vec![5]);
        assert_eq!(large.and(&small).ones().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_and_not() {
        let a = BitVec::from_ids(ids(&[1, 5, 500]));
        let b = BitVec::from_ids(ids(&[5]));
        assert_eq!(a.and_not(&b).ones().collect::<Vec<_>>(), vec![1, 500]);
        assert!(b.and_not(&a).is_empty());
    }

    #[test]
    fn test_superset_across_lengths() {
        let large = BitVec::from_ids(ids(&[1, 5, 500]));
        let small = BitVec::from_ids(ids(&[1, 5]));
        assert!(large.is_superset(&small));
        assert!(!small.is_superset(&large));
        assert!(large.is_superset(&BitVec::new()));
        // A short vector is a superset of a long one whose tail is all zero.
        let padded = small.with_set(700).with_cleared(700);
        assert!(small.is_superset(&padded));
    }

    #[test]
    fn test_equality_ignores_trailing_zero_words() {
        let a = BitVec::from_ids(ids(&[3]));
        let b = a.with_set(640).with_cleared(640);
        assert_eq!(a, b);
    }

    #[test]
    fn test_next_set_at_or_after() {
        let bits = BitVec::from_ids(ids(&[2, 63, 64, 300]));
        assert_eq!(bits.next_set_at_or_after(0), Some(2));
        assert_eq!(bits.next_set_at_or_after(3), Some(63));
        assert_eq!(bits.next_set_at_or_after(64), Some(64));
        assert_eq!(bits.next_set_at_or_after(65), Some(300));
        assert_eq!(bits.next_set_at_or_after(301), None);
        assert_eq!(bits.first_set(), Some(2));
        assert_eq!(bits.last_set(), Some(300));
    }

    #[test]
    fn test_galloping_union_disjoint_runs() {
        let a = ids(&[1, 2, 3, 40, 41]);
        let b = ids(&[10, 11, 12]);
        let mut out = Vec::new();
        galloping_union(&a, &b, &mut out);
        assert_eq!(out, ids(&[1, 2, 3, 10, 11, 12, 40, 41]));
    }

    #[test]
    fn test_galloping_union_with_duplicates() {
        let a = ids(&[1, 5, 9]);
        let b = ids(&[1, 5, 9]);
        let mut out = Vec::new();
        galloping_union(&a, &b, &mut out);
        assert_eq!(out, ids(&[1, 5, 9]));
    }

    #[test]
    fn test_galloping_union_interleaved() {
        let a = ids(&[0, 4, 8]);
        let b = ids(&[1, 4, 9]);
        let mut out = Vec::new();
        galloping_union(&a, &b, &mut out);
        assert_eq!(out, ids(&[0, 1, 4, 8, 9]));
    }

    #[test]
    fn test_galloping_union_one_empty() {
        let a = ids(&[7, 8]);
        let mut out = Vec::new();
        galloping_union(&a, &[], &mut out);
        assert_eq!(out, a);
    }
}
