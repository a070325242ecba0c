//! The type-state lattice value
//!
//! [`TypeState`] is the tagged union every flow in the data-flow graph
//! carries. Values are immutable once constructed; every operation computes
//! and returns a new value. The single exception is the one-way `merged`
//! flag, a shared atomic set exactly once when a state's types lose
//! allocation-site precision.
//!
//! Shape overview:
//! - `Empty` — bottom; no types, cannot be null.
//! - `Null` — exactly the null value.
//! - `Single` — one possible concrete type.
//! - `Constant` — one possible concrete type and a known exact value.
//! - `Multi` — two or more possible concrete types, backed by a
//!   [`TypeIdSet`] shared through an `Arc` (pointer equality of backings is
//!   a fast path in the algebra).
//! - `PrimitiveConstant` / `AnyPrimitive` — the parallel primitive
//!   sub-lattice; `AnyPrimitive` is saturating.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::constant::Constant;
use super::set::{TypeIdIter, TypeIdSet};
use crate::universe::TypeId;

/// Payload of the one-type shape.
#[derive(Debug, Clone)]
pub struct SingleState {
    pub(crate) type_id: TypeId,
    pub(crate) can_be_null: bool,
    pub(crate) merged: Arc<AtomicBool>,
}

/// Payload of the exact-constant shape.
#[derive(Debug, Clone)]
pub struct ConstantState {
    pub(crate) constant: Constant,
    pub(crate) can_be_null: bool,
}

/// Payload of the many-types shape.
#[derive(Debug, Clone)]
pub struct MultiState {
    pub(crate) ids: Arc<TypeIdSet>,
    pub(crate) can_be_null: bool,
    pub(crate) merged: Arc<AtomicBool>,
}

impl SingleState {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl ConstantState {
    pub fn constant(&self) -> &Constant {
        &self.constant
    }
}

impl MultiState {
    pub fn ids(&self) -> &TypeIdSet {
        &self.ids
    }
}

/// A lattice element: the set of runtime types (and optionally the exact
/// value) a program value may hold at some point in the analysis.
#[derive(Debug, Clone)]
pub enum TypeState {
    Empty,
    Null,
    Single(SingleState),
    Constant(ConstantState),
    Multi(MultiState),
    PrimitiveConstant(i64),
    AnyPrimitive,
}

/// Payloads below this bound come from the prepared table in
/// [`TypeState::for_primitive_constant`].
const SMALL_PRIMITIVE_LIMIT: i64 = 16;

const fn small_primitive(value: i64) -> TypeState {
    TypeState::PrimitiveConstant(value)
}

static SMALL_PRIMITIVES: [TypeState; SMALL_PRIMITIVE_LIMIT as usize] = [
    small_primitive(0),
    small_primitive(1),
    small_primitive(2),
    small_primitive(3),
    small_primitive(4),
    small_primitive(5),
    small_primitive(6),
    small_primitive(7),
    small_primitive(8),
    small_primitive(9),
    small_primitive(10),
    small_primitive(11),
    small_primitive(12),
    small_primitive(13),
    small_primitive(14),
    small_primitive(15),
];

impl TypeState {
    /// The bottom element.
    pub fn empty() -> TypeState {
        TypeState::Empty
    }

    /// Exactly the null value.
    pub fn null_state() -> TypeState {
        TypeState::Null
    }

    /// Top element of the primitive sub-lattice; saturating.
    pub fn any_primitive() -> TypeState {
        TypeState::AnyPrimitive
    }

    /// A single known primitive payload. Narrower primitive kinds must be
    /// sign/zero-extended by the caller. Values in `[0, 16)` come from a
    /// prepared table so the canonical small states have one construction
    /// point.
    pub fn for_primitive_constant(value: i64) -> TypeState {
        if (0..SMALL_PRIMITIVE_LIMIT).contains(&value) {
            SMALL_PRIMITIVES[value as usize].clone()
        } else {
            TypeState::PrimitiveConstant(value)
        }
    }

    pub(crate) fn single(type_id: TypeId, can_be_null: bool) -> TypeState {
        TypeState::Single(SingleState {
            type_id,
            can_be_null,
            merged: Arc::new(AtomicBool::new(false)),
        })
    }

    pub(crate) fn constant(constant: Constant, can_be_null: bool) -> TypeState {
        TypeState::Constant(ConstantState {
            constant,
            can_be_null,
        })
    }

    pub(crate) fn multi(ids: Arc<TypeIdSet>, can_be_null: bool) -> TypeState {
        debug_assert!(ids.len() >= 2, "multi states must hold at least two types");
        TypeState::Multi(MultiState {
            ids,
            can_be_null,
            merged: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TypeState::Empty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypeState::Null)
    }

    /// Whether this is a primitive-shape value. `Empty` is the shared
    /// bottom of both sub-lattices and reports false.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeState::PrimitiveConstant(_) | TypeState::AnyPrimitive)
    }

    pub fn can_be_null(&self) -> bool {
        match self {
            TypeState::Empty => false,
            TypeState::Null => true,
            TypeState::Single(s) => s.can_be_null,
            TypeState::Constant(c) => c.can_be_null,
            TypeState::Multi(m) => m.can_be_null,
            // The flag is meaningless and fixed for primitive shapes.
            TypeState::PrimitiveConstant(_) | TypeState::AnyPrimitive => false,
        }
    }

    /// Number of contained reference types.
    pub fn type_count(&self) -> usize {
        match self {
            TypeState::Single(_) | TypeState::Constant(_) => 1,
            TypeState::Multi(m) => m.ids.len(),
            _ => 0,
        }
    }

    /// The single exact type, if this state has exactly one.
    pub fn exact_type(&self) -> Option<TypeId> {
        match self {
            TypeState::Single(s) => Some(s.type_id),
            TypeState::Constant(c) => Some(c.constant.type_id()),
            _ => None,
        }
    }

    /// The tracked exact constant, if any.
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            TypeState::Constant(c) => Some(&c.constant),
            _ => None,
        }
    }

    /// The tracked primitive payload, if any.
    pub fn as_primitive_constant(&self) -> Option<i64> {
        match self {
            TypeState::PrimitiveConstant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn contains_type(&self, id: TypeId) -> bool {
        match self {
            TypeState::Single(s) => s.type_id == id,
            TypeState::Constant(c) => c.constant.type_id() == id,
            TypeState::Multi(m) => m.ids.contains(id),
            _ => false,
        }
    }

    /// Ascending iteration over contained type ids.
    pub fn types(&self) -> TypesIter<'_> {
        match self {
            TypeState::Single(s) => TypesIter::Single(Some(s.type_id).into_iter()),
            TypeState::Constant(c) => TypesIter::Single(Some(c.constant.type_id()).into_iter()),
            TypeState::Multi(m) => TypesIter::Multi(m.ids.iter()),
            _ => TypesIter::Single(None.into_iter()),
        }
    }

    /// True if this state contains exactly the types set in `bits`.
    pub fn has_exact_types(&self, bits: &super::bits::BitVec) -> bool {
        match self {
            TypeState::Empty | TypeState::Null => bits.is_empty(),
            TypeState::Single(s) => {
                bits.cardinality() == 1 && bits.contains(s.type_id.index())
            }
            TypeState::Constant(c) => {
                bits.cardinality() == 1 && bits.contains(c.constant.type_id().index())
            }
            TypeState::Multi(m) => m.ids.to_bitvec() == *bits,
            TypeState::PrimitiveConstant(_) | TypeState::AnyPrimitive => false,
        }
    }

    /// Copy of this state with the nullability flag set to `can_be_null`.
    ///
    /// Idempotent: if the flag already matches, the same value is returned
    /// (backing set and merge flag stay shared, no new set is built).
    /// `Empty` and `Null` promote into each other; primitive shapes are
    /// unchanged, their flag is fixed.
    pub fn for_can_be_null(&self, can_be_null: bool) -> TypeState {
        match self {
            TypeState::Empty | TypeState::Null => {
                if can_be_null {
                    TypeState::Null
                } else {
                    TypeState::Empty
                }
            }
            TypeState::Single(s) => {
                if s.can_be_null == can_be_null {
                    self.clone()
                } else {
                    TypeState::Single(SingleState {
                        type_id: s.type_id,
                        can_be_null,
                        merged: s.merged.clone(),
                    })
                }
            }
            TypeState::Constant(c) => {
                if c.can_be_null == can_be_null {
                    self.clone()
                } else {
                    TypeState::Constant(ConstantState {
                        constant: c.constant.clone(),
                        can_be_null,
                    })
                }
            }
            TypeState::Multi(m) => {
                if m.can_be_null == can_be_null {
                    self.clone()
                } else {
                    TypeState::Multi(MultiState {
                        ids: m.ids.clone(),
                        can_be_null,
                        merged: m.merged.clone(),
                    })
                }
            }
            TypeState::PrimitiveConstant(_) | TypeState::AnyPrimitive => self.clone(),
        }
    }

    /// Strip nullability.
    pub fn for_non_null(&self) -> TypeState {
        self.for_can_be_null(false)
    }

    /// Whether the merge notification already fired for this value.
    pub fn is_merged(&self) -> bool {
        match self {
            TypeState::Single(s) => s.merged.load(Ordering::Acquire),
            TypeState::Multi(m) => m.merged.load(Ordering::Acquire),
            _ => false,
        }
    }

    /// One-way transition of the merge flag. Returns true for exactly one
    /// caller per distinct underlying value; the winner performs the
    /// notification side effect.
    pub(crate) fn mark_merged(flag: &AtomicBool) -> bool {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Shape name for diagnostics and contract-violation messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            TypeState::Empty => "empty",
            TypeState::Null => "null",
            TypeState::Single(_) => "single",
            TypeState::Constant(_) => "constant",
            TypeState::Multi(_) => "multi",
            TypeState::PrimitiveConstant(_) => "primitive-constant",
            TypeState::AnyPrimitive => "any-primitive",
        }
    }
}

/// Ascending iterator over a state's contained type ids.
pub enum TypesIter<'a> {
    Single(std::option::IntoIter<TypeId>),
    Multi(TypeIdIter<'a>),
}

impl Iterator for TypesIter<'_> {
    type Item = TypeId;

    fn next(&mut self) -> Option<TypeId> {
        match self {
            TypesIter::Single(iter) => iter.next(),
            TypesIter::Multi(iter) => iter.next(),
        }
    }
}

/// Value equality; the merge flag is deliberately excluded so that the
/// scheduler's changed-value test is not perturbed by instrumentation.
impl PartialEq for TypeState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeState::Empty, TypeState::Empty)
            | (TypeState::Null, TypeState::Null)
            | (TypeState::AnyPrimitive, TypeState::AnyPrimitive) => true,
            (TypeState::Single(a), TypeState::Single(b)) => {
                a.type_id == b.type_id && a.can_be_null == b.can_be_null
            }
            (TypeState::Constant(a), TypeState::Constant(b)) => {
                a.constant == b.constant && a.can_be_null == b.can_be_null
            }
            (TypeState::Multi(a), TypeState::Multi(b)) => {
                a.can_be_null == b.can_be_null
                    && (Arc::ptr_eq(&a.ids, &b.ids) || a.ids == b.ids)
            }
            (TypeState::PrimitiveConstant(a), TypeState::PrimitiveConstant(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeState {}

impl Hash for TypeState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TypeState::Empty => 0u8.hash(state),
            TypeState::Null => 1u8.hash(state),
            TypeState::Single(s) => {
                2u8.hash(state);
                s.type_id.hash(state);
                s.can_be_null.hash(state);
            }
            TypeState::Constant(c) => {
                3u8.hash(state);
                c.constant.hash(state);
                c.can_be_null.hash(state);
            }
            TypeState::Multi(m) => {
                4u8.hash(state);
                m.ids.hash(state);
                m.can_be_null.hash(state);
            }
            TypeState::PrimitiveConstant(v) => {
                5u8.hash(state);
                v.hash(state);
            }
            TypeState::AnyPrimitive => 6u8.hash(state),
        }
    }
}

impl fmt::Display for TypeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeState::Empty => write!(f, "Empty"),
            TypeState::Null => write!(f, "Null"),
            TypeState::Single(s) => {
                write!(f, "Single({}{})", s.type_id, if s.can_be_null { "|null" } else { "" })
            }
            TypeState::Constant(c) => {
                write!(f, "Constant({}{})", c.constant, if c.can_be_null { "|null" } else { "" })
            }
            TypeState::Multi(m) => {
                write!(f, "Multi{{")?;
                for (i, id) in m.ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, "}}{}", if m.can_be_null { "|null" } else { "" })
            }
            TypeState::PrimitiveConstant(v) => write!(f, "Prim({v})"),
            TypeState::AnyPrimitive => write!(f, "AnyPrim"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::bits::BitVec;
    use super::super::compact::CompactIdSet;
    use super::*;

    fn multi_of(raw: &[u32], can_be_null: bool) -> TypeState {
        let set = TypeIdSet::Compact(CompactIdSet::from_sorted(raw.iter().copied().map(TypeId)));
        TypeState::multi(Arc::new(set), can_be_null)
    }

    #[test]
    fn test_small_primitive_constants_are_canonical() {
        assert_eq!(
            TypeState::for_primitive_constant(5),
            TypeState::PrimitiveConstant(5)
        );
        assert_eq!(
            TypeState::for_primitive_constant(100),
            TypeState::PrimitiveConstant(100)
        );
        assert_eq!(
            TypeState::for_primitive_constant(-1),
            TypeState::PrimitiveConstant(-1)
        );
    }

    #[test]
    fn test_empty_null_promotion() {
        assert_eq!(TypeState::empty().for_can_be_null(true), TypeState::Null);
        assert_eq!(TypeState::null_state().for_can_be_null(false), TypeState::Empty);
        assert_eq!(TypeState::empty().for_can_be_null(false), TypeState::Empty);
        assert_eq!(TypeState::null_state().for_can_be_null(true), TypeState::Null);
    }

    #[test]
    fn test_for_can_be_null_is_idempotent_and_shares_backing() {
        let state = multi_of(&[1, 2, 3], false);
        let same = state.for_can_be_null(false);
        assert_eq!(state, same);

        let nullable = state.for_can_be_null(true);
        assert!(nullable.can_be_null());
        assert_eq!(nullable.type_count(), 3);
        if let (TypeState::Multi(a), TypeState::Multi(b)) = (&state, &nullable) {
            assert!(Arc::ptr_eq(&a.ids, &b.ids));
            assert!(Arc::ptr_eq(&a.merged, &b.merged));
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_equality_ignores_merge_flag() {
        let a = TypeState::single(TypeId(3), false);
        let b = TypeState::single(TypeId(3), false);
        if let TypeState::Single(s) = &a {
            assert!(TypeState::mark_merged(&s.merged));
        }
        assert_eq!(a, b);
        assert!(a.is_merged());
        assert!(!b.is_merged());
    }

    #[test]
    fn test_mark_merged_wins_once() {
        let flag = AtomicBool::new(false);
        assert!(TypeState::mark_merged(&flag));
        assert!(!TypeState::mark_merged(&flag));
    }

    #[test]
    fn test_introspection() {
        let single = TypeState::single(TypeId(7), true);
        assert_eq!(single.exact_type(), Some(TypeId(7)));
        assert_eq!(single.type_count(), 1);
        assert!(single.can_be_null());
        assert!(single.contains_type(TypeId(7)));
        assert!(!single.contains_type(TypeId(8)));

        let multi = multi_of(&[2, 7, 9], false);
        assert_eq!(multi.exact_type(), None);
        assert_eq!(multi.type_count(), 3);
        assert_eq!(
            multi.types().collect::<Vec<_>>(),
            vec![TypeId(2), TypeId(7), TypeId(9)]
        );

        assert_eq!(TypeState::empty().type_count(), 0);
        assert!(TypeState::any_primitive().is_primitive());
        assert_eq!(
            TypeState::for_primitive_constant(9).as_primitive_constant(),
            Some(9)
        );
    }

    #[test]
    fn test_has_exact_types() {
        let multi = multi_of(&[2, 7], false);
        let bits = BitVec::from_ids([TypeId(2), TypeId(7)]);
        assert!(multi.has_exact_types(&bits));
        assert!(!multi.has_exact_types(&bits.with_set(9)));
        assert!(TypeState::empty().has_exact_types(&BitVec::new()));
    }

    #[test]
    fn test_state_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeState>();
    }
}
