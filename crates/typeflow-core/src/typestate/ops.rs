//! The lattice algebra
//!
//! [`Lattice`] implements union, intersection and subtraction over
//! [`TypeState`] values as a dispatch over the pairwise operand shapes.
//! Each operation first tries speculative fast paths (backing-pointer
//! identity, equal sets, disjointness, superset) that are O(min(n,m)) or
//! better and semantically equivalent to the full merge, then falls back to
//! the word-level or sorted-merge computation and re-canonicalizes the
//! result's shape from its cardinality.
//!
//! Intersection and subtraction treat their right operand as a type filter:
//! the analysis only produces right operands that are context-insensitive
//! ("all objects of these types"), so the result keeps the left operand's
//! objects restricted to the surviving types. This is an inherited usage
//! restriction, not a general-purpose set intersection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bits::BitVec;
use super::compact::{CompactIdSet, COMPACT_CAPACITY};
use super::constant::Constant;
use super::set::TypeIdSet;
use super::state::{MultiState, TypeState};
use crate::error::ContractViolation;
use crate::observer::{OpKind, StateObserver};
use crate::universe::{TypeId, TypeUniverse};

/// Tunable knobs of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Cardinality at or below which a multi-type set uses the inline
    /// sorted-array backing instead of a bit-vector.
    pub compact_limit: usize,
    /// Minimum number of contained types before the saturation heuristic
    /// can report a state as close to the whole universe.
    pub close_to_all_min_types: usize,
    /// Fraction of the universe a state must cover for the saturation
    /// heuristic to fire.
    pub close_to_all_ratio: f64,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig {
            compact_limit: COMPACT_CAPACITY,
            close_to_all_min_types: 200,
            close_to_all_ratio: 0.75,
        }
    }
}

/// The algebra over type states, bound to a host universe.
///
/// Cheap to construct; holds no state of its own beyond configuration. The
/// `try_*` entry points surface caller-contract violations as values, the
/// plain entry points panic with the same message.
pub struct Lattice<'a> {
    universe: &'a dyn TypeUniverse,
    config: LatticeConfig,
    observer: Option<&'a dyn StateObserver>,
}

impl<'a> Lattice<'a> {
    pub fn new(universe: &'a dyn TypeUniverse) -> Self {
        Lattice {
            universe,
            config: LatticeConfig::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: LatticeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    // ---- construction -----------------------------------------------------

    /// Reference state over a single validated type.
    pub fn try_for_type(
        &self,
        id: TypeId,
        can_be_null: bool,
    ) -> Result<TypeState, ContractViolation> {
        self.validate_type(id)?;
        Ok(TypeState::single(id, can_be_null))
    }

    pub fn for_type(&self, id: TypeId, can_be_null: bool) -> TypeState {
        demand(self.try_for_type(id, can_be_null))
    }

    /// Exact-constant state; the constant's type must be instantiable.
    pub fn try_for_constant(
        &self,
        constant: Constant,
        can_be_null: bool,
    ) -> Result<TypeState, ContractViolation> {
        self.validate_type(constant.type_id())?;
        Ok(TypeState::constant(constant, can_be_null))
    }

    pub fn for_constant(&self, constant: Constant, can_be_null: bool) -> TypeState {
        demand(self.try_for_constant(constant, can_be_null))
    }

    /// State containing exactly the types set in `bits`, canonicalized by
    /// cardinality (0 becomes `Empty`/`Null`, 1 becomes `Single`).
    pub fn for_exact_types(&self, bits: &BitVec, can_be_null: bool) -> TypeState {
        self.state_for_set(
            TypeIdSet::from_bitvec(bits.clone(), self.config.compact_limit),
            can_be_null,
        )
    }

    fn validate_type(&self, id: TypeId) -> Result<(), ContractViolation> {
        if id.index() >= self.universe.type_count() {
            return Err(ContractViolation::UnknownType {
                id,
                universe: self.universe.type_count(),
            });
        }
        if !self.universe.is_instantiable(id) {
            return Err(ContractViolation::NotInstantiable(id));
        }
        Ok(())
    }

    // ---- union ------------------------------------------------------------

    /// Least upper bound: the result contains every type of both operands
    /// and `can_be_null` is the OR of the operands' flags.
    pub fn try_union(
        &self,
        left: &TypeState,
        right: &TypeState,
    ) -> Result<TypeState, ContractViolation> {
        check_same_kind("union", left, right)?;
        let result = self.union_impl(left, right);
        self.report(OpKind::Union, left, right, &result);
        Ok(result)
    }

    pub fn union(&self, left: &TypeState, right: &TypeState) -> TypeState {
        demand(self.try_union(left, right))
    }

    fn union_impl(&self, s1: &TypeState, s2: &TypeState) -> TypeState {
        let or_null = s1.can_be_null() || s2.can_be_null();
        match (s1, s2) {
            (TypeState::Empty, _) => s2.clone(),
            (_, TypeState::Empty) => s1.clone(),
            (TypeState::Null, _) => s2.for_can_be_null(true),
            (_, TypeState::Null) => s1.for_can_be_null(true),

            (TypeState::AnyPrimitive, _) | (_, TypeState::AnyPrimitive) => TypeState::AnyPrimitive,
            (TypeState::PrimitiveConstant(a), TypeState::PrimitiveConstant(b)) => {
                if a == b {
                    s1.clone()
                } else {
                    TypeState::AnyPrimitive
                }
            }

            (TypeState::Constant(c1), TypeState::Constant(c2)) => {
                if c1.constant == c2.constant {
                    // Same exact value; keep constant-ness and hand back the
                    // operand whose flag already matches the OR.
                    if c1.can_be_null == or_null {
                        s1.clone()
                    } else {
                        s2.clone()
                    }
                } else {
                    // Differing constants are too precise to merge; erase
                    // both to their exact types and continue as singles.
                    self.union_impl(&erase_constant(s1), &erase_constant(s2))
                }
            }
            (TypeState::Constant(_), _) | (_, TypeState::Constant(_)) => {
                self.union_impl(&erase_constant(s1), &erase_constant(s2))
            }

            (TypeState::Single(a), TypeState::Single(b)) => {
                if a.type_id() == b.type_id() {
                    s1.for_can_be_null(or_null)
                } else {
                    self.state_for_set(
                        TypeIdSet::Compact(CompactIdSet::pair(a.type_id(), b.type_id())),
                        or_null,
                    )
                }
            }

            (TypeState::Single(single), TypeState::Multi(multi))
            | (TypeState::Multi(multi), TypeState::Single(single)) => {
                if multi.ids.contains(single.type_id()) {
                    TypeState::Multi(multi.clone()).for_can_be_null(or_null)
                } else {
                    self.state_for_set(
                        multi.ids.inserted(single.type_id(), self.config.compact_limit),
                        or_null,
                    )
                }
            }

            (TypeState::Multi(m1), TypeState::Multi(m2)) => self.union_multi(m1, m2, or_null),

            // Mixed primitive/reference pairs are rejected before dispatch.
            _ => unreachable!("operand kinds verified before dispatch"),
        }
    }

    fn union_multi(&self, m1: &MultiState, m2: &MultiState, or_null: bool) -> TypeState {
        // Order so the speculative winners hand back the larger operand.
        let (big, small) = if m1.ids.len() >= m2.ids.len() {
            (m1, m2)
        } else {
            (m2, m1)
        };
        if Arc::ptr_eq(&big.ids, &small.ids) {
            return TypeState::Multi(big.clone()).for_can_be_null(or_null);
        }
        if big.ids.is_superset(&small.ids) {
            return TypeState::Multi(big.clone()).for_can_be_null(or_null);
        }
        tracing::trace!(
            left = big.ids.len(),
            right = small.ids.len(),
            "union fast paths missed; computing full merge"
        );
        self.state_for_set(big.ids.union(&small.ids, self.config.compact_limit), or_null)
    }

    // ---- intersection -----------------------------------------------------

    /// Restrict `left` to the types of `right`; `can_be_null` is the AND of
    /// the operands' flags. The right operand acts as a type filter.
    pub fn try_intersect(
        &self,
        left: &TypeState,
        right: &TypeState,
    ) -> Result<TypeState, ContractViolation> {
        check_same_kind("intersection", left, right)?;
        let result = self.intersect_impl(left, right);
        self.report(OpKind::Intersection, left, right, &result);
        Ok(result)
    }

    pub fn intersect(&self, left: &TypeState, right: &TypeState) -> TypeState {
        demand(self.try_intersect(left, right))
    }

    fn intersect_impl(&self, s1: &TypeState, s2: &TypeState) -> TypeState {
        let and_null = s1.can_be_null() && s2.can_be_null();
        match (s1, s2) {
            (TypeState::Empty, _) | (_, TypeState::Empty) => TypeState::Empty,
            (TypeState::Null, _) | (_, TypeState::Null) => {
                TypeState::Empty.for_can_be_null(and_null)
            }

            (TypeState::AnyPrimitive, _) => s2.clone(),
            (_, TypeState::AnyPrimitive) => s1.clone(),
            (TypeState::PrimitiveConstant(a), TypeState::PrimitiveConstant(b)) => {
                if a == b {
                    s1.clone()
                } else {
                    TypeState::Empty
                }
            }

            // A constant survives a filter that keeps its type; the exact
            // value is preserved because the left operand's objects are kept.
            (TypeState::Constant(c), _) => {
                if s2.contains_type(c.constant().type_id()) {
                    s1.for_can_be_null(and_null)
                } else {
                    TypeState::Empty.for_can_be_null(and_null)
                }
            }
            (TypeState::Single(single), _) => {
                if s2.contains_type(single.type_id()) {
                    s1.for_can_be_null(and_null)
                } else {
                    TypeState::Empty.for_can_be_null(and_null)
                }
            }

            // Constant on the right behaves as its exact type.
            (TypeState::Multi(multi), _) if s2.exact_type().is_some() => {
                match s2.exact_type() {
                    Some(id) if multi.ids.contains(id) => TypeState::single(id, and_null),
                    _ => TypeState::Empty.for_can_be_null(and_null),
                }
            }

            (TypeState::Multi(m1), TypeState::Multi(m2)) => self.intersect_multi(m1, m2, and_null),

            // Mixed primitive/reference pairs are rejected before dispatch.
            _ => unreachable!("operand kinds verified before dispatch"),
        }
    }

    fn intersect_multi(&self, m1: &MultiState, m2: &MultiState, and_null: bool) -> TypeState {
        if Arc::ptr_eq(&m1.ids, &m2.ids) || m1.ids == m2.ids {
            return TypeState::Multi(m1.clone()).for_can_be_null(and_null);
        }
        if !m1.ids.intersects(&m2.ids) {
            return TypeState::Empty.for_can_be_null(and_null);
        }
        if m2.ids.is_superset(&m1.ids) {
            return TypeState::Multi(m1.clone()).for_can_be_null(and_null);
        }
        if m1.ids.is_superset(&m2.ids) {
            return self.state_for_set((*m2.ids).clone(), and_null);
        }
        tracing::trace!(
            left = m1.ids.len(),
            right = m2.ids.len(),
            "intersection fast paths missed; computing full filter"
        );
        self.state_for_set(m1.ids.intersect(&m2.ids, self.config.compact_limit), and_null)
    }

    // ---- subtraction ------------------------------------------------------

    /// Remove the types of `right` from `left`; `can_be_null` is
    /// `left && !right`. The right operand acts as a type filter.
    pub fn try_subtract(
        &self,
        left: &TypeState,
        right: &TypeState,
    ) -> Result<TypeState, ContractViolation> {
        check_same_kind("subtraction", left, right)?;
        let result = self.subtract_impl(left, right);
        self.report(OpKind::Subtraction, left, right, &result);
        Ok(result)
    }

    pub fn subtract(&self, left: &TypeState, right: &TypeState) -> TypeState {
        demand(self.try_subtract(left, right))
    }

    fn subtract_impl(&self, s1: &TypeState, s2: &TypeState) -> TypeState {
        let keep_null = s1.can_be_null() && !s2.can_be_null();
        match (s1, s2) {
            (TypeState::Empty, _) => TypeState::Empty,
            (_, TypeState::Empty) => s1.clone(),
            (TypeState::Null, _) => TypeState::Empty.for_can_be_null(keep_null),
            (_, TypeState::Null) => s1.for_can_be_null(false),

            (_, TypeState::AnyPrimitive) => TypeState::Empty,
            (TypeState::AnyPrimitive, TypeState::PrimitiveConstant(_)) => TypeState::AnyPrimitive,
            (TypeState::PrimitiveConstant(a), TypeState::PrimitiveConstant(b)) => {
                if a == b {
                    TypeState::Empty
                } else {
                    s1.clone()
                }
            }

            (TypeState::Constant(c), _) => {
                if s2.contains_type(c.constant().type_id()) {
                    TypeState::Empty.for_can_be_null(keep_null)
                } else {
                    s1.for_can_be_null(keep_null)
                }
            }
            (TypeState::Single(single), _) => {
                if s2.contains_type(single.type_id()) {
                    TypeState::Empty.for_can_be_null(keep_null)
                } else {
                    s1.for_can_be_null(keep_null)
                }
            }

            (TypeState::Multi(multi), _) if s2.exact_type().is_some() => {
                match s2.exact_type() {
                    Some(id) if multi.ids.contains(id) => self.state_for_set(
                        multi.ids.removed(id, self.config.compact_limit),
                        keep_null,
                    ),
                    _ => TypeState::Multi(multi.clone()).for_can_be_null(keep_null),
                }
            }

            (TypeState::Multi(m1), TypeState::Multi(m2)) => self.subtract_multi(m1, m2, keep_null),

            // Mixed primitive/reference pairs are rejected before dispatch.
            _ => unreachable!("operand kinds verified before dispatch"),
        }
    }

    fn subtract_multi(&self, m1: &MultiState, m2: &MultiState, keep_null: bool) -> TypeState {
        if Arc::ptr_eq(&m1.ids, &m2.ids) || m1.ids == m2.ids {
            return TypeState::Empty.for_can_be_null(keep_null);
        }
        if !m1.ids.intersects(&m2.ids) {
            return TypeState::Multi(m1.clone()).for_can_be_null(keep_null);
        }
        if m2.ids.is_superset(&m1.ids) {
            return TypeState::Empty.for_can_be_null(keep_null);
        }
        tracing::trace!(
            left = m1.ids.len(),
            right = m2.ids.len(),
            "subtraction fast paths missed; computing full difference"
        );
        self.state_for_set(m1.ids.subtract(&m2.ids, self.config.compact_limit), keep_null)
    }

    // ---- lifecycle and heuristics -----------------------------------------

    /// Propagate the allocation-site merge notification to every contained
    /// type, exactly once per distinct underlying value. `Empty`/`Null` are
    /// no-ops; constants and primitives reject the call.
    pub fn try_note_merge(&self, state: &TypeState) -> Result<(), ContractViolation> {
        match state {
            TypeState::Empty | TypeState::Null => Ok(()),
            TypeState::Single(s) => {
                if TypeState::mark_merged(&s.merged) {
                    tracing::debug!(%state, "type state merged into summary objects");
                    self.universe.note_type_merged(s.type_id());
                }
                Ok(())
            }
            TypeState::Multi(m) => {
                if TypeState::mark_merged(&m.merged) {
                    tracing::debug!(%state, "type state merged into summary objects");
                    for id in m.ids.iter() {
                        self.universe.note_type_merged(id);
                    }
                }
                Ok(())
            }
            TypeState::Constant(_) | TypeState::PrimitiveConstant(_) | TypeState::AnyPrimitive => {
                Err(ContractViolation::MergeNotApplicable(state.kind_name()))
            }
        }
    }

    pub fn note_merge(&self, state: &TypeState) {
        demand(self.try_note_merge(state));
    }

    /// Saturation heuristic: whether a growing state covers so much of the
    /// universe that widening it to "all instantiated types" would cost
    /// little precision.
    pub fn close_to_all_instantiated(&self, state: &TypeState) -> bool {
        let count = state.type_count();
        if count <= self.config.close_to_all_min_types {
            return false;
        }
        let total = self.universe.type_count();
        total > 0 && count as f64 / total as f64 > self.config.close_to_all_ratio
    }

    // ---- shared helpers ---------------------------------------------------

    /// Canonical state for a computed id set: cardinality 0 collapses to
    /// `Empty`/`Null`, 1 to `Single`, anything larger stays `Multi` with the
    /// backing normalized against the compact limit.
    fn state_for_set(&self, ids: TypeIdSet, can_be_null: bool) -> TypeState {
        if ids.len() >= 2 {
            let ids = ids.normalize(self.config.compact_limit);
            return TypeState::multi(Arc::new(ids), can_be_null);
        }
        match ids.first() {
            Some(id) => TypeState::single(id, can_be_null),
            None => TypeState::Empty.for_can_be_null(can_be_null),
        }
    }

    pub(crate) fn report(
        &self,
        op: OpKind,
        left: &TypeState,
        right: &TypeState,
        result: &TypeState,
    ) {
        if let Some(observer) = self.observer {
            observer.record_operation(op, left, right, result);
        }
    }
}

/// Drop exact-value precision, keeping the exact type.
fn erase_constant(state: &TypeState) -> TypeState {
    match state {
        TypeState::Constant(c) => TypeState::single(c.constant().type_id(), state.can_be_null()),
        _ => state.clone(),
    }
}

/// Reject operand pairs that mix the reference and primitive sub-lattices.
/// `Empty` is the shared bottom and combines with either side.
fn check_same_kind(
    op: &'static str,
    s1: &TypeState,
    s2: &TypeState,
) -> Result<(), ContractViolation> {
    let reference = |s: &TypeState| {
        matches!(
            s,
            TypeState::Null | TypeState::Single(_) | TypeState::Constant(_) | TypeState::Multi(_)
        )
    };
    if (s1.is_primitive() && reference(s2)) || (reference(s1) && s2.is_primitive()) {
        return Err(ContractViolation::MixedKinds {
            op,
            left: s1.kind_name(),
            right: s2.kind_name(),
        });
    }
    Ok(())
}

fn demand<T>(result: Result<T, ContractViolation>) -> T {
    match result {
        Ok(value) => value,
        Err(violation) => panic!("{violation}"),
    }
}
