//! Property tests for the lattice's algebraic laws
//!
//! Random reference-shaped states are generated from small abstract
//! descriptions and realized against a shared universe, then the laws of
//! union, intersection and subtraction are checked pairwise: commutativity,
//! idempotence, identity elements, nullability composition, monotonicity,
//! canonical form, constant erasure and representation transparency.

use std::collections::BTreeSet;

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use typeflow_core::prelude::*;
use typeflow_core::{BitVec, TypeState};

/// Number of classes in the test universe; generated ids are taken mod this.
const UNIVERSE: u32 = 24;

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for i in 0..UNIVERSE {
        registry.register(format!("C{i}"), TypeKind::Class);
    }
    registry
}

/// Abstract description of a reference-shaped state, realized per test run.
#[derive(Debug, Clone)]
enum StateDesc {
    Empty,
    Null,
    Constant { type_id: u32, payload: i64, can_be_null: bool },
    Types { ids: Vec<u32>, can_be_null: bool },
}

impl Arbitrary for StateDesc {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 6 {
            0 => StateDesc::Empty,
            1 => StateDesc::Null,
            2 => StateDesc::Constant {
                type_id: u32::arbitrary(g) % UNIVERSE,
                payload: i64::arbitrary(g) % 4,
                can_be_null: bool::arbitrary(g),
            },
            _ => StateDesc::Types {
                ids: Vec::<u32>::arbitrary(g)
                    .into_iter()
                    .map(|id| id % UNIVERSE)
                    .collect(),
                can_be_null: bool::arbitrary(g),
            },
        }
    }
}

fn realize(lattice: &Lattice<'_>, desc: &StateDesc) -> TypeState {
    match desc {
        StateDesc::Empty => TypeState::empty(),
        StateDesc::Null => TypeState::null_state(),
        StateDesc::Constant { type_id, payload, can_be_null } => {
            lattice.for_constant(Constant::new(TypeId(*type_id), *payload), *can_be_null)
        }
        StateDesc::Types { ids, can_be_null } => {
            let bits = BitVec::from_ids(ids.iter().map(|&id| TypeId(id)));
            lattice.for_exact_types(&bits, *can_be_null)
        }
    }
}

fn ids_of(state: &TypeState) -> BTreeSet<TypeId> {
    state.types().collect()
}

/// A result is canonical when its shape matches its cardinality.
fn is_canonical(state: &TypeState) -> bool {
    match state.type_count() {
        0 => state.is_empty() || state.is_null(),
        1 => state.exact_type().is_some(),
        n => matches!(state, TypeState::Multi(_)) && n >= 2,
    }
}

// ============================================================================
// Union laws
// ============================================================================

#[quickcheck]
fn prop_union_commutative(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    lattice.union(&a, &b) == lattice.union(&b, &a)
}

#[quickcheck]
fn prop_union_idempotent(a: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    lattice.union(&a, &a) == a
}

#[quickcheck]
fn prop_union_empty_is_identity(a: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    lattice.union(&TypeState::empty(), &a) == a && lattice.union(&a, &TypeState::empty()) == a
}

#[quickcheck]
fn prop_union_is_monotone(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    let u = lattice.union(&a, &b);
    let expected: BTreeSet<TypeId> = ids_of(&a).union(&ids_of(&b)).copied().collect();
    ids_of(&u) == expected
}

#[quickcheck]
fn prop_union_associative(a: StateDesc, b: StateDesc, c: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b, c) = (
        realize(&lattice, &a),
        realize(&lattice, &b),
        realize(&lattice, &c),
    );
    lattice.union(&lattice.union(&a, &b), &c) == lattice.union(&a, &lattice.union(&b, &c))
}

// ============================================================================
// Intersection and subtraction laws
// ============================================================================

#[quickcheck]
fn prop_intersect_empty_is_empty(a: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    lattice.intersect(&TypeState::empty(), &a).is_empty()
        && lattice.intersect(&a, &TypeState::empty()).is_empty()
}

#[quickcheck]
fn prop_intersect_self_is_identity(a: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    lattice.intersect(&a, &a) == a
}

#[quickcheck]
fn prop_subtract_self_is_empty(a: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    lattice.subtract(&a, &a).is_empty()
}

#[quickcheck]
fn prop_intersect_result_within_both(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    let i = lattice.intersect(&a, &b);
    let expected: BTreeSet<TypeId> = ids_of(&a).intersection(&ids_of(&b)).copied().collect();
    ids_of(&i) == expected
}

#[quickcheck]
fn prop_subtract_result_is_difference(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    let d = lattice.subtract(&a, &b);
    let expected: BTreeSet<TypeId> = ids_of(&a).difference(&ids_of(&b)).copied().collect();
    ids_of(&d) == expected
}

// ============================================================================
// Nullability composition
// ============================================================================

#[quickcheck]
fn prop_nullability_composition(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    lattice.union(&a, &b).can_be_null() == (a.can_be_null() || b.can_be_null())
        && lattice.intersect(&a, &b).can_be_null() == (a.can_be_null() && b.can_be_null())
        && lattice.subtract(&a, &b).can_be_null() == (a.can_be_null() && !b.can_be_null())
}

#[quickcheck]
fn prop_for_can_be_null_round_trip(a: StateDesc, want: bool) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let a = realize(&lattice, &a);
    let flipped = a.for_can_be_null(want);
    flipped.can_be_null() == want
        && ids_of(&flipped) == ids_of(&a)
        && flipped.for_can_be_null(want) == flipped
}

// ============================================================================
// Canonical form and representation transparency
// ============================================================================

#[quickcheck]
fn prop_results_are_canonical(a: StateDesc, b: StateDesc) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let (a, b) = (realize(&lattice, &a), realize(&lattice, &b));
    is_canonical(&lattice.union(&a, &b))
        && is_canonical(&lattice.intersect(&a, &b))
        && is_canonical(&lattice.subtract(&a, &b))
}

#[quickcheck]
fn prop_constant_erasure(type_id: u32, p1: i64, p2: i64) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let type_id = TypeId(type_id % UNIVERSE);
    let a = lattice.for_constant(Constant::new(type_id, p1), false);
    let b = lattice.for_constant(Constant::new(type_id, p2), false);
    let u = lattice.union(&a, &b);
    if p1 == p2 {
        u.as_constant() == Some(&Constant::new(type_id, p1))
    } else {
        u.as_constant().is_none() && u.exact_type() == Some(type_id) && u.type_count() == 1
    }
}

/// Building the same id set incrementally (compact path) and in one shot
/// from a bit-vector (dense path) must give value-equal states.
#[quickcheck]
fn prop_representation_transparency(ids: Vec<u32>, can_be_null: bool) -> bool {
    let registry = registry();
    let lattice = Lattice::new(&registry);
    let ids: BTreeSet<TypeId> = ids.into_iter().map(|id| TypeId(id % UNIVERSE)).collect();

    let incremental = ids
        .iter()
        .map(|&id| lattice.for_type(id, false))
        .fold(TypeState::empty(), |acc, s| lattice.union(&acc, &s))
        .for_can_be_null(can_be_null);
    let bulk = lattice.for_exact_types(&BitVec::from_ids(ids.iter().copied()), can_be_null);

    incremental == bulk && ids_of(&incremental) == ids
}
