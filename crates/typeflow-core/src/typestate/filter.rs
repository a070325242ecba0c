//! Primitive comparison filtering
//!
//! Conditional branches on primitive values narrow the branched-on flow:
//! given `left <op> right`, the filtered state is "`left`, restricted to the
//! values satisfying the comparison". With only constants and the saturated
//! top in the primitive sub-lattice, narrowing is possible in exactly two
//! situations: both sides are constants (the relation is decided statically)
//! or the operator is `Eq` against a constant (the unknown side must be that
//! constant). Everything else returns the left operand unchanged.

use serde::{Deserialize, Serialize};

use super::state::TypeState;
use crate::error::ContractViolation;
use crate::observer::OpKind;

/// Relational operator of a primitive branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveComparison {
    Eq,
    Neq,
    Lt,
    Ge,
    Gt,
    Le,
}

impl PrimitiveComparison {
    fn holds<T: Ord>(self, left: T, right: T) -> bool {
        match self {
            PrimitiveComparison::Eq => left == right,
            PrimitiveComparison::Neq => left != right,
            PrimitiveComparison::Lt => left < right,
            PrimitiveComparison::Ge => left >= right,
            PrimitiveComparison::Gt => left > right,
            PrimitiveComparison::Le => left <= right,
        }
    }

    /// Evaluate the relation between two payloads, either as signed values
    /// or over their raw 64-bit patterns.
    fn evaluate(self, left: i64, right: i64, unsigned: bool) -> bool {
        if unsigned {
            self.holds(left as u64, right as u64)
        } else {
            self.holds(left, right)
        }
    }
}

impl super::ops::Lattice<'_> {
    /// Restrict `left` to the values satisfying `left <op> right`.
    ///
    /// Both operands must be primitive-shaped (or `Empty`); reference shapes
    /// are a caller-contract violation.
    pub fn try_filter_primitive(
        &self,
        left: &TypeState,
        op: PrimitiveComparison,
        unsigned: bool,
        right: &TypeState,
    ) -> Result<TypeState, ContractViolation> {
        for operand in [left, right] {
            if !operand.is_primitive() && !operand.is_empty() {
                return Err(ContractViolation::NonPrimitiveFilter(operand.kind_name()));
            }
        }
        let result = filter_impl(left, op, unsigned, right);
        self.report(OpKind::Filter, left, right, &result);
        Ok(result)
    }

    /// Panicking variant of [`try_filter_primitive`](Self::try_filter_primitive).
    pub fn filter_primitive(
        &self,
        left: &TypeState,
        op: PrimitiveComparison,
        unsigned: bool,
        right: &TypeState,
    ) -> TypeState {
        match self.try_filter_primitive(left, op, unsigned, right) {
            Ok(state) => state,
            Err(violation) => panic!("{violation}"),
        }
    }
}

fn filter_impl(
    left: &TypeState,
    op: PrimitiveComparison,
    unsigned: bool,
    right: &TypeState,
) -> TypeState {
    match (left, right) {
        // No values on one side means no values satisfy the comparison.
        (TypeState::Empty, _) | (_, TypeState::Empty) => TypeState::Empty,

        (TypeState::PrimitiveConstant(a), TypeState::PrimitiveConstant(b)) => {
            if op.evaluate(*a, *b, unsigned) {
                left.clone()
            } else {
                TypeState::Empty
            }
        }

        // Equality against a known constant pins the unknown side to it.
        (TypeState::AnyPrimitive, TypeState::PrimitiveConstant(_)) if op == PrimitiveComparison::Eq => {
            right.clone()
        }
        (TypeState::PrimitiveConstant(_), TypeState::AnyPrimitive) if op == PrimitiveComparison::Eq => {
            left.clone()
        }

        // No other operator can narrow a saturated operand.
        _ => left.clone(),
    }
}
