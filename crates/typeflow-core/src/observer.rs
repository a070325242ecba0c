//! Optional instrumentation hook
//!
//! Statistics collection is an injectable collaborator, not a process-wide
//! static: the lattice reports every completed operation to the observer
//! when one is installed and is fully correct without one.

use crate::typestate::TypeState;

/// Which algebra operation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Union,
    Intersection,
    Subtraction,
    Filter,
}

/// Receiver for per-operation instrumentation events.
///
/// Implementations must tolerate concurrent calls from analysis worker
/// threads and must not rely on seeing every structurally-equal result
/// exactly once; redundant recomputation under races is allowed by the
/// lattice's referential transparency.
pub trait StateObserver: Send + Sync {
    fn record_operation(&self, op: OpKind, left: &TypeState, right: &TypeState, result: &TypeState);
}

/// Observer that discards all events; useful as an explicit placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn record_operation(&self, _op: OpKind, _left: &TypeState, _right: &TypeState, _result: &TypeState) {}
}
