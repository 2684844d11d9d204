//! The phase engine and the per-phase accounting.
//!
//! Phase computations are plain functions over an in-memory [`Ledger`];
//! only [`Session`] touches the store.
//!
//! [`Ledger`]: crate::domain::Ledger

pub mod aggregates;
pub mod comparator;
pub mod constrain;
pub mod demand;
pub mod distribute;
pub mod phase;
pub mod policy;
pub mod produce;
pub mod session;
pub mod trade;

#[cfg(test)]
pub(crate) mod test_support;

pub use comparator::{resolve_comparator, ComparatorMode, ParseComparatorError};
pub use phase::{
    PhaseAction, PhaseContext, PhaseDescriptor, PhaseGraph, PhaseGraphBuilder, PhaseGraphError,
    PhaseId, UnknownPhase,
};
pub use policy::{policy_for, DistributionPolicy, SimplePolicy, UnsupportedPolicy};
pub use session::{Session, SessionError};
