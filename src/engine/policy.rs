//! Pluggable price and distribution dynamics.

use super::{distribute, produce, PhaseContext};
use crate::domain::{Ledger, LedgerError, PriceDynamics};
use thiserror::Error;

/// Behaviour of the Prices, Revenue and Accumulate phases.
pub trait DistributionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn reprice(&self, ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError>;

    fn distribute_revenue(
        &self,
        ledger: &mut Ledger,
        ctx: &PhaseContext<'_>,
    ) -> Result<(), LedgerError>;

    fn accumulate(&self, ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError>;
}

/// Prices track values; a fixed share of profit becomes revenue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplePolicy;

impl DistributionPolicy for SimplePolicy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn reprice(&self, ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
        produce::revalue_commodities(ledger, ctx)
    }

    fn distribute_revenue(
        &self,
        ledger: &mut Ledger,
        ctx: &PhaseContext<'_>,
    ) -> Result<(), LedgerError> {
        distribute::distribute_revenue(ledger, ctx)
    }

    fn accumulate(&self, ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
        distribute::accumulate(ledger, ctx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("price dynamics '{0}' is not supported; choose 'simple'")]
pub struct UnsupportedPolicy(pub PriceDynamics);

static SIMPLE: SimplePolicy = SimplePolicy;

/// Select the policy for a project's price dynamics.
pub fn policy_for(
    dynamics: PriceDynamics,
) -> Result<&'static dyn DistributionPolicy, UnsupportedPolicy> {
    match dynamics {
        PriceDynamics::Simple => Ok(&SIMPLE),
        PriceDynamics::Equalize | PriceDynamics::Dynamic => Err(UnsupportedPolicy(dynamics)),
    }
}
