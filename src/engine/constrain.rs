//! The Constrain phase: ration scarce supply and cut output to match.

use super::aggregates::{refresh_commodity_demand, sales_supply};
use super::PhaseContext;
use crate::domain::{Decimal, Ledger, LedgerError, OwnerKind, StockType};
use tracing::info;

pub fn run(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    allocate_supply(ledger, ctx);
    constrain_output(ledger, ctx)
}

/// Where demand exceeds what is on sale, scale every positive demand for the
/// commodity by the same share.
pub fn allocate_supply(ledger: &mut Ledger, ctx: &PhaseContext<'_>) {
    let params = ctx.params;
    let names: Vec<String> = ledger.commodities.keys().cloned().collect();

    for name in names {
        let has_sellers = ledger
            .stocks_of_commodity(&name)
            .any(|s| s.key.stock_type == StockType::Sales);
        if !has_sellers {
            continue;
        }

        let supply = sales_supply(ledger, &name);
        let demand: Decimal = ledger
            .stocks_of_commodity(&name)
            .map(|s| s.replenishment_demand)
            .filter(|d| d.is_positive())
            .sum();

        let share = if demand > supply + params.epsilon {
            // Truncated so the rationed demands never add up to more than
            // the supply.
            let share = supply
                .checked_div(demand)
                .map(|s| s.trunc_to(params.rounding_places))
                .unwrap_or_default();
            info!(commodity = %name, supply = %supply, demand = %demand, share = %share, "Demand rationed");
            for stock in ledger.stocks.values_mut() {
                if stock.key.commodity == name && stock.replenishment_demand.is_positive() {
                    stock.replenishment_demand =
                        (stock.replenishment_demand * share).trunc_to(params.rounding_places);
                }
            }
            share
        } else {
            Decimal::one()
        };

        if let Some(commodity) = ledger.commodities.get_mut(&name) {
            commodity.allocation_share = share;
        }
    }

    refresh_commodity_demand(ledger);
}

/// Reduce each industry's output to what its allocated inputs can support.
pub fn constrain_output(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    for name in ledger.industry_names() {
        let current = ledger.industry(&name)?.output;
        let mut supported = current;

        for stock in ledger
            .stocks_of_owner(OwnerKind::Industry, &name)
            .filter(|s| s.key.stock_type == StockType::Productive)
            .filter(|s| s.production_coefficient.is_positive())
        {
            let commodity = ledger.commodity(&stock.key.commodity)?;
            let available = stock.quantity + stock.replenishment_demand.max(Decimal::zero());
            let per_unit = stock.production_coefficient * commodity.effective_turnover();
            if let Some(limit) = available.checked_div(per_unit) {
                supported = supported.min(limit);
            }
        }

        let supported = params.round(supported.max(Decimal::zero()));
        if supported < current {
            info!(industry = %name, from = %current, to = %supported, "Output constrained by input supply");
            ledger.industry_mut(&name)?.output = supported;
        }
    }
    Ok(())
}
