//! Distribution-stage phases: profit paid out as revenue, the rest kept.

use super::aggregates::{record_profits, set_capitals};
use super::PhaseContext;
use crate::domain::{Decimal, Ledger, LedgerError, OwnerKind};
use tracing::{debug, info};

/// Pay `profit × revenue share` of every profitable industry to the classes
/// holding property, in proportion to their property shares.
///
/// A payout larger than the industry's money is cut to what it holds.
pub fn distribute_revenue(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    record_profits(ledger);

    let owners: Vec<(String, Decimal)> = ledger
        .classes
        .values()
        .filter(|c| c.property_share.is_positive())
        .map(|c| (c.name.clone(), c.property_share))
        .collect();
    let total_share: Decimal = owners.iter().map(|(_, share)| *share).sum();
    let revenue_share = ledger.global.revenue_share;

    for name in ledger.industry_names() {
        let profit = ledger.industry(&name)?.profit;
        if profit <= params.epsilon {
            continue;
        }
        if owners.is_empty() {
            ctx.warn(format!(
                "Industry {} made a profit of {} but no class holds property",
                name, profit
            ));
            continue;
        }

        let mut amount = params.round(profit * revenue_share);
        let money = ledger.money_quantity(OwnerKind::Industry, &name);
        if amount > money + params.epsilon {
            ctx.warn(format!(
                "Industry {} owes {} in revenue but holds only {}",
                name, amount, money
            ));
            amount = money.max(Decimal::zero());
        }

        let from = ledger.money_stock_key(OwnerKind::Industry, &name)?;
        let mut paid = Decimal::zero();
        for (index, (class, share)) in owners.iter().enumerate() {
            // The last owner takes the remainder so rounding loses nothing.
            let part = if index + 1 == owners.len() {
                (amount - paid).max(Decimal::zero())
            } else {
                params.round(amount * *share / total_share)
            };
            let to = ledger.money_stock_key(OwnerKind::SocialClass, class)?;
            ledger.transfer(&from, &to, part, params)?;
            let record = ledger.class_mut(class)?;
            record.revenue = params.round(record.revenue + part);
            paid += part;
            debug!(industry = %name, class = %class, amount = %part, "Revenue paid");
        }
        info!(industry = %name, profit = %profit, paid = %paid, "Profit distributed");
    }
    Ok(())
}

/// Close the period: next period aims at this period's output, and capital
/// is re-based for the next profit calculation.
pub fn accumulate(ledger: &mut Ledger, _ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    for industry in ledger.industries.values_mut() {
        industry.proposed_output = industry.output;
        industry.profit = Decimal::zero();
    }
    set_capitals(ledger);
    Ok(())
}
