//! Production-stage phases: industries produce, prices follow values,
//! classes consume.

use super::aggregates::{commodity_totals, record_profits};
use super::PhaseContext;
use crate::domain::{Decimal, Ledger, LedgerError, OwnerKind, StockKey, StockType};
use tracing::{debug, info};

/// Turn inputs into output.
///
/// Inputs are used up at `output × coefficient`. Labour power adds value at
/// the MELT; every other input passes on its own unit value. The sales stock
/// grows by output and receives the value added directly. Surplus can only
/// be known once every industry has produced, so it is computed last.
pub fn run(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    for commodity in ledger.commodities.values_mut() {
        commodity.reset_production_accumulators();
    }
    let melt = ledger.global.melt;

    for name in ledger.industry_names() {
        let industry = ledger.industry(&name)?;
        let output = industry.output;
        let output_commodity = industry.commodity.clone();

        let inputs: Vec<StockKey> = ledger.stock_keys(OwnerKind::Industry, &name, StockType::Productive);
        let mut value_added = Decimal::zero();
        for key in inputs {
            let coefficient = ledger.stock(&key)?.production_coefficient;
            let commodity = ledger.commodity(&key.commodity)?;
            let used = params.round(output * coefficient);
            value_added += if commodity.is_socially_produced() {
                used * melt
            } else {
                used * commodity.unit_value
            };

            ledger.modify_stock_by(&key, -used, params)?;
            let remaining = ledger.stock(&key)?.quantity;
            if remaining < -params.epsilon {
                ctx.warn(format!(
                    "Industry {} used {} of {} but only had {}",
                    name,
                    used,
                    key.commodity,
                    remaining + used
                ));
            }
            ledger.commodity_mut(&key.commodity)?.stock_used_up += used;
        }

        let Some(sales) = ledger
            .stock_keys(OwnerKind::Industry, &name, StockType::Sales)
            .into_iter()
            .find(|k| k.commodity == output_commodity)
        else {
            ctx.warn(format!("Industry {} has no sales stock of {}", name, output_commodity));
            continue;
        };

        let value_added = params.round(value_added);
        let commodity = ledger
            .commodities
            .get(&output_commodity)
            .ok_or_else(|| LedgerError::MissingCommodity(output_commodity.clone()))?;
        let stock = ledger
            .stocks
            .get_mut(&sales)
            .ok_or_else(|| LedgerError::MissingStock(sales.natural_key()))?;
        stock.add_output(output, value_added, commodity, params.rounding_places);
        ledger.commodity_mut(&output_commodity)?.stock_produced += output;

        debug!(industry = %name, output = %output, value_added = %value_added, "Industry produced");
    }

    for commodity in ledger.commodities.values_mut() {
        if commodity.is_industrially_produced() {
            commodity.surplus_product = commodity.stock_produced - commodity.stock_used_up;
        }
    }

    record_profits(ledger);
    Ok(())
}

/// Bring unit values back in line with the value now embodied in each
/// industrially produced commodity, move unit prices in proportion, and
/// revalue every stock.
pub fn revalue_commodities(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    let names: Vec<String> = ledger
        .commodities
        .values()
        .filter(|c| c.is_industrially_produced())
        .map(|c| c.name.clone())
        .collect();

    for name in names {
        let totals = commodity_totals(ledger, &name);
        let Some(unit_value) = totals.value.checked_div(totals.quantity) else {
            continue;
        };
        let unit_value = params.round(unit_value);

        let commodity = ledger.commodity_mut(&name)?;
        let old_value = commodity.unit_value;
        commodity.unit_price = match commodity.unit_price.checked_div(old_value) {
            Some(ratio) if old_value.is_positive() => params.round(unit_value * ratio),
            _ => unit_value,
        };
        commodity.unit_value = unit_value;
        debug!(commodity = %name, unit_value = %unit_value, unit_price = %commodity.unit_price, "Commodity revalued");

        let keys: Vec<StockKey> = ledger
            .stocks_of_commodity(&name)
            .map(|s| s.key.clone())
            .collect();
        for key in keys {
            let quantity = ledger.stock(&key)?.quantity;
            ledger.modify_stock_to(&key, quantity, params)?;
        }
    }

    record_profits(ledger);
    Ok(())
}

/// Classes consume a turnover's worth of each consumption stock, and those
/// that sell labour power regain their normal supply of it.
pub fn reproduce(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    let consumption: Vec<StockKey> = ledger
        .stocks
        .keys()
        .filter(|k| k.owner_kind == OwnerKind::SocialClass && k.stock_type == StockType::Consumption)
        .cloned()
        .collect();

    for key in consumption {
        let turnover = ledger.commodity(&key.commodity)?.effective_turnover();
        let quantity = ledger.stock(&key)?.quantity;
        let used = quantity
            .checked_div(turnover)
            .map(|u| params.round(u))
            .unwrap_or(quantity);
        ledger.modify_stock_by(&key, -used, params)?;
        ledger.commodity_mut(&key.commodity)?.stock_used_up += used;
    }

    let Some(labour) = ledger.labour_power().map(|c| c.name.clone()) else {
        return Ok(());
    };
    for class in ledger.class_names() {
        let record = ledger.class(&class)?;
        if !record.population.is_positive() {
            continue;
        }
        let supply = params.round(record.labour_supply());
        let sales: Vec<StockKey> = ledger
            .stock_keys(OwnerKind::SocialClass, &class, StockType::Sales)
            .into_iter()
            .filter(|k| k.commodity == labour)
            .collect();
        for key in sales {
            ledger.modify_stock_to(&key, supply, params)?;
            info!(class = %class, supply = %supply, "Labour power restored");
        }
    }
    Ok(())
}
