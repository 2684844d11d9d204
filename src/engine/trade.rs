//! The Trade phase: paired goods-for-money settlements.
//!
//! All productive purchases complete before any class buys consumer goods.

use super::PhaseContext;
use crate::domain::{Decimal, Ledger, LedgerError, OwnerKind, StockKey, StockType};
use tracing::debug;

pub fn run(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    productive_purchases(ledger, ctx)?;
    consumption_purchases(ledger, ctx)
}

/// A seller's sales stock and the money stock that receives payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub sales: StockKey,
    pub money: StockKey,
}

/// Find who sells a commodity.
///
/// Industrially produced goods are sold by the industry producing them.
/// Labour power is bought from the first class, in key order, that has any
/// on offer; the remaining classes are not consulted.
pub fn find_seller(ledger: &Ledger, commodity: &str) -> Result<Option<Seller>, LedgerError> {
    let socially_produced = ledger.commodity(commodity)?.is_socially_produced();

    let candidate = if socially_produced {
        ledger
            .stocks_of_commodity(commodity)
            .find(|s| {
                s.key.owner_kind == OwnerKind::SocialClass
                    && s.key.stock_type == StockType::Sales
                    && s.quantity.is_positive()
            })
            .map(|s| (OwnerKind::SocialClass, s.key.owner.clone(), s.key.clone()))
    } else {
        ledger.industry_producing(commodity).and_then(|industry| {
            ledger
                .stock_keys(OwnerKind::Industry, &industry.name, StockType::Sales)
                .into_iter()
                .find(|k| k.commodity == commodity)
                .map(|k| (OwnerKind::Industry, industry.name.clone(), k))
        })
    };

    match candidate {
        Some((kind, owner, sales)) => Ok(Some(Seller {
            money: ledger.money_stock_key(kind, &owner)?,
            sales,
        })),
        None => Ok(None),
    }
}

fn purchases_of(ledger: &Ledger, owner_kind: OwnerKind, stock_type: StockType) -> Vec<StockKey> {
    ledger
        .stocks
        .values()
        .filter(|s| s.key.owner_kind == owner_kind && s.key.stock_type == stock_type)
        .filter(|s| s.replenishment_demand.is_positive())
        .map(|s| s.key.clone())
        .collect()
}

/// Every industry buys the allocated demand of each productive stock.
///
/// Goods and money move together; if either leg cannot be made the purchase
/// is dropped whole and reported.
pub fn productive_purchases(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;
    for buyer in purchases_of(ledger, OwnerKind::Industry, StockType::Productive) {
        let quantity = ledger.stock(&buyer)?.replenishment_demand;
        if quantity <= params.epsilon {
            continue;
        }

        let Some(seller) = find_seller(ledger, &buyer.commodity)? else {
            ctx.warn(format!(
                "No seller of {} for industry {}",
                buyer.commodity, buyer.owner
            ));
            continue;
        };

        let unit_price = ledger.commodity(&buyer.commodity)?.unit_price;
        let amount = params.round(quantity * unit_price);
        let buyer_money = ledger.money_stock_key(OwnerKind::Industry, &buyer.owner)?;

        match ledger.settle(
            (&seller.sales, &buyer),
            quantity,
            (&buyer_money, &seller.money),
            amount,
            params,
        ) {
            Ok(()) => debug!(
                buyer = %buyer.owner,
                seller = %seller.sales.owner,
                commodity = %buyer.commodity,
                quantity = %quantity,
                amount = %amount,
                "Productive purchase settled"
            ),
            Err(e) => ctx.warn(format!(
                "Purchase of {} {} by industry {} aborted: {}",
                quantity, buyer.commodity, buyer.owner, e
            )),
        }
    }
    Ok(())
}

/// Every class buys its allocated demand of each consumer good, as far as
/// its money reaches, and spends its revenue accordingly.
pub fn consumption_purchases(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    let params = ctx.params;

    for class in ledger.class_names() {
        let revenue = ledger.class(&class)?.revenue;
        let money = ledger.money_quantity(OwnerKind::SocialClass, &class);
        if revenue > money + params.epsilon {
            ctx.warn(format!(
                "Class {} has revenue {} but only {} money",
                class, revenue, money
            ));
        }
    }

    for buyer in purchases_of(ledger, OwnerKind::SocialClass, StockType::Consumption) {
        let demand = ledger.stock(&buyer)?.replenishment_demand;
        let Some(seller) = find_seller(ledger, &buyer.commodity)? else {
            ctx.warn(format!(
                "No seller of {} for class {}",
                buyer.commodity, buyer.owner
            ));
            continue;
        };

        let unit_price = ledger.commodity(&buyer.commodity)?.unit_price;
        let money = ledger.money_quantity(OwnerKind::SocialClass, &buyer.owner);
        let mut quantity = demand;
        if demand * unit_price > money + params.epsilon {
            quantity = money
                .checked_div(unit_price)
                .map(|q| q.trunc_to(params.rounding_places))
                .unwrap_or(demand)
                .max(Decimal::zero());
            ctx.warn(format!(
                "Class {} cannot afford {} {}; buying {} instead",
                buyer.owner, demand, buyer.commodity, quantity
            ));
        }
        if !quantity.is_positive() {
            continue;
        }

        let amount = params.round(quantity * unit_price);
        let buyer_money = ledger.money_stock_key(OwnerKind::SocialClass, &buyer.owner)?;
        match ledger.settle(
            (&seller.sales, &buyer),
            quantity,
            (&buyer_money, &seller.money),
            amount,
            params,
        ) {
            Ok(()) => {
                let class = ledger.class_mut(&buyer.owner)?;
                class.revenue = params.round(class.revenue - amount);
                debug!(
                    buyer = %buyer.owner,
                    commodity = %buyer.commodity,
                    quantity = %quantity,
                    amount = %amount,
                    "Consumption purchase settled"
                );
            }
            Err(e) => ctx.warn(format!(
                "Purchase of {} {} by class {} aborted: {}",
                quantity, buyer.commodity, buyer.owner, e
            )),
        }
    }
    Ok(())
}
