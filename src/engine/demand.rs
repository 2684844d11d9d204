//! The Demand phase: what industries and classes want to buy this period.

use super::aggregates::{refresh_commodity_demand, sales_supply};
use super::PhaseContext;
use crate::domain::{
    Decimal, LabourResponse, Ledger, LedgerError, OwnerKind, SimulationParams, StockKey, StockType,
};
use tracing::{debug, info};

pub fn run(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    compute_productive_demand(ledger, ctx)?;
    let mode = ledger.global.labour_supply_response;
    register_labour_response(ledger, ctx, mode)?;
    compute_social_class_demand(ledger, ctx);
    Ok(())
}

/// Replenishment of every productive stock an industry needs at `output`,
/// and what it would cost at current prices.
fn cost_at(
    ledger: &Ledger,
    industry: &str,
    output: Decimal,
    params: &SimulationParams,
) -> Result<(Decimal, Vec<(StockKey, Decimal)>), LedgerError> {
    let mut cost = Decimal::zero();
    let mut demands = Vec::new();
    for stock in ledger
        .stocks_of_owner(OwnerKind::Industry, industry)
        .filter(|s| s.key.stock_type == StockType::Productive)
    {
        let commodity = ledger.commodity(&stock.key.commodity)?;
        let required =
            output * stock.production_coefficient * commodity.effective_turnover();
        // Negative when overstocked; nets against other demand for the commodity.
        let demand = params.round(required - stock.quantity);
        cost += demand * commodity.unit_price;
        demands.push((stock.key.clone(), demand));
    }
    Ok((params.round(cost), demands))
}

/// Set every industry's output to what it can finance and register the
/// input demand that output implies.
///
/// Resources are money in hand plus the price of unsold output. When the
/// inputs cost more, output is scaled back once in proportion; if even the
/// scaled output is unaffordable this is reported and the phase goes on.
pub fn compute_productive_demand(
    ledger: &mut Ledger,
    ctx: &PhaseContext<'_>,
) -> Result<(), LedgerError> {
    let params = ctx.params;
    for stock in ledger.stocks.values_mut() {
        stock.replenishment_demand = Decimal::zero();
    }

    for name in ledger.industry_names() {
        let industry = ledger.industry(&name)?;
        let proposed = industry.proposed_output;
        let anticipated_sales = ledger
            .sales_stock_key(OwnerKind::Industry, &name)
            .and_then(|k| ledger.stocks.get(&k))
            .map(|s| s.price)
            .unwrap_or_default();
        let resources = ledger.money_quantity(OwnerKind::Industry, &name) + anticipated_sales;

        let mut output = proposed;
        let (mut cost, mut demands) = cost_at(ledger, &name, output, params)?;

        if cost > resources + params.epsilon && cost.is_positive() {
            let affordable = resources.max(Decimal::zero());
            output = params.round(proposed * affordable / cost);
            (cost, demands) = cost_at(ledger, &name, output, params)?;
            info!(
                industry = %name,
                proposed = %proposed,
                output = %output,
                "Output scaled back to available funds"
            );
            if cost > resources + params.epsilon {
                ctx.warn(format!(
                    "Industry {} is unable to finance output {}: costs {} but has {}",
                    name, output, cost, resources
                ));
            }
        }

        debug!(industry = %name, output = %output, cost = %cost, "Productive demand computed");
        ledger.industry_mut(&name)?.output = output;
        for (key, demand) in demands {
            ledger.stock_mut(&key)?.replenishment_demand = demand;
        }
    }

    refresh_commodity_demand(ledger);
    Ok(())
}

/// Adjust the supply of labour power to demand and credit each class with
/// the wages its labour power will fetch.
///
/// Under `Flexible`, every seller's labour power grows by the same factor
/// when demand exceeds supply. Under `Fixed` the supply is left as it is
/// and acts as a constraint on output.
pub fn register_labour_response(
    ledger: &mut Ledger,
    ctx: &PhaseContext<'_>,
    mode: LabourResponse,
) -> Result<(), LedgerError> {
    let params = ctx.params;
    let Some(labour) = ledger.labour_power().map(|c| c.name.clone()) else {
        info!("No socially produced commodity; labour response skipped");
        return Ok(());
    };

    let demand: Decimal = ledger
        .stocks_of_commodity(&labour)
        .filter(|s| s.key.stock_type == StockType::Productive)
        .map(|s| s.replenishment_demand)
        .sum();
    let supply = sales_supply(ledger, &labour);

    if mode == LabourResponse::Flexible && demand > supply + params.epsilon {
        match demand.checked_div(supply).filter(|_| supply.is_positive()) {
            Some(ratio) => {
                let sellers: Vec<StockKey> = ledger
                    .stocks_of_commodity(&labour)
                    .filter(|s| s.key.stock_type == StockType::Sales)
                    .map(|s| s.key.clone())
                    .collect();
                for key in sellers {
                    let quantity = ledger.stock(&key)?.quantity * ratio;
                    ledger.modify_stock_to(&key, quantity, params)?;
                }
                info!(demand = %demand, supply = %supply, ratio = %ratio, "Labour supply expanded to demand");
            }
            None => ctx.warn(format!(
                "Demand for {} is {} but none is on offer",
                labour, demand
            )),
        }
    }

    for class in ledger.class_names() {
        let wages = ledger
            .stocks_of_owner(OwnerKind::SocialClass, &class)
            .filter(|s| s.key.stock_type == StockType::Sales && s.key.commodity == labour)
            .map(|s| s.price)
            .sum::<Decimal>();
        let record = ledger.class_mut(&class)?;
        record.revenue = params.round(wages + record.revenue);
    }

    refresh_commodity_demand(ledger);
    Ok(())
}

/// Each class wants `revenue × consumption coefficient` of every good it
/// consumes.
pub fn compute_social_class_demand(ledger: &mut Ledger, ctx: &PhaseContext<'_>) {
    let params = ctx.params;
    for (key, stock) in ledger.stocks.iter_mut() {
        if key.owner_kind != OwnerKind::SocialClass || key.stock_type != StockType::Consumption {
            continue;
        }
        let revenue = ledger
            .classes
            .get(&key.owner)
            .map(|c| c.revenue)
            .unwrap_or_default();
        stock.replenishment_demand = params.round(revenue * stock.consumption_coefficient);
    }

    refresh_commodity_demand(ledger);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::domain::Origin;

    fn industry_ledger(money: &str, existing_input: &str) -> Ledger {
        let mut ledger = empty_ledger();
        add_commodity(&mut ledger, "Means", Origin::IndustriallyProduced, "1", "1");
        add_commodity(&mut ledger, "Consumption", Origin::IndustriallyProduced, "1", "1");
        add_industry(&mut ledger, "Dept II", "Consumption", "100", money);
        add_input(&mut ledger, "Dept II", "Means", "2", existing_input);
        ledger
    }

    fn input_key() -> StockKey {
        stock_key(OwnerKind::Industry, "Dept II", StockType::Productive, "Means")
    }

    #[test]
    fn test_affordable_output_is_unchanged() {
        let mut ledger = industry_ledger("500", "0");
        let harness = Harness::new();

        compute_productive_demand(&mut ledger, &harness.ctx()).unwrap();

        assert_eq!(ledger.industry("Dept II").unwrap().output, d("100"));
        assert_eq!(ledger.stock(&input_key()).unwrap().replenishment_demand, d("200"));
        assert_eq!(ledger.commodity("Means").unwrap().replenishment_demand, d("200"));
        assert!(harness.reporter.warnings().is_empty());
    }

    #[test]
    fn test_existing_stock_reduces_demand() {
        let mut ledger = industry_ledger("500", "30");
        let harness = Harness::new();

        compute_productive_demand(&mut ledger, &harness.ctx()).unwrap();

        assert_eq!(ledger.stock(&input_key()).unwrap().replenishment_demand, d("170"));
    }

    #[test]
    fn test_unaffordable_output_is_scaled_back() {
        let mut ledger = industry_ledger("50", "0");
        let harness = Harness::new();

        compute_productive_demand(&mut ledger, &harness.ctx()).unwrap();

        let output = ledger.industry("Dept II").unwrap().output;
        assert_eq!(output, d("25"));
        let (cost, _) = cost_at(&ledger, "Dept II", output, &harness.params).unwrap();
        assert!(cost <= d("50") + harness.params.epsilon);
        assert!(harness.reporter.warnings().is_empty());
        // Proposed output is kept for the next period's attempt.
        assert_eq!(ledger.industry("Dept II").unwrap().proposed_output, d("100"));
    }

    #[test]
    fn test_unsold_output_counts_toward_resources() {
        // 100 in money plus 100 units of unsold output at price 1.
        let mut ledger = industry_ledger("100", "0");
        set_stock(
            &mut ledger,
            stock_key(OwnerKind::Industry, "Dept II", StockType::Sales, "Consumption"),
            "100",
        );
        let harness = Harness::new();

        compute_productive_demand(&mut ledger, &harness.ctx()).unwrap();

        assert_eq!(ledger.industry("Dept II").unwrap().output, d("100"));
        assert_eq!(ledger.stock(&input_key()).unwrap().replenishment_demand, d("200"));
        assert!(harness.reporter.warnings().is_empty());
    }

    #[test]
    fn test_overdrawn_input_still_unaffordable_after_scaling() {
        // An overdrawn input adds a fixed 10 to the cost at any output, so
        // scaling by resources / cost falls short.
        let mut ledger = industry_ledger("100", "-10");
        let harness = Harness::new();

        compute_productive_demand(&mut ledger, &harness.ctx()).unwrap();

        // 100 × 100 / 210, rounded.
        assert_eq!(ledger.industry("Dept II").unwrap().output, d("47.619"));
        assert_eq!(ledger.stock(&input_key()).unwrap().replenishment_demand, d("105.238"));
        assert_eq!(harness.reporter.warnings().len(), 1);
        assert!(harness.reporter.warnings()[0].contains("unable to finance"));
    }

    fn labour_ledger(sellers: &[(&str, &str)]) -> Ledger {
        let mut ledger = empty_ledger();
        add_commodity(&mut ledger, "Labour Power", Origin::SociallyProduced, "1", "1");
        add_commodity(&mut ledger, "Consumption", Origin::IndustriallyProduced, "1", "1");
        add_industry(&mut ledger, "Dept II", "Consumption", "100", "1000");
        add_input(&mut ledger, "Dept II", "Labour Power", "1.2", "0");
        for (class, supply) in sellers {
            add_class(&mut ledger, class, "0");
            add_class_stock(&mut ledger, class, StockType::Sales, "Labour Power", supply, "0");
        }
        ledger
    }

    fn labour_supply_of(ledger: &Ledger, class: &str) -> Decimal {
        ledger
            .stock(&stock_key(OwnerKind::SocialClass, class, StockType::Sales, "Labour Power"))
            .unwrap()
            .quantity
    }

    #[test]
    fn test_flexible_labour_expands_every_seller() {
        let mut ledger = labour_ledger(&[("Peasants", "40"), ("Workers", "60")]);
        let harness = Harness::new();
        let ctx = harness.ctx();

        compute_productive_demand(&mut ledger, &ctx).unwrap();
        register_labour_response(&mut ledger, &ctx, LabourResponse::Flexible).unwrap();

        assert_eq!(labour_supply_of(&ledger, "Peasants"), d("48"));
        assert_eq!(labour_supply_of(&ledger, "Workers"), d("72"));
        // Wages are the price of the labour power on offer.
        assert_eq!(ledger.class("Workers").unwrap().revenue, d("72"));
    }

    #[test]
    fn test_fixed_labour_leaves_supply() {
        let mut ledger = labour_ledger(&[("Workers", "100")]);
        let harness = Harness::new();
        let ctx = harness.ctx();

        compute_productive_demand(&mut ledger, &ctx).unwrap();
        register_labour_response(&mut ledger, &ctx, LabourResponse::Fixed).unwrap();

        assert_eq!(labour_supply_of(&ledger, "Workers"), d("100"));
        assert_eq!(ledger.class("Workers").unwrap().revenue, d("100"));
    }

    #[test]
    fn test_class_demand_is_share_of_revenue() {
        let mut ledger = empty_ledger();
        add_commodity(&mut ledger, "Consumption", Origin::IndustriallyProduced, "1", "1");
        add_class(&mut ledger, "Workers", "100").revenue = d("80");
        add_class_stock(&mut ledger, "Workers", StockType::Consumption, "Consumption", "0", "0.5");
        let harness = Harness::new();

        compute_social_class_demand(&mut ledger, &harness.ctx());

        let key = stock_key(OwnerKind::SocialClass, "Workers", StockType::Consumption, "Consumption");
        assert_eq!(ledger.stock(&key).unwrap().replenishment_demand, d("40"));
        assert_eq!(ledger.commodity("Consumption").unwrap().replenishment_demand, d("40"));
    }
}
