use super::{CommodityFunction, Decimal, Origin};
use serde::{Deserialize, Serialize};

/// One type of tradeable good, labour power, or money.
///
/// The per-period accumulators (`stock_used_up`, `stock_produced`,
/// `surplus_product`) are reset at the start of every production phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    pub name: String,
    pub origin: Origin,
    pub function: CommodityFunction,
    pub unit_value: Decimal,
    pub unit_price: Decimal,
    pub turnover_time: Decimal,
    /// Sum of the replenishment demand of every stock of this commodity.
    pub replenishment_demand: Decimal,
    /// Share of demand that supply can satisfy, set by the Constrain phase.
    pub allocation_share: Decimal,
    pub stock_used_up: Decimal,
    pub stock_produced: Decimal,
    pub surplus_product: Decimal,
}

impl Commodity {
    pub fn new(
        name: impl Into<String>,
        origin: Origin,
        function: CommodityFunction,
        unit_value: Decimal,
        unit_price: Decimal,
        turnover_time: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            origin,
            function,
            unit_value,
            unit_price,
            turnover_time,
            replenishment_demand: Decimal::zero(),
            allocation_share: Decimal::one(),
            stock_used_up: Decimal::zero(),
            stock_produced: Decimal::zero(),
            surplus_product: Decimal::zero(),
        }
    }

    pub fn is_socially_produced(&self) -> bool {
        self.origin == Origin::SociallyProduced
    }

    pub fn is_industrially_produced(&self) -> bool {
        self.origin == Origin::IndustriallyProduced
    }

    /// Turnover time, treating a non-positive value as a single period.
    pub fn effective_turnover(&self) -> Decimal {
        if self.turnover_time.is_positive() {
            self.turnover_time
        } else {
            Decimal::one()
        }
    }

    pub fn reset_production_accumulators(&mut self) {
        self.stock_used_up = Decimal::zero();
        self.stock_produced = Decimal::zero();
    }
}
