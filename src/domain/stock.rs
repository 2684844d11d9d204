use super::{Commodity, Decimal, OwnerKind, StockType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural key of a stock within one version.
///
/// Field order defines iteration order in a [`super::Ledger`]: industries
/// before classes, then by owner name, stock type and commodity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub owner_kind: OwnerKind,
    pub owner: String,
    pub stock_type: StockType,
    pub commodity: String,
}

impl StockKey {
    pub fn new(
        owner_kind: OwnerKind,
        owner: impl Into<String>,
        stock_type: StockType,
        commodity: impl Into<String>,
    ) -> Self {
        Self {
            owner_kind,
            owner: owner.into(),
            stock_type,
            commodity: commodity.into(),
        }
    }

    pub fn money(owner_kind: OwnerKind, owner: &str, money_commodity: &str) -> Self {
        Self::new(owner_kind, owner, StockType::Money, money_commodity)
    }

    /// Canonical string form, unique per version.
    pub fn natural_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.owner_kind, self.owner, self.stock_type, self.commodity
        )
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.natural_key())
    }
}

/// A quantity of one commodity held by one owner for one purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub key: StockKey,
    pub quantity: Decimal,
    pub value: Decimal,
    pub price: Decimal,
    /// Quantity required per unit of the owner's output (productive stocks).
    pub production_coefficient: Decimal,
    /// Quantity bought per unit of the owner's revenue (consumption stocks).
    pub consumption_coefficient: Decimal,
    /// Quantity the owner wishes to acquire this period. Recomputed each period.
    pub replenishment_demand: Decimal,
}

impl Stock {
    pub fn new(key: StockKey, quantity: Decimal) -> Self {
        Self {
            key,
            quantity,
            value: Decimal::zero(),
            price: Decimal::zero(),
            production_coefficient: Decimal::zero(),
            consumption_coefficient: Decimal::zero(),
            replenishment_demand: Decimal::zero(),
        }
    }

    pub fn with_production_coefficient(mut self, coefficient: Decimal) -> Self {
        self.production_coefficient = coefficient;
        self
    }

    pub fn with_consumption_coefficient(mut self, coefficient: Decimal) -> Self {
        self.consumption_coefficient = coefficient;
        self
    }

    pub fn stock_type(&self) -> StockType {
        self.key.stock_type
    }

    pub fn commodity_name(&self) -> &str {
        &self.key.commodity
    }

    /// Change the quantity by `delta` and re-derive value and price from the
    /// commodity's current unit value and unit price.
    pub fn modify_by(&mut self, delta: Decimal, commodity: &Commodity, places: u32) {
        let quantity = self.quantity + delta;
        self.modify_to(quantity, commodity, places);
    }

    /// Set the quantity and re-derive value and price.
    pub fn modify_to(&mut self, quantity: Decimal, commodity: &Commodity, places: u32) {
        self.quantity = quantity.round_to(places);
        self.value = (self.quantity * commodity.unit_value).round_to(places);
        self.price = (self.quantity * commodity.unit_price).round_to(places);
    }

    /// Grow the stock by newly produced output carrying `value_added`.
    ///
    /// Value is assigned directly rather than derived from unit value; the
    /// commodity's unit value catches up in the Prices phase.
    pub fn add_output(
        &mut self,
        quantity: Decimal,
        value_added: Decimal,
        commodity: &Commodity,
        places: u32,
    ) {
        self.quantity = (self.quantity + quantity).round_to(places);
        self.value = (self.value + value_added).round_to(places);
        self.price = (self.price + quantity * commodity.unit_price).round_to(places);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommodityFunction, Origin};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn corn() -> Commodity {
        Commodity::new(
            "Corn",
            Origin::IndustriallyProduced,
            CommodityFunction::ProductiveInput,
            d("2"),
            d("3"),
            Decimal::one(),
        )
    }

    #[test]
    fn test_modify_by_keeps_value_and_price_proportional() {
        let key = StockKey::new(OwnerKind::Industry, "Farming", StockType::Sales, "Corn");
        let mut stock = Stock::new(key, d("10"));
        stock.modify_by(d("5"), &corn(), 4);

        assert_eq!(stock.quantity, d("15"));
        assert_eq!(stock.value, d("30"));
        assert_eq!(stock.price, d("45"));
    }

    #[test]
    fn test_add_output_assigns_value_added() {
        let key = StockKey::new(OwnerKind::Industry, "Farming", StockType::Sales, "Corn");
        let mut stock = Stock::new(key, Decimal::zero());
        stock.add_output(d("25"), d("115"), &corn(), 4);

        assert_eq!(stock.quantity, d("25"));
        assert_eq!(stock.value, d("115"));
        assert_eq!(stock.price, d("75"));
    }

    #[test]
    fn test_natural_key_orders_industries_first() {
        let a = StockKey::new(OwnerKind::SocialClass, "Aristocrats", StockType::Money, "Money");
        let b = StockKey::new(OwnerKind::Industry, "Zinc", StockType::Money, "Money");
        assert!(b < a);
        assert_eq!(b.natural_key(), "industry/Zinc/money/Money");
    }
}
