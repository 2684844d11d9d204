//! In-memory ledger: every entity of one project at one version.

use super::{
    Commodity, CommodityFunction, Decimal, Global, Industry, OwnerKind, SimulationParams,
    SocialClass, Stock, StockKey, StockType,
};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("commodity [{0}] does not exist")]
    MissingCommodity(String),
    #[error("stock [{0}] does not exist")]
    MissingStock(String),
    #[error("industry [{0}] does not exist")]
    MissingIndustry(String),
    #[error("social class [{0}] does not exist")]
    MissingClass(String),
    #[error("duplicate key [{0}]")]
    DuplicateKey(String),
    #[error("stock [{stock}] holds {available} but {requested} was requested")]
    InsufficientStock {
        stock: String,
        available: Decimal,
        requested: Decimal,
    },
    #[error("cannot transfer [{from}] into [{to}]: different commodities")]
    CommodityMismatch { from: String, to: String },
    #[error("transfer quantity {0} is negative")]
    NegativeQuantity(Decimal),
}

/// All entities of one version, keyed by natural key.
///
/// BTreeMaps give every phase a deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ledger {
    pub commodities: BTreeMap<String, Commodity>,
    pub stocks: BTreeMap<StockKey, Stock>,
    pub industries: BTreeMap<String, Industry>,
    pub classes: BTreeMap<String, SocialClass>,
    pub global: Global,
}

impl Ledger {
    pub fn new(global: Global) -> Self {
        Self {
            global,
            ..Default::default()
        }
    }

    pub fn insert_commodity(&mut self, commodity: Commodity) -> Result<(), LedgerError> {
        if self.commodities.contains_key(&commodity.name) {
            return Err(LedgerError::DuplicateKey(commodity.name));
        }
        self.commodities.insert(commodity.name.clone(), commodity);
        Ok(())
    }

    pub fn insert_stock(&mut self, stock: Stock) -> Result<(), LedgerError> {
        if self.stocks.contains_key(&stock.key) {
            return Err(LedgerError::DuplicateKey(stock.key.natural_key()));
        }
        self.stocks.insert(stock.key.clone(), stock);
        Ok(())
    }

    pub fn insert_industry(&mut self, industry: Industry) -> Result<(), LedgerError> {
        if self.industries.contains_key(&industry.name) {
            return Err(LedgerError::DuplicateKey(industry.name));
        }
        self.industries.insert(industry.name.clone(), industry);
        Ok(())
    }

    pub fn insert_class(&mut self, class: SocialClass) -> Result<(), LedgerError> {
        if self.classes.contains_key(&class.name) {
            return Err(LedgerError::DuplicateKey(class.name));
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn commodity(&self, name: &str) -> Result<&Commodity, LedgerError> {
        self.commodities
            .get(name)
            .ok_or_else(|| LedgerError::MissingCommodity(name.to_string()))
    }

    pub fn commodity_mut(&mut self, name: &str) -> Result<&mut Commodity, LedgerError> {
        self.commodities
            .get_mut(name)
            .ok_or_else(|| LedgerError::MissingCommodity(name.to_string()))
    }

    pub fn stock(&self, key: &StockKey) -> Result<&Stock, LedgerError> {
        self.stocks
            .get(key)
            .ok_or_else(|| LedgerError::MissingStock(key.natural_key()))
    }

    pub fn stock_mut(&mut self, key: &StockKey) -> Result<&mut Stock, LedgerError> {
        self.stocks
            .get_mut(key)
            .ok_or_else(|| LedgerError::MissingStock(key.natural_key()))
    }

    pub fn industry(&self, name: &str) -> Result<&Industry, LedgerError> {
        self.industries
            .get(name)
            .ok_or_else(|| LedgerError::MissingIndustry(name.to_string()))
    }

    pub fn industry_mut(&mut self, name: &str) -> Result<&mut Industry, LedgerError> {
        self.industries
            .get_mut(name)
            .ok_or_else(|| LedgerError::MissingIndustry(name.to_string()))
    }

    pub fn class(&self, name: &str) -> Result<&SocialClass, LedgerError> {
        self.classes
            .get(name)
            .ok_or_else(|| LedgerError::MissingClass(name.to_string()))
    }

    pub fn class_mut(&mut self, name: &str) -> Result<&mut SocialClass, LedgerError> {
        self.classes
            .get_mut(name)
            .ok_or_else(|| LedgerError::MissingClass(name.to_string()))
    }

    pub fn industry_names(&self) -> Vec<String> {
        self.industries.keys().cloned().collect()
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    /// Stocks held by one owner, in key order.
    pub fn stocks_of_owner<'a>(
        &'a self,
        owner_kind: OwnerKind,
        owner: &'a str,
    ) -> impl Iterator<Item = &'a Stock> + 'a {
        self.stocks
            .values()
            .filter(move |s| s.key.owner_kind == owner_kind && s.key.owner == owner)
    }

    pub fn stocks_of_commodity<'a>(
        &'a self,
        commodity: &'a str,
    ) -> impl Iterator<Item = &'a Stock> + 'a {
        self.stocks
            .values()
            .filter(move |s| s.key.commodity == commodity)
    }

    /// Keys of one owner's stocks of the given type.
    pub fn stock_keys(&self, owner_kind: OwnerKind, owner: &str, stock_type: StockType) -> Vec<StockKey> {
        self.stocks_of_owner(owner_kind, owner)
            .filter(|s| s.key.stock_type == stock_type)
            .map(|s| s.key.clone())
            .collect()
    }

    pub fn money_stock_key(&self, owner_kind: OwnerKind, owner: &str) -> Result<StockKey, LedgerError> {
        self.stock_keys(owner_kind, owner, StockType::Money)
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::MissingStock(format!("{}/{}/money", owner_kind, owner)))
    }

    pub fn sales_stock_key(&self, owner_kind: OwnerKind, owner: &str) -> Option<StockKey> {
        self.stock_keys(owner_kind, owner, StockType::Sales)
            .into_iter()
            .next()
    }

    pub fn money_quantity(&self, owner_kind: OwnerKind, owner: &str) -> Decimal {
        self.stocks_of_owner(owner_kind, owner)
            .filter(|s| s.key.stock_type == StockType::Money)
            .map(|s| s.quantity)
            .sum()
    }

    /// Price of everything an industry owns: money, inputs and unsold output.
    pub fn current_capital(&self, industry: &str) -> Decimal {
        self.stocks_of_owner(OwnerKind::Industry, industry)
            .map(|s| s.price)
            .sum()
    }

    /// The industry that sells the named commodity, if any.
    pub fn industry_producing(&self, commodity: &str) -> Option<&Industry> {
        self.industries.values().find(|i| i.commodity == commodity)
    }

    pub fn commodities_by_function(&self, function: CommodityFunction) -> Vec<String> {
        self.commodities
            .values()
            .filter(|c| c.function == function)
            .map(|c| c.name.clone())
            .collect()
    }

    /// The first socially-produced commodity (labour power).
    pub fn labour_power(&self) -> Option<&Commodity> {
        self.commodities.values().find(|c| c.is_socially_produced())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Change a stock's quantity, re-deriving its value and price.
    pub fn modify_stock_by(
        &mut self,
        key: &StockKey,
        delta: Decimal,
        params: &SimulationParams,
    ) -> Result<(), LedgerError> {
        let commodity = self
            .commodities
            .get(&key.commodity)
            .ok_or_else(|| LedgerError::MissingCommodity(key.commodity.clone()))?;
        let stock = self
            .stocks
            .get_mut(key)
            .ok_or_else(|| LedgerError::MissingStock(key.natural_key()))?;
        stock.modify_by(delta, commodity, params.rounding_places);
        Ok(())
    }

    pub fn modify_stock_to(
        &mut self,
        key: &StockKey,
        quantity: Decimal,
        params: &SimulationParams,
    ) -> Result<(), LedgerError> {
        let commodity = self
            .commodities
            .get(&key.commodity)
            .ok_or_else(|| LedgerError::MissingCommodity(key.commodity.clone()))?;
        let stock = self
            .stocks
            .get_mut(key)
            .ok_or_else(|| LedgerError::MissingStock(key.natural_key()))?;
        stock.modify_to(quantity, commodity, params.rounding_places);
        Ok(())
    }

    /// Move `quantity` units from one stock to another of the same commodity.
    pub fn transfer(
        &mut self,
        from: &StockKey,
        to: &StockKey,
        quantity: Decimal,
        params: &SimulationParams,
    ) -> Result<(), LedgerError> {
        self.check_transfer(from, to, quantity, params)?;
        self.modify_stock_by(from, -quantity, params)?;
        self.modify_stock_by(to, quantity, params)
    }

    /// Exchange goods for money as one operation: either both legs are
    /// applied or neither is.
    pub fn settle(
        &mut self,
        goods: (&StockKey, &StockKey),
        quantity: Decimal,
        money: (&StockKey, &StockKey),
        amount: Decimal,
        params: &SimulationParams,
    ) -> Result<(), LedgerError> {
        self.check_transfer(goods.0, goods.1, quantity, params)?;
        self.check_transfer(money.0, money.1, amount, params)?;
        self.transfer(goods.0, goods.1, quantity, params)?;
        self.transfer(money.0, money.1, amount, params)
    }

    fn check_transfer(
        &self,
        from: &StockKey,
        to: &StockKey,
        quantity: Decimal,
        params: &SimulationParams,
    ) -> Result<(), LedgerError> {
        if quantity.is_negative() {
            return Err(LedgerError::NegativeQuantity(quantity));
        }
        if from.commodity != to.commodity {
            return Err(LedgerError::CommodityMismatch {
                from: from.natural_key(),
                to: to.natural_key(),
            });
        }
        self.commodity(&from.commodity)?;
        self.stock(to)?;
        let source = self.stock(from)?;
        if source.quantity + params.epsilon < quantity {
            return Err(LedgerError::InsufficientStock {
                stock: from.natural_key(),
                available: source.quantity,
                requested: quantity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Origin;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn two_owner_ledger() -> Ledger {
        let mut ledger = Ledger::new(Global::default());
        ledger
            .insert_commodity(Commodity::new(
                "Money",
                Origin::Money,
                CommodityFunction::Money,
                Decimal::one(),
                Decimal::one(),
                Decimal::one(),
            ))
            .unwrap();
        ledger
            .insert_commodity(Commodity::new(
                "Corn",
                Origin::IndustriallyProduced,
                CommodityFunction::ProductiveInput,
                d("2"),
                d("2"),
                Decimal::one(),
            ))
            .unwrap();
        for (owner, money) in [("Farming", "100"), ("Milling", "100")] {
            ledger
                .insert_stock(Stock::new(
                    StockKey::money(OwnerKind::Industry, owner, "Money"),
                    d(money),
                ))
                .unwrap();
        }
        ledger
            .insert_stock(Stock::new(
                StockKey::new(OwnerKind::Industry, "Farming", StockType::Sales, "Corn"),
                d("10"),
            ))
            .unwrap();
        ledger
            .insert_stock(Stock::new(
                StockKey::new(OwnerKind::Industry, "Milling", StockType::Productive, "Corn"),
                Decimal::zero(),
            ))
            .unwrap();
        ledger
    }

    fn keys() -> (StockKey, StockKey, StockKey, StockKey) {
        (
            StockKey::new(OwnerKind::Industry, "Farming", StockType::Sales, "Corn"),
            StockKey::new(OwnerKind::Industry, "Milling", StockType::Productive, "Corn"),
            StockKey::money(OwnerKind::Industry, "Milling", "Money"),
            StockKey::money(OwnerKind::Industry, "Farming", "Money"),
        )
    }

    #[test]
    fn test_settle_moves_goods_and_money() {
        let mut ledger = two_owner_ledger();
        let params = SimulationParams::default();
        let (sales, input, buyer_money, seller_money) = keys();

        ledger
            .settle((&sales, &input), d("4"), (&buyer_money, &seller_money), d("8"), &params)
            .unwrap();

        assert_eq!(ledger.stock(&sales).unwrap().quantity, d("6"));
        assert_eq!(ledger.stock(&input).unwrap().quantity, d("4"));
        assert_eq!(ledger.stock(&input).unwrap().value, d("8"));
        assert_eq!(ledger.stock(&buyer_money).unwrap().quantity, d("92"));
        assert_eq!(ledger.stock(&seller_money).unwrap().quantity, d("108"));
    }

    #[test]
    fn test_settle_is_all_or_nothing() {
        let mut ledger = two_owner_ledger();
        let before = ledger.clone();
        let params = SimulationParams::default();
        let (sales, input, buyer_money, seller_money) = keys();

        // Goods leg is fine, money leg overdraws the buyer.
        let err = ledger
            .settle((&sales, &input), d("4"), (&buyer_money, &seller_money), d("500"), &params)
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_transfer_rejects_commodity_mismatch() {
        let mut ledger = two_owner_ledger();
        let params = SimulationParams::default();
        let (sales, _, buyer_money, _) = keys();

        let err = ledger
            .transfer(&sales, &buyer_money, d("1"), &params)
            .unwrap_err();
        assert!(matches!(err, LedgerError::CommodityMismatch { .. }));
    }

    #[test]
    fn test_current_capital_sums_owned_prices() {
        let mut ledger = two_owner_ledger();
        let params = SimulationParams::default();
        let (sales, _, _, seller_money) = keys();
        ledger.modify_stock_to(&sales, d("10"), &params).unwrap();
        ledger.modify_stock_to(&seller_money, d("100"), &params).unwrap();

        assert_eq!(ledger.current_capital("Farming"), d("120"));
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut ledger = two_owner_ledger();
        let err = ledger
            .insert_stock(Stock::new(
                StockKey::money(OwnerKind::Industry, "Farming", "Money"),
                Decimal::zero(),
            ))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey(_)));
    }
}
