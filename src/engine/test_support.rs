//! Small ledgers for phase unit tests.

use super::phase::PhaseContext;
use super::policy::SimplePolicy;
use crate::domain::{
    Commodity, CommodityFunction, Decimal, Global, Industry, Ledger, OwnerKind, Origin,
    SimulationParams, SocialClass, Stock, StockKey, StockType,
};
use crate::report::RecordingReporter;

pub const MONEY: &str = "Money";

pub fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

pub struct Harness {
    pub params: SimulationParams,
    pub reporter: RecordingReporter,
    pub policy: SimplePolicy,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            params: SimulationParams::default(),
            reporter: RecordingReporter::new(),
            policy: SimplePolicy,
        }
    }

    pub fn ctx(&self) -> PhaseContext<'_> {
        PhaseContext {
            params: &self.params,
            reporter: &self.reporter,
            policy: &self.policy,
        }
    }
}

pub fn empty_ledger() -> Ledger {
    let mut ledger = Ledger::new(Global::default());
    ledger
        .insert_commodity(Commodity::new(
            MONEY,
            Origin::Money,
            CommodityFunction::Money,
            Decimal::one(),
            Decimal::one(),
            Decimal::one(),
        ))
        .unwrap();
    ledger
}

pub fn add_commodity(ledger: &mut Ledger, name: &str, origin: Origin, unit_value: &str, unit_price: &str) {
    ledger
        .insert_commodity(Commodity::new(
            name,
            origin,
            CommodityFunction::ProductiveInput,
            d(unit_value),
            d(unit_price),
            Decimal::one(),
        ))
        .unwrap();
}

/// An industry with money and an empty sales stock of its output.
pub fn add_industry(ledger: &mut Ledger, name: &str, output_commodity: &str, output: &str, money: &str) {
    ledger
        .insert_industry(Industry::new(name, output_commodity, d(output)))
        .unwrap();
    set_stock(ledger, StockKey::money(OwnerKind::Industry, name, MONEY), money);
    set_stock(
        ledger,
        StockKey::new(OwnerKind::Industry, name, StockType::Sales, output_commodity),
        "0",
    );
}

pub fn add_input(ledger: &mut Ledger, industry: &str, commodity: &str, coefficient: &str, quantity: &str) {
    let key = StockKey::new(OwnerKind::Industry, industry, StockType::Productive, commodity);
    let stock = Stock::new(key.clone(), d(quantity)).with_production_coefficient(d(coefficient));
    ledger.insert_stock(stock).unwrap();
    revalue(ledger, &key);
}

pub fn add_class<'a>(ledger: &'a mut Ledger, name: &str, money: &str) -> &'a mut SocialClass {
    ledger.insert_class(SocialClass::new(name)).unwrap();
    set_stock(ledger, StockKey::money(OwnerKind::SocialClass, name, MONEY), money);
    ledger.class_mut(name).unwrap()
}

pub fn add_class_stock(
    ledger: &mut Ledger,
    class: &str,
    stock_type: StockType,
    commodity: &str,
    quantity: &str,
    consumption_coefficient: &str,
) {
    let key = StockKey::new(OwnerKind::SocialClass, class, stock_type, commodity);
    let stock = Stock::new(key.clone(), d(quantity))
        .with_consumption_coefficient(d(consumption_coefficient));
    ledger.insert_stock(stock).unwrap();
    revalue(ledger, &key);
}

/// Insert or overwrite a stock's quantity, deriving value and price.
pub fn set_stock(ledger: &mut Ledger, key: StockKey, quantity: &str) {
    if !ledger.stocks.contains_key(&key) {
        ledger.insert_stock(Stock::new(key.clone(), Decimal::zero())).unwrap();
    }
    ledger
        .modify_stock_to(&key, d(quantity), &SimulationParams::default())
        .unwrap();
}

fn revalue(ledger: &mut Ledger, key: &StockKey) {
    let quantity = ledger.stock(key).unwrap().quantity;
    ledger
        .modify_stock_to(key, quantity, &SimulationParams::default())
        .unwrap();
}

pub fn stock_key(owner_kind: OwnerKind, owner: &str, stock_type: StockType, commodity: &str) -> StockKey {
    StockKey::new(owner_kind, owner, stock_type, commodity)
}
