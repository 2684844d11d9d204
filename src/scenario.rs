//! Scenario files: the JSON description of a project's starting ledger.

use crate::domain::{
    Commodity, CommodityFunction, Decimal, Global, Industry, Ledger, LedgerError, Origin,
    OwnerKind, SimulationParams, SocialClass, Stock, StockKey, StockType,
};
use crate::engine::aggregates::{
    calculate_stock_aggregates, check_invariants, refresh_commodity_demand, set_capitals,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error("invalid scenario: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommoditySpec {
    pub name: String,
    pub origin: Origin,
    pub function: CommodityFunction,
    pub unit_value: Decimal,
    pub unit_price: Decimal,
    #[serde(default = "Decimal::one")]
    pub turnover_time: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockSpec {
    pub stock_type: StockType,
    pub commodity: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub production_coefficient: Decimal,
    #[serde(default)]
    pub consumption_coefficient: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustrySpec {
    pub name: String,
    pub commodity: String,
    pub output: Decimal,
    #[serde(default)]
    pub stocks: Vec<StockSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub revenue: Decimal,
    #[serde(default)]
    pub population: Decimal,
    #[serde(default)]
    pub participation_ratio: Decimal,
    #[serde(default)]
    pub property_share: Decimal,
    #[serde(default)]
    pub stocks: Vec<StockSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub global: Global,
    pub commodities: Vec<CommoditySpec>,
    #[serde(default)]
    pub industries: Vec<IndustrySpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build the starting ledger: values and prices derived from quantities,
    /// demand totals refreshed and initial capitals set.
    pub fn into_ledger(&self, params: &SimulationParams) -> Result<Ledger, ScenarioError> {
        let mut ledger = Ledger::new(self.global.clone());

        for spec in &self.commodities {
            ledger.insert_commodity(Commodity::new(
                spec.name.clone(),
                spec.origin,
                spec.function,
                spec.unit_value,
                spec.unit_price,
                spec.turnover_time,
            ))?;
        }

        for spec in &self.industries {
            ledger.commodity(&spec.commodity)?;
            ledger.insert_industry(Industry::new(
                spec.name.clone(),
                spec.commodity.clone(),
                spec.output,
            ))?;
            insert_stocks(&mut ledger, OwnerKind::Industry, &spec.name, &spec.stocks)?;

            let sells_output = spec
                .stocks
                .iter()
                .any(|s| s.stock_type == StockType::Sales && s.commodity == spec.commodity);
            if !sells_output {
                return Err(ScenarioError::Invalid(format!(
                    "industry {} has no sales stock of {}",
                    spec.name, spec.commodity
                )));
            }
        }

        for spec in &self.classes {
            ledger.insert_class(SocialClass {
                name: spec.name.clone(),
                revenue: spec.revenue,
                population: spec.population,
                participation_ratio: spec.participation_ratio,
                property_share: spec.property_share,
            })?;
            insert_stocks(&mut ledger, OwnerKind::SocialClass, &spec.name, &spec.stocks)?;
        }

        calculate_stock_aggregates(&mut ledger, params);
        refresh_commodity_demand(&mut ledger);
        set_capitals(&mut ledger);
        check_invariants(&ledger, params);

        info!(
            scenario = %self.name,
            commodities = ledger.commodities.len(),
            industries = ledger.industries.len(),
            classes = ledger.classes.len(),
            "Scenario loaded"
        );
        Ok(ledger)
    }
}

fn insert_stocks(
    ledger: &mut Ledger,
    owner_kind: OwnerKind,
    owner: &str,
    specs: &[StockSpec],
) -> Result<(), ScenarioError> {
    let mut has_money = false;
    for spec in specs {
        let commodity = ledger.commodity(&spec.commodity)?;
        if spec.stock_type == StockType::Money {
            if commodity.function != CommodityFunction::Money {
                return Err(ScenarioError::Invalid(format!(
                    "money stock of {} holds {}, which is not money",
                    owner, spec.commodity
                )));
            }
            has_money = true;
        }
        let key = StockKey::new(owner_kind, owner, spec.stock_type, spec.commodity.clone());
        ledger.insert_stock(
            Stock::new(key, spec.quantity)
                .with_production_coefficient(spec.production_coefficient)
                .with_consumption_coefficient(spec.consumption_coefficient),
        )?;
    }

    if !has_money {
        return Err(ScenarioError::Invalid(format!("{} {} has no money stock", owner_kind, owner)));
    }
    Ok(())
}
