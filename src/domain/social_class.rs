use super::Decimal;
use serde::{Deserialize, Serialize};

/// A group of people receiving revenue and buying consumer goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialClass {
    pub name: String,
    /// Disposable income not yet spent.
    pub revenue: Decimal,
    pub population: Decimal,
    /// Labour power supplied per member of the class each period.
    pub participation_ratio: Decimal,
    /// Fraction of distributed profit this class receives.
    pub property_share: Decimal,
}

impl SocialClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revenue: Decimal::zero(),
            population: Decimal::zero(),
            participation_ratio: Decimal::zero(),
            property_share: Decimal::zero(),
        }
    }

    /// Labour power this class brings to market in a normal period.
    pub fn labour_supply(&self) -> Decimal {
        self.population * self.participation_ratio
    }
}
