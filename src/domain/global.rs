use super::{Decimal, LabourResponse, PriceDynamics};
use serde::{Deserialize, Serialize};

/// Model-wide parameters, one record per version.
///
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Monetary expression of labour time.
    pub melt: Decimal,
    pub labour_supply_response: LabourResponse,
    pub price_dynamics: PriceDynamics,
    /// Fraction of realised profit paid out to classes as revenue.
    pub revenue_share: Decimal,
}

impl Default for Global {
    fn default() -> Self {
        Self {
            melt: Decimal::one(),
            labour_supply_response: LabourResponse::Flexible,
            price_dynamics: PriceDynamics::Simple,
            revenue_share: Decimal::one(),
        }
    }
}
