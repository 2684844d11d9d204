use super::Decimal;
use serde::{Deserialize, Serialize};

/// Numerical parameters shared by every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Decimal places quantities, values and prices are rounded to.
    pub rounding_places: u32,
    /// Tolerance for comparisons between monetary magnitudes.
    pub epsilon: Decimal,
}

impl SimulationParams {
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_to(self.rounding_places)
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            rounding_places: 4,
            epsilon: Decimal::new(rust_decimal::Decimal::new(1, 4)),
        }
    }
}
