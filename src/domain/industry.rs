use super::Decimal;
use serde::{Deserialize, Serialize};

/// A branch of production turning productive stocks into one output commodity.
///
/// Stocks are not embedded: an industry owns the stocks whose key names it as
/// owner, looked up through the [`super::Ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Industry {
    pub name: String,
    /// Name of the commodity this industry sells.
    pub commodity: String,
    /// Output the industry would like to achieve this period.
    pub proposed_output: Decimal,
    /// Output after the money and supply constraints have been applied.
    pub output: Decimal,
    /// Capital at the start of the period, basis of the profit calculation.
    pub initial_capital: Decimal,
    /// Profit recorded at the end of the last production phase.
    pub profit: Decimal,
}

impl Industry {
    pub fn new(name: impl Into<String>, commodity: impl Into<String>, output: Decimal) -> Self {
        Self {
            name: name.into(),
            commodity: commodity.into(),
            proposed_output: output,
            output,
            initial_capital: Decimal::zero(),
            profit: Decimal::zero(),
        }
    }

    /// Profit as a fraction of initial capital, or zero without capital.
    pub fn profit_rate(&self) -> Decimal {
        self.profit
            .checked_div(self.initial_capital)
            .unwrap_or_default()
    }
}
