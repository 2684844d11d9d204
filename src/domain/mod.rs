//! Domain types of the circuit-of-capital model.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Identifiers and closed enumerations shared by store and engine
//! - The entity records (commodities, stocks, industries, classes, globals)
//! - The in-memory Ledger every phase operates on

pub mod commodity;
pub mod decimal;
pub mod global;
pub mod industry;
pub mod ledger;
pub mod params;
pub mod primitives;
pub mod social_class;
pub mod stock;
pub mod timestamp;

pub use commodity::Commodity;
pub use decimal::Decimal;
pub use global::Global;
pub use industry::Industry;
pub use ledger::{Ledger, LedgerError};
pub use params::SimulationParams;
pub use primitives::{
    CommodityFunction, LabourResponse, Origin, OwnerKind, ParseEnumError, PriceDynamics,
    ProjectId, StockType, VersionId,
};
pub use social_class::SocialClass;
pub use stock::{Stock, StockKey};
pub use timestamp::{TimeStamp, START_DESCRIPTION};
