//! Domain primitives: identifiers and the closed enumerations of the model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a simulation project (one scenario and its history).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl ProjectId {
    pub fn new(id: i64) -> Self {
        ProjectId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one point in the phase sequence of a project.
///
/// Versions are dense and ordered: version `n + 1` is always created from
/// version `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub i64);

impl VersionId {
    /// The version written when a scenario is first loaded.
    pub const INITIAL: VersionId = VersionId(1);

    pub fn new(id: i64) -> Self {
        VersionId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn next(&self) -> VersionId {
        VersionId(self.0 + 1)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares a closed enum with a canonical snake_case text form used both in
/// JSON and in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError::new($label, other)),
                }
            }
        }
    };
}

text_enum!(
    /// How a commodity comes into existence.
    Origin, "origin" {
        IndustriallyProduced => "industrially_produced",
        SociallyProduced => "socially_produced",
        Money => "money",
    }
);

text_enum!(
    /// The role a commodity plays in the circuit.
    CommodityFunction, "commodity function" {
        ProductiveInput => "productive_input",
        ConsumerGood => "consumer_good",
        Money => "money",
    }
);

text_enum!(
    /// The purpose for which an owner holds a stock.
    StockType, "stock type" {
        Money => "money",
        Productive => "productive",
        Sales => "sales",
        Consumption => "consumption",
    }
);

text_enum!(
    OwnerKind, "owner kind" {
        Industry => "industry",
        SocialClass => "social_class",
    }
);

text_enum!(
    /// Response of labour-power supply to demand.
    LabourResponse, "labour response" {
        Flexible => "flexible",
        Fixed => "fixed",
    }
);

text_enum!(
    /// Price and distribution dynamics of a project.
    PriceDynamics, "price dynamics" {
        Simple => "simple",
        Equalize => "equalize",
        Dynamic => "dynamic",
    }
);
