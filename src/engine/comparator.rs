//! Which version a displayed version is compared against.
//!
//! Entities carry no comparator of their own; callers resolve one from the
//! timestamp history and diff the two ledgers themselves.

use crate::domain::{TimeStamp, VersionId};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparatorMode {
    /// The version the displayed one was derived from.
    #[default]
    Previous,
    /// The first version of the displayed version's period.
    PeriodStart,
    /// The latest version of the displayed version's period.
    PeriodEnd,
    Custom(VersionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown comparator '{0}': expected previous, start, end or a version number")]
pub struct ParseComparatorError(pub String);

impl FromStr for ComparatorMode {
    type Err = ParseComparatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "previous" => Ok(ComparatorMode::Previous),
            "start" | "period_start" => Ok(ComparatorMode::PeriodStart),
            "end" | "period_end" => Ok(ComparatorMode::PeriodEnd),
            other => other
                .parse::<i64>()
                .ok()
                .filter(|v| *v > 0)
                .map(|v| ComparatorMode::Custom(VersionId::new(v)))
                .ok_or_else(|| ParseComparatorError(s.to_string())),
        }
    }
}

impl fmt::Display for ComparatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparatorMode::Previous => f.write_str("previous"),
            ComparatorMode::PeriodStart => f.write_str("start"),
            ComparatorMode::PeriodEnd => f.write_str("end"),
            ComparatorMode::Custom(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for ComparatorMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Resolve the comparator of `display` within a project's history.
///
/// Returns `None` when `display` is unknown or has nothing to compare with
/// (e.g. `Previous` of the first version).
pub fn resolve_comparator(
    mode: ComparatorMode,
    display: VersionId,
    stamps: &[TimeStamp],
) -> Option<VersionId> {
    let shown = stamps.iter().find(|s| s.id == display)?;
    let same_period = stamps.iter().filter(|s| s.period == shown.period);

    match mode {
        ComparatorMode::Previous => shown.predecessor,
        ComparatorMode::PeriodStart => same_period.map(|s| s.id).min(),
        ComparatorMode::PeriodEnd => same_period.map(|s| s.id).max(),
        ComparatorMode::Custom(v) => stamps.iter().any(|s| s.id == v).then_some(v),
    }
}
