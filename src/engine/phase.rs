//! The phase taxonomy and the immutable graph that sequences it.
//!
//! Super-phases (Exchange, Production, Distribution) group the executable
//! sub-phases. Walking the graph from any phase visits every phase once per
//! cycle: a super-phase steps into its first child, a sub-phase steps to its
//! declared successor, and the last sub-phase of a group steps to the next
//! super-phase.

use super::{constrain, demand, produce, trade};
use crate::domain::{Ledger, LedgerError, SimulationParams};
use crate::engine::policy::DistributionPolicy;
use crate::report::Reporter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhaseId {
    Exchange,
    Demand,
    Constrain,
    Trade,
    Production,
    IndustriesProduce,
    Prices,
    ClassesReproduce,
    Distribution,
    Revenue,
    Accumulate,
}

impl PhaseId {
    pub const ALL: [PhaseId; 11] = [
        PhaseId::Exchange,
        PhaseId::Demand,
        PhaseId::Constrain,
        PhaseId::Trade,
        PhaseId::Production,
        PhaseId::IndustriesProduce,
        PhaseId::Prices,
        PhaseId::ClassesReproduce,
        PhaseId::Distribution,
        PhaseId::Revenue,
        PhaseId::Accumulate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::Exchange => "Exchange",
            PhaseId::Demand => "Demand",
            PhaseId::Constrain => "Constrain",
            PhaseId::Trade => "Trade",
            PhaseId::Production => "Production",
            PhaseId::IndustriesProduce => "IndustriesProduce",
            PhaseId::Prices => "Prices",
            PhaseId::ClassesReproduce => "ClassesReproduce",
            PhaseId::Distribution => "Distribution",
            PhaseId::Revenue => "Revenue",
            PhaseId::Accumulate => "Accumulate",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PhaseId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for PhaseId {
    type Err = UnknownPhase;

    /// Case-insensitive, so `industriesproduce` and `IndustriesProduce` agree.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// Everything a phase computation may consult besides the ledger itself.
pub struct PhaseContext<'a> {
    pub params: &'a SimulationParams,
    pub reporter: &'a dyn Reporter,
    pub policy: &'a dyn DistributionPolicy,
}

impl PhaseContext<'_> {
    pub fn warn(&self, message: impl AsRef<str>) {
        self.reporter.report_warning(message.as_ref());
    }
}

/// Computation attached to an executable sub-phase.
pub type PhaseAction = fn(&mut Ledger, &PhaseContext<'_>) -> Result<(), LedgerError>;

#[derive(Clone)]
pub struct PhaseDescriptor {
    pub id: PhaseId,
    pub successor: PhaseId,
    pub parent: Option<PhaseId>,
    pub children: Vec<PhaseId>,
    pub action: Option<PhaseAction>,
}

impl PhaseDescriptor {
    pub fn is_super_phase(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Debug for PhaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseDescriptor")
            .field("id", &self.id)
            .field("successor", &self.successor)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("executable", &self.action.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseGraphError {
    #[error("phase {0} declared twice")]
    Duplicate(PhaseId),
    #[error("phase {phase} refers to undeclared phase {missing}")]
    Dangling { phase: PhaseId, missing: PhaseId },
    #[error("phase {0} is a sub-phase of a sub-phase")]
    NestedTooDeep(PhaseId),
    #[error("super-phase {0} has no sub-phases")]
    Childless(PhaseId),
    #[error("graph has no phases")]
    Empty,
}

/// Collects phase declarations, then validates them into a [`PhaseGraph`].
#[derive(Debug, Default)]
pub struct PhaseGraphBuilder {
    declared: Vec<PhaseDescriptor>,
}

impl PhaseGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn super_phase(mut self, id: PhaseId, successor: PhaseId) -> Self {
        self.declared.push(PhaseDescriptor {
            id,
            successor,
            parent: None,
            children: Vec::new(),
            action: None,
        });
        self
    }

    /// Declare an executable sub-phase. Children run in declaration order.
    pub fn sub_phase(
        mut self,
        id: PhaseId,
        parent: PhaseId,
        successor: PhaseId,
        action: PhaseAction,
    ) -> Self {
        self.declared.push(PhaseDescriptor {
            id,
            successor,
            parent: Some(parent),
            children: Vec::new(),
            action: Some(action),
        });
        self
    }

    pub fn build(self) -> Result<PhaseGraph, PhaseGraphError> {
        if self.declared.is_empty() {
            return Err(PhaseGraphError::Empty);
        }

        let mut phases: BTreeMap<PhaseId, PhaseDescriptor> = BTreeMap::new();
        let mut order = Vec::new();
        for descriptor in self.declared {
            let id = descriptor.id;
            if phases.insert(id, descriptor).is_some() {
                return Err(PhaseGraphError::Duplicate(id));
            }
            order.push(id);
        }

        for id in &order {
            let descriptor = &phases[id];
            if !phases.contains_key(&descriptor.successor) {
                return Err(PhaseGraphError::Dangling {
                    phase: *id,
                    missing: descriptor.successor,
                });
            }
            if let Some(parent) = descriptor.parent {
                match phases.get(&parent) {
                    None => {
                        return Err(PhaseGraphError::Dangling {
                            phase: *id,
                            missing: parent,
                        })
                    }
                    Some(p) if !p.is_super_phase() => {
                        return Err(PhaseGraphError::NestedTooDeep(*id))
                    }
                    Some(_) => {}
                }
            }
        }

        for id in &order {
            if let Some(parent) = phases[id].parent {
                if let Some(p) = phases.get_mut(&parent) {
                    p.children.push(*id);
                }
            }
        }

        if let Some(childless) = phases
            .values()
            .find(|d| d.is_super_phase() && d.children.is_empty())
        {
            return Err(PhaseGraphError::Childless(childless.id));
        }

        Ok(PhaseGraph { phases })
    }
}

/// Immutable phase graph. Built once, shared by every session.
#[derive(Debug, Clone)]
pub struct PhaseGraph {
    phases: BTreeMap<PhaseId, PhaseDescriptor>,
}

impl PhaseGraph {
    /// The fixed circuit: Exchange, Production, Distribution.
    pub fn standard() -> Self {
        use PhaseId::*;
        PhaseGraphBuilder::new()
            .super_phase(Exchange, Production)
            .super_phase(Production, Distribution)
            .super_phase(Distribution, Exchange)
            .sub_phase(Demand, Exchange, Constrain, demand::run)
            .sub_phase(Constrain, Exchange, Trade, constrain::run)
            .sub_phase(Trade, Exchange, Production, trade::run)
            .sub_phase(IndustriesProduce, Production, Prices, produce::run)
            .sub_phase(Prices, Production, ClassesReproduce, reprice)
            .sub_phase(ClassesReproduce, Production, Distribution, produce::reproduce)
            .sub_phase(Revenue, Distribution, Accumulate, distribute_revenue)
            .sub_phase(Accumulate, Distribution, Exchange, accumulate)
            .build()
            .expect("standard phase graph is well-formed")
    }

    pub fn descriptor(&self, id: PhaseId) -> Option<&PhaseDescriptor> {
        self.phases.get(&id)
    }

    pub fn phases(&self) -> impl Iterator<Item = &PhaseDescriptor> {
        self.phases.values()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn parent(&self, id: PhaseId) -> Option<PhaseId> {
        self.phases.get(&id).and_then(|d| d.parent)
    }

    pub fn children(&self, id: PhaseId) -> &[PhaseId] {
        self.phases
            .get(&id)
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn action(&self, id: PhaseId) -> Option<PhaseAction> {
        self.phases.get(&id).and_then(|d| d.action)
    }

    pub fn is_executable(&self, id: PhaseId) -> bool {
        self.action(id).is_some()
    }

    /// One step of the cycle walk.
    pub fn advance(&self, id: PhaseId) -> PhaseId {
        match self.phases.get(&id) {
            Some(d) if d.is_super_phase() => d.children.first().copied().unwrap_or(d.successor),
            Some(d) => d.successor,
            None => id,
        }
    }

    /// The executable sub-phase that follows `after`.
    pub fn next_primitive(&self, after: PhaseId) -> PhaseId {
        let mut current = self.advance(after);
        for _ in 0..self.phases.len() {
            if self.is_executable(current) {
                return current;
            }
            current = self.advance(current);
        }
        current
    }
}

// Policy-dependent phases dispatch through the context.

fn reprice(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    ctx.policy.reprice(ledger, ctx)
}

fn distribute_revenue(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    ctx.policy.distribute_revenue(ledger, ctx)
}

fn accumulate(ledger: &mut Ledger, ctx: &PhaseContext<'_>) -> Result<(), LedgerError> {
    ctx.policy.accumulate(ledger, ctx)
}
