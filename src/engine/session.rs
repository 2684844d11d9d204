//! A simulation session: one project advanced one phase at a time.

use super::aggregates::{check_invariants, check_invariants_before_repricing};
use super::comparator::{resolve_comparator, ComparatorMode};
use super::phase::{PhaseContext, PhaseGraph, PhaseId};
use super::policy::{policy_for, UnsupportedPolicy};
use crate::domain::{
    Ledger, LedgerError, ProjectId, SimulationParams, StockType, TimeStamp, VersionId,
    START_DESCRIPTION,
};
use crate::report::Reporter;
use crate::store::{ledger_to_entities, load_ledger, LedgerStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    UnsupportedPolicy(#[from] UnsupportedPolicy),
    #[error("cannot run {requested} now; the next phase is {expected}")]
    OutOfSequence {
        requested: PhaseId,
        expected: PhaseId,
    },
    #[error("project {0} has no versions; load a scenario first")]
    NotInitialised(ProjectId),
    #[error("project {0} already has versions")]
    AlreadyInitialised(ProjectId),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Explicit simulation context. Every phase operation goes through here;
/// nothing about the current project or version is held anywhere else.
pub struct Session {
    store: Arc<dyn LedgerStore>,
    project: ProjectId,
    graph: Arc<PhaseGraph>,
    params: SimulationParams,
    reporter: Arc<dyn Reporter>,
    current: TimeStamp,
    period: i64,
    last_phase: PhaseId,
    comparator: ComparatorMode,
}

impl Session {
    /// Write `ledger` as version 1 of a project that has no versions yet.
    pub async fn initialise(
        store: Arc<dyn LedgerStore>,
        project: ProjectId,
        ledger: &Ledger,
        params: SimulationParams,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, SessionError> {
        if store.current_version(project).await?.is_some() {
            return Err(SessionError::AlreadyInitialised(project));
        }
        policy_for(ledger.global.price_dynamics)?;

        let stamp = TimeStamp::initial(project);
        store
            .write_new_version(project, &stamp, &ledger_to_entities(ledger))
            .await?;
        store.set_current_version(project, stamp.id).await?;
        info!(project = %project, "Project initialised at version 1");

        Ok(Self {
            store,
            project,
            graph: Arc::new(PhaseGraph::standard()),
            params,
            reporter,
            current: stamp,
            period: 1,
            last_phase: PhaseId::Accumulate,
            comparator: ComparatorMode::default(),
        })
    }

    /// Resume a project from its current version.
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        project: ProjectId,
        params: SimulationParams,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, SessionError> {
        let version = store
            .current_version(project)
            .await?
            .ok_or(SessionError::NotInitialised(project))?;
        let current = store
            .timestamps(project)
            .await?
            .into_iter()
            .find(|s| s.id == version)
            .ok_or_else(|| {
                StoreError::NotFound(format!("timestamp {} of project {}", version, project))
            })?;

        let last_phase = if current.description == START_DESCRIPTION {
            PhaseId::Accumulate
        } else {
            current
                .description
                .parse::<PhaseId>()
                .map_err(|e| StoreError::NotFound(e.to_string()))?
        };
        let period = if last_phase == PhaseId::Accumulate && current.description != START_DESCRIPTION
        {
            current.period + 1
        } else {
            current.period
        };

        let ledger = load_ledger(store.as_ref(), project, version).await?;
        policy_for(ledger.global.price_dynamics)?;

        info!(project = %project, version = %version, period, next = %last_phase, "Session resumed");
        Ok(Self {
            store,
            project,
            graph: Arc::new(PhaseGraph::standard()),
            params,
            reporter,
            current,
            period,
            last_phase,
            comparator: ComparatorMode::default(),
        })
    }

    pub fn with_comparator(mut self, mode: ComparatorMode) -> Self {
        self.comparator = mode;
        self
    }

    pub fn with_graph(mut self, graph: Arc<PhaseGraph>) -> Self {
        self.graph = graph;
        self
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn current_version(&self) -> VersionId {
        self.current.id
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    pub fn last_phase(&self) -> PhaseId {
        self.last_phase
    }

    pub fn graph(&self) -> &PhaseGraph {
        &self.graph
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn comparator(&self) -> ComparatorMode {
        self.comparator
    }

    pub fn set_comparator(&mut self, mode: ComparatorMode) {
        self.comparator = mode;
    }

    /// The sub-phase `step` would run.
    pub fn next_phase(&self) -> PhaseId {
        self.graph.next_primitive(self.last_phase)
    }

    /// Run the next sub-phase.
    pub async fn step(&mut self) -> Result<TimeStamp, SessionError> {
        let phase = self.next_phase();
        self.transition(phase).await
    }

    /// Run one named phase.
    ///
    /// A sub-phase must be the next one due. A super-phase may only start
    /// when its first sub-phase is due and then runs all its sub-phases.
    pub async fn execute(&mut self, phase: PhaseId) -> Result<Vec<TimeStamp>, SessionError> {
        let expected = self.next_phase();

        if self.graph.is_executable(phase) {
            if phase != expected {
                return Err(SessionError::OutOfSequence {
                    requested: phase,
                    expected,
                });
            }
            return Ok(vec![self.transition(phase).await?]);
        }

        let children = self.graph.children(phase).to_vec();
        if children.first() != Some(&expected) {
            return Err(SessionError::OutOfSequence {
                requested: phase,
                expected,
            });
        }
        let mut stamps = Vec::with_capacity(children.len());
        for child in children {
            stamps.push(self.transition(child).await?);
        }
        Ok(stamps)
    }

    /// Step until the period's Accumulate phase has run.
    pub async fn run_period(&mut self) -> Result<Vec<TimeStamp>, SessionError> {
        let mut stamps = Vec::new();
        loop {
            stamps.push(self.step().await?);
            if self.last_phase == PhaseId::Accumulate {
                return Ok(stamps);
            }
        }
    }

    /// The ledger at `version`, or at the current version.
    pub async fn ledger(&self, version: Option<VersionId>) -> Result<Ledger, SessionError> {
        let version = version.unwrap_or(self.current.id);
        Ok(load_ledger(self.store.as_ref(), self.project, version).await?)
    }

    pub async fn timestamps(&self) -> Result<Vec<TimeStamp>, SessionError> {
        Ok(self.store.timestamps(self.project).await?)
    }

    /// The version to compare `display` against under the session's mode.
    pub async fn comparator_for(
        &self,
        display: VersionId,
    ) -> Result<Option<VersionId>, SessionError> {
        let stamps = self.timestamps().await?;
        Ok(resolve_comparator(self.comparator, display, &stamps))
    }

    /// Run one sub-phase against the current ledger and persist the result
    /// as the next version.
    ///
    /// Nothing is written unless the phase completes. A failed write leaves
    /// the current-version pointer where it was.
    async fn transition(&mut self, phase: PhaseId) -> Result<TimeStamp, SessionError> {
        let action = self.graph.action(phase).ok_or(SessionError::OutOfSequence {
            requested: phase,
            expected: self.next_phase(),
        })?;

        let mut ledger = load_ledger(self.store.as_ref(), self.project, self.current.id).await?;
        let policy = policy_for(ledger.global.price_dynamics)?;

        for stock in ledger.stocks.values() {
            if stock.key.stock_type == StockType::Money && stock.quantity < -self.params.epsilon {
                self.reporter.report_warning(&format!(
                    "Money stock {} is negative: {}",
                    stock.key, stock.quantity
                ));
            }
        }

        {
            let ctx = PhaseContext {
                params: &self.params,
                reporter: self.reporter.as_ref(),
                policy,
            };
            action(&mut ledger, &ctx)?;
        }

        // Produced output carries value added that unit values only absorb
        // in the Prices phase.
        if phase == PhaseId::IndustriesProduce {
            check_invariants_before_repricing(&ledger, &self.params);
        } else {
            check_invariants(&ledger, &self.params);
        }

        let parent = self.graph.parent(phase).map(|p| p.to_string());
        let stamp = self.current.successor(self.period, phase.as_str(), parent);

        if let Err(e) = self.persist(&stamp, &ledger).await {
            self.reporter.report_fatal(&format!(
                "Could not advance project {} to version {} ({}): {}",
                self.project, stamp.id, phase, e
            ));
            warn!(project = %self.project, version = %self.current.id, "Transition aborted; pointer unchanged");
            return Err(e.into());
        }

        self.current = stamp.clone();
        self.last_phase = phase;
        if phase == PhaseId::Accumulate {
            self.period += 1;
        }
        info!(project = %self.project, version = %stamp.id, phase = %phase, period = stamp.period, "Phase complete");
        Ok(stamp)
    }

    async fn persist(&self, stamp: &TimeStamp, ledger: &Ledger) -> Result<(), StoreError> {
        self.store
            .write_new_version(self.project, stamp, &ledger_to_entities(ledger))
            .await?;
        self.store.set_current_version(self.project, stamp.id).await
    }
}
