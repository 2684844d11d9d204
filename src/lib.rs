pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod report;
pub mod scenario;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Decimal, Ledger, ProjectId, SimulationParams, TimeStamp, VersionId};
pub use engine::{ComparatorMode, PhaseGraph, PhaseId, Session, SessionError};
pub use error::AppError;
pub use report::{RecordingReporter, Reporter, TracingReporter};
pub use scenario::{Scenario, ScenarioError};
pub use store::{LedgerStore, MemoryStore, StoreError};
