//! Versioned ledger storage.
//!
//! Every phase transition appends a complete snapshot of the ledger under a
//! new version. Nothing written is ever updated in place; the only mutable
//! datum per project is its current-version pointer.

pub mod memory;

pub use memory::MemoryStore;

use crate::domain::{
    Commodity, Global, Industry, Ledger, LedgerError, ProjectId, SocialClass, Stock, TimeStamp,
    VersionId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Natural key of the single Global record of a version.
pub const GLOBAL_KEY: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Commodity,
    Stock,
    Industry,
    SocialClass,
    Global,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Commodity,
        EntityKind::Stock,
        EntityKind::Industry,
        EntityKind::SocialClass,
        EntityKind::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Commodity => "commodity",
            EntityKind::Stock => "stock",
            EntityKind::Industry => "industry",
            EntityKind::SocialClass => "social_class",
            EntityKind::Global => "global",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted record of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Commodity(Commodity),
    Stock(Stock),
    Industry(Industry),
    SocialClass(SocialClass),
    Global(Global),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Commodity(_) => EntityKind::Commodity,
            Entity::Stock(_) => EntityKind::Stock,
            Entity::Industry(_) => EntityKind::Industry,
            Entity::SocialClass(_) => EntityKind::SocialClass,
            Entity::Global(_) => EntityKind::Global,
        }
    }

    /// Key unique among entities of the same kind within one version.
    pub fn natural_key(&self) -> String {
        match self {
            Entity::Commodity(c) => c.name.clone(),
            Entity::Stock(s) => s.key.natural_key(),
            Entity::Industry(i) => i.name.clone(),
            Entity::SocialClass(c) => c.name.clone(),
            Entity::Global(_) => GLOBAL_KEY.to_string(),
        }
    }
}

pub type EntitiesByKind = BTreeMap<EntityKind, Vec<Entity>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("corrupt {kind} record [{key}]: {reason}")]
    Corrupt {
        kind: EntityKind,
        key: String,
        reason: String,
    },
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl StoreError {
    pub fn corrupt(kind: EntityKind, key: impl Into<String>, reason: impl fmt::Display) -> Self {
        StoreError::Corrupt {
            kind,
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Versioned storage of ledger snapshots.
///
/// `write_new_version` must be all-or-nothing: on error no entity and no
/// timestamp of the new version is visible to readers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn read_entities(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
    ) -> Result<Vec<Entity>, StoreError>;

    async fn read_entity(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
        key: &str,
    ) -> Result<Option<Entity>, StoreError>;

    /// Persist `stamp` and every entity under `stamp.id`.
    ///
    /// Fails with [`StoreError::Conflict`] if the version already exists or a
    /// natural key repeats within one kind.
    async fn write_new_version(
        &self,
        project: ProjectId,
        stamp: &TimeStamp,
        entities: &EntitiesByKind,
    ) -> Result<(), StoreError>;

    async fn current_version(&self, project: ProjectId) -> Result<Option<VersionId>, StoreError>;

    /// Move the pointer. The version must already have been written.
    async fn set_current_version(
        &self,
        project: ProjectId,
        version: VersionId,
    ) -> Result<(), StoreError>;

    /// All timestamps of a project, ordered by version.
    async fn timestamps(&self, project: ProjectId) -> Result<Vec<TimeStamp>, StoreError>;
}

/// Flatten a ledger into persistable records.
pub fn ledger_to_entities(ledger: &Ledger) -> EntitiesByKind {
    let mut entities = EntitiesByKind::new();
    entities.insert(
        EntityKind::Commodity,
        ledger
            .commodities
            .values()
            .cloned()
            .map(Entity::Commodity)
            .collect(),
    );
    entities.insert(
        EntityKind::Stock,
        ledger.stocks.values().cloned().map(Entity::Stock).collect(),
    );
    entities.insert(
        EntityKind::Industry,
        ledger
            .industries
            .values()
            .cloned()
            .map(Entity::Industry)
            .collect(),
    );
    entities.insert(
        EntityKind::SocialClass,
        ledger
            .classes
            .values()
            .cloned()
            .map(Entity::SocialClass)
            .collect(),
    );
    entities.insert(
        EntityKind::Global,
        vec![Entity::Global(ledger.global.clone())],
    );
    entities
}

/// Rebuild a ledger from records of one version.
///
/// # Errors
/// Returns `Corrupt` if the Global record is missing or keys repeat.
pub fn ledger_from_entities(entities: EntitiesByKind) -> Result<Ledger, StoreError> {
    let mut global = None;
    let mut ledger = Ledger::default();

    for entity in entities.into_values().flatten() {
        let kind = entity.kind();
        let key = entity.natural_key();
        let inserted = match entity {
            Entity::Commodity(c) => ledger.insert_commodity(c),
            Entity::Stock(s) => ledger.insert_stock(s),
            Entity::Industry(i) => ledger.insert_industry(i),
            Entity::SocialClass(c) => ledger.insert_class(c),
            Entity::Global(g) => {
                if global.replace(g).is_some() {
                    Err(LedgerError::DuplicateKey(GLOBAL_KEY.to_string()))
                } else {
                    Ok(())
                }
            }
        };
        inserted.map_err(|e| StoreError::corrupt(kind, key, e))?;
    }

    ledger.global =
        global.ok_or_else(|| StoreError::corrupt(EntityKind::Global, GLOBAL_KEY, "missing"))?;
    Ok(ledger)
}

/// Read every entity of one version into a ledger.
pub async fn load_ledger(
    store: &dyn LedgerStore,
    project: ProjectId,
    version: VersionId,
) -> Result<Ledger, StoreError> {
    let exists = store
        .read_entity(EntityKind::Global, project, version, GLOBAL_KEY)
        .await?
        .is_some();
    if !exists {
        return Err(StoreError::NotFound(format!(
            "version {} of project {}",
            version, project
        )));
    }

    let mut entities = EntitiesByKind::new();
    for kind in EntityKind::ALL {
        entities.insert(kind, store.read_entities(kind, project, version).await?);
    }
    ledger_from_entities(entities)
}
