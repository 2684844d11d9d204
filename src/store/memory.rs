//! In-memory ledger store for tests and ephemeral sessions.

use super::{EntitiesByKind, Entity, EntityKind, LedgerStore, StoreError};
use crate::domain::{ProjectId, TimeStamp, VersionId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type VersionSnapshot = BTreeMap<EntityKind, BTreeMap<String, Entity>>;

#[derive(Debug, Default)]
struct ProjectArena {
    timestamps: BTreeMap<VersionId, TimeStamp>,
    versions: BTreeMap<VersionId, VersionSnapshot>,
    current: Option<VersionId>,
}

/// Arena of snapshots keyed by (project, version, kind, natural key).
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, ProjectArena>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_snapshot(entities: &EntitiesByKind) -> Result<VersionSnapshot, StoreError> {
    let mut snapshot = VersionSnapshot::new();
    for (kind, records) in entities {
        let by_key = snapshot.entry(*kind).or_default();
        for entity in records {
            if entity.kind() != *kind {
                return Err(StoreError::corrupt(
                    *kind,
                    entity.natural_key(),
                    format!("filed under {} but is a {}", kind, entity.kind()),
                ));
            }
            let key = entity.natural_key();
            if by_key.insert(key.clone(), entity.clone()).is_some() {
                return Err(StoreError::Conflict(format!("duplicate {} [{}]", kind, key)));
            }
        }
    }
    Ok(snapshot)
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn read_entities(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
    ) -> Result<Vec<Entity>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&project)
            .and_then(|arena| arena.versions.get(&version))
            .and_then(|snapshot| snapshot.get(&kind))
            .map(|by_key| by_key.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn read_entity(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
        key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&project)
            .and_then(|arena| arena.versions.get(&version))
            .and_then(|snapshot| snapshot.get(&kind))
            .and_then(|by_key| by_key.get(key))
            .cloned())
    }

    async fn write_new_version(
        &self,
        project: ProjectId,
        stamp: &TimeStamp,
        entities: &EntitiesByKind,
    ) -> Result<(), StoreError> {
        // Everything is validated before the arena is touched.
        let snapshot = build_snapshot(entities)?;

        let mut projects = self.projects.write().await;
        let arena = projects.entry(project).or_default();
        if arena.timestamps.contains_key(&stamp.id) {
            return Err(StoreError::Conflict(format!(
                "version {} of project {} already exists",
                stamp.id, project
            )));
        }
        arena.timestamps.insert(stamp.id, stamp.clone());
        arena.versions.insert(stamp.id, snapshot);
        Ok(())
    }

    async fn current_version(&self, project: ProjectId) -> Result<Option<VersionId>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects.get(&project).and_then(|arena| arena.current))
    }

    async fn set_current_version(
        &self,
        project: ProjectId,
        version: VersionId,
    ) -> Result<(), StoreError> {
        let mut projects = self.projects.write().await;
        match projects.get_mut(&project) {
            Some(arena) if arena.timestamps.contains_key(&version) => {
                arena.current = Some(version);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!(
                "version {} of project {}",
                version, project
            ))),
        }
    }

    async fn timestamps(&self, project: ProjectId) -> Result<Vec<TimeStamp>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&project)
            .map(|arena| arena.timestamps.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Global, SocialClass};

    fn payload(class_names: &[&str]) -> EntitiesByKind {
        let mut entities = EntitiesByKind::new();
        entities.insert(
            EntityKind::SocialClass,
            class_names
                .iter()
                .map(|n| Entity::SocialClass(SocialClass::new(*n)))
                .collect(),
        );
        entities.insert(EntityKind::Global, vec![Entity::Global(Global::default())]);
        entities
    }

    #[tokio::test]
    async fn test_write_then_read_version() {
        let store = MemoryStore::new();
        let project = ProjectId::new(1);
        let stamp = TimeStamp::initial(project);

        store
            .write_new_version(project, &stamp, &payload(&["Capitalists", "Workers"]))
            .await
            .unwrap();
        store.set_current_version(project, stamp.id).await.unwrap();

        let classes = store
            .read_entities(EntityKind::SocialClass, project, stamp.id)
            .await
            .unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(
            store.current_version(project).await.unwrap(),
            Some(VersionId::INITIAL)
        );
    }

    #[tokio::test]
    async fn test_duplicate_key_leaves_store_untouched() {
        let store = MemoryStore::new();
        let project = ProjectId::new(1);
        let stamp = TimeStamp::initial(project);

        let err = store
            .write_new_version(project, &stamp, &payload(&["Workers", "Workers"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.timestamps(project).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_version_conflicts() {
        let store = MemoryStore::new();
        let project = ProjectId::new(1);
        let stamp = TimeStamp::initial(project);
        store
            .write_new_version(project, &stamp, &payload(&["Workers"]))
            .await
            .unwrap();

        let err = store
            .write_new_version(project, &stamp, &payload(&["Workers"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_pointer_requires_written_version() {
        let store = MemoryStore::new();
        let err = store
            .set_current_version(ProjectId::new(1), VersionId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
