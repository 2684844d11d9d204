//! Repository layer for ledger snapshots.
//!
//! `Repository` is the SQLite implementation of [`LedgerStore`]. Entity row
//! encoding lives in `entities.rs`.

mod entities;

use crate::domain::{ProjectId, TimeStamp, VersionId};
use crate::store::{EntitiesByKind, Entity, EntityKind, LedgerStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, warn};

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Unique and primary-key violations mean the version or a natural key was
/// already written.
fn map_write_error(err: sqlx::Error, context: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(format!("{}: {}", context, db_err.message()));
        }
    }
    StoreError::Db(err)
}

#[async_trait]
impl LedgerStore for Repository {
    async fn read_entities(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
    ) -> Result<Vec<Entity>, StoreError> {
        entities::select_entities(&self.pool, kind, project, version).await
    }

    async fn read_entity(
        &self,
        kind: EntityKind,
        project: ProjectId,
        version: VersionId,
        key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        Ok(self
            .read_entities(kind, project, version)
            .await?
            .into_iter()
            .find(|e| e.natural_key() == key))
    }

    /// Insert the timestamp and every entity of a version in a single transaction.
    ///
    /// If any insert fails the whole version is rolled back, so readers
    /// never observe a partial snapshot.
    async fn write_new_version(
        &self,
        project: ProjectId,
        stamp: &TimeStamp,
        payload: &EntitiesByKind,
    ) -> Result<(), StoreError> {
        let version = stamp.id;
        let context = format!("version {} of project {}", version, project);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO timestamps (project, version, period, predecessor, superstate, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.as_i64())
        .bind(version.as_i64())
        .bind(stamp.period)
        .bind(stamp.predecessor.map(|v| v.as_i64()))
        .bind(stamp.superstate.as_deref())
        .bind(stamp.description.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &context))?;

        let mut written = 0usize;
        for entity in payload.values().flatten() {
            entities::insert_entity(&mut *tx, project, version, entity)
                .await
                .map_err(|e| map_write_error(e, &context))?;
            written += 1;
        }

        tx.commit().await?;
        debug!(project = %project, version = %version, entities = written, "Version written");
        Ok(())
    }

    async fn current_version(&self, project: ProjectId) -> Result<Option<VersionId>, StoreError> {
        let row = sqlx::query("SELECT current_version FROM projects WHERE id = ?")
            .bind(project.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .and_then(|r| r.get::<Option<i64>, _>("current_version"))
            .map(VersionId::new))
    }

    async fn set_current_version(
        &self,
        project: ProjectId,
        version: VersionId,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM timestamps WHERE project = ? AND version = ?")
            .bind(project.as_i64())
            .bind(version.as_i64())
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            warn!(project = %project, version = %version, "Refusing to point at unwritten version");
            return Err(StoreError::NotFound(format!(
                "version {} of project {}",
                version, project
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO projects (id, current_version)
            VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET current_version = excluded.current_version
            "#,
        )
        .bind(project.as_i64())
        .bind(version.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn timestamps(&self, project: ProjectId) -> Result<Vec<TimeStamp>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT version, period, predecessor, superstate, description
            FROM timestamps
            WHERE project = ?
            ORDER BY version ASC
            "#,
        )
        .bind(project.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TimeStamp {
                id: VersionId::new(row.get("version")),
                project,
                period: row.get("period"),
                predecessor: row
                    .get::<Option<i64>, _>("predecessor")
                    .map(VersionId::new),
                superstate: row.get("superstate"),
                description: row.get("description"),
            })
            .collect())
    }
}
