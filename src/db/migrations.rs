//! Database initialization and schema migrations.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Open (creating if needed) the SQLite ledger database and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, "Ledger database ready");
    Ok(pool)
}

/// Apply `schema.sql`. Every statement is `IF NOT EXISTS`, so reruns are no-ops.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");

    let mut applied = 0usize;
    for statement in schema_statements(schema_sql) {
        sqlx::query(&statement).execute(pool).await?;
        applied += 1;
    }

    debug!(statements = applied, "Schema applied");
    Ok(())
}

/// Split a SQL script into statements. `--` comment lines are dropped first
/// so punctuation inside them cannot end a statement.
fn schema_statements(sql: &str) -> Vec<String> {
    let code: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    code.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-connection pragmas. Foreign keys tie every entity row to its timestamp.
async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the mode actually in effect
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "SQLite connection configured");

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_pool(dir: &TempDir) -> SqlitePool {
        let db_path = dir.path().join("ledger.db").to_string_lossy().to_string();
        init_db(&db_path).await.expect("init_db failed")
    }

    #[tokio::test]
    async fn test_init_db_creates_ledger_tables() {
        let temp_dir = TempDir::new().unwrap();
        let pool = temp_pool(&temp_dir).await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query failed");
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "commodities",
                "globals",
                "industries",
                "projects",
                "social_classes",
                "stocks",
                "timestamps"
            ]
        );
    }

    #[test]
    fn test_comment_punctuation_does_not_split_statements() {
        let sql = "-- first; second\nCREATE TABLE a (x INTEGER);\n-- trailing; note\nCREATE TABLE b (y TEXT);\n";
        assert_eq!(
            schema_statements(sql),
            vec!["CREATE TABLE a (x INTEGER)", "CREATE TABLE b (y TEXT)"]
        );
    }

    #[test]
    fn test_bundled_schema_statements_are_all_creates() {
        let statements = schema_statements(include_str!("schema.sql"));
        assert!(!statements.is_empty());
        for statement in statements {
            assert!(statement.starts_with("CREATE"), "unexpected statement: {}", statement);
        }
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = temp_pool(&temp_dir).await;

        run_migrations(&pool)
            .await
            .expect("second migration run failed");
    }

    #[tokio::test]
    async fn test_entity_rows_require_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let pool = temp_pool(&temp_dir).await;

        let result = sqlx::query(
            "INSERT INTO globals (project, version, melt, labour_supply_response, price_dynamics, revenue_share)
             VALUES (1, 1, '1', 'flexible', 'simple', '1')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "orphan entity row should violate the foreign key");
    }
}
