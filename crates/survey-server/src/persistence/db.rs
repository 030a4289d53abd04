//! Database connection and initialization.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// SQLite-backed repositories. The trait impls live in the per-entity
/// modules.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}

/// Row shape shared by every table read.
#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub document: String,
}

impl DocumentRow {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.document).context("Corrupt stored document")
    }
}

/// Fixed-width RFC 3339 so text columns sort chronologically.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

/// Open the store at `db_path` and apply the schema. `:memory:` gives a
/// single-connection database that lives as long as the pool.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let in_memory = db_path == ":memory:";
    let (options, pool_options) = if in_memory {
        // Every connection to `:memory:` opens its own empty database.
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        (SqliteConnectOptions::from_str("sqlite::memory:")?, pool_options)
    } else {
        if let Some(dir) = Path::new(db_path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create directory {}", dir.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        (options, pool_options)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("Cannot open survey store at {}", db_path))?;
    info!("Opened survey store at {}", db_path);

    apply_schema(&pool).await?;
    Ok(Database { pool })
}

/// Split a SQL script on `;`, dropping `--` comment lines and empty chunks.
fn statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Every schema statement is `IF NOT EXISTS`, so this runs on each start.
async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let statements = statements(SCHEMA);
    for statement in &statements {
        sqlx::query(statement.as_str())
            .execute(pool)
            .await
            .with_context(|| format!("Schema statement failed: {}", statement))?;
    }
    info!("Schema ready ({} statements)", statements.len());
    Ok(())
}
