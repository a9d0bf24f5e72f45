//! Pool construction and schema bootstrap

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{Result, StorageError};

/// Connection pool limits, tuned for one collector process
const MAX_CONNECTIONS: u32 = 20;
const MIN_CONNECTIONS: u32 = 5;
const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Postgres-backed storage adapter
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and verify the database is reachable
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(MIN_CONNECTIONS)
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
            .connect(url)
            .await
            .map_err(StorageError::Connect)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(StorageError::Connect)?;

        tracing::info!(
            max_connections = MAX_CONNECTIONS,
            min_connections = MIN_CONNECTIONS,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    /// Create the three relations and their indexes when absent
    pub async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                parent_path TEXT NOT NULL DEFAULT '/',
                name TEXT NOT NULL,
                is_directory BOOLEAN NOT NULL,
                size BIGINT NOT NULL,
                mod_time TIMESTAMPTZ NOT NULL,
                is_gzipped BOOLEAN NOT NULL DEFAULT FALSE,
                is_scraped BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_files_parent ON files (parent_path)",
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id BIGSERIAL PRIMARY KEY,
                file_path TEXT NOT NULL,
                line TEXT NOT NULL,
                line_number INTEGER NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                level TEXT NOT NULL,
                search_vector TSVECTOR
                    GENERATED ALWAYS AS (to_tsvector('english', line)) STORED
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_logs_file_time ON logs (file_path, timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_logs_search ON logs USING GIN (search_vector)",
            r#"
            CREATE TABLE IF NOT EXISTS network_packets (
                time TIMESTAMPTZ NOT NULL,
                protocol TEXT NOT NULL,
                src_ip TEXT NOT NULL,
                dst_ip TEXT NOT NULL,
                src_port INTEGER NOT NULL,
                dst_port INTEGER NOT NULL,
                length INTEGER NOT NULL,
                payload_size INTEGER NOT NULL,
                tcp_flags TEXT NOT NULL DEFAULT ''
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_network_packets_time ON network_packets (time DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(StorageError::Schema)?;
        }

        tracing::debug!("storage schema verified");
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight statements
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
