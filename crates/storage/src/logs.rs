//! Log entry operations

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgRow, Postgres};
use sqlx::{QueryBuilder, Row};

use diag_protocol::LogEntry;

use crate::error::Result;
use crate::store::PgStore;

/// Hard cap on rows returned by a single history query
const MAX_SEARCH_ROWS: i64 = 1_000;

impl PgStore {
    /// Bulk append log entries, one round trip
    ///
    /// The envelope dictates the batch size; storage does no further
    /// coalescing.
    pub async fn insert_logs(&self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO logs (file_path, line, line_number, timestamp, level) ",
        );
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(&entry.filename)
                .push_bind(&entry.line)
                .push_bind(entry.line_num)
                .push_bind(entry.timestamp)
                .push_bind(&entry.level);
        });

        builder.build().execute(self.pool()).await?;
        Ok(())
    }

    /// Page backwards through one file's entries
    pub async fn logs_page(
        &self,
        file_path: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT file_path, line, line_number, timestamp, level \
             FROM logs \
             WHERE file_path = $1 AND timestamp < $2 \
             ORDER BY timestamp DESC, line_number DESC \
             LIMIT $3",
        )
        .bind(file_path)
        .bind(before)
        .bind(limit.clamp(1, MAX_SEARCH_ROWS))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(read_log_entry).collect()
    }

    /// Full-text search over log lines
    ///
    /// `files` of `None` searches every file. Matching uses the English
    /// text-search configuration the `search_vector` column was built
    /// with.
    pub async fn search_logs(
        &self,
        query: &str,
        files: Option<&[String]>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT file_path, line, line_number, timestamp, level \
             FROM logs \
             WHERE timestamp BETWEEN $1 AND $2 \
               AND ($3::text[] IS NULL OR file_path = ANY($3)) \
               AND search_vector @@ plainto_tsquery('english', $4) \
             ORDER BY timestamp DESC \
             LIMIT $5",
        )
        .bind(start)
        .bind(end)
        .bind(files)
        .bind(query)
        .bind(MAX_SEARCH_ROWS)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(read_log_entry).collect()
    }
}

fn read_log_entry(row: &PgRow) -> Result<LogEntry> {
    Ok(LogEntry {
        filename: row.try_get("file_path")?,
        line: row.try_get("line")?,
        line_num: row.try_get("line_number")?,
        timestamp: row.try_get("timestamp")?,
        level: row.try_get("level")?,
    })
}
