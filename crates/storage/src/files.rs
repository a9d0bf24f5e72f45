//! File record operations

use sqlx::postgres::{PgRow, Postgres};
use sqlx::{QueryBuilder, Row};

use diag_protocol::{FileNode, ROOT_PARENT};

use crate::error::Result;
use crate::store::PgStore;

const FILE_COLUMNS: &str =
    "path, parent_path, name, is_directory, size, mod_time, is_gzipped, is_scraped";

/// Cap on tree depth to keep the recursive CTE bounded
const MAX_TREE_DEPTH: i32 = 10;

impl PgStore {
    /// Load every file record, ordered by path
    pub async fn load_files(&self) -> Result<Vec<FileNode>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files ORDER BY path"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(read_file_node).collect()
    }

    /// Bulk insert-or-replace keyed by path, one round trip
    pub async fn upsert_files(&self, files: &[FileNode]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO files ({FILE_COLUMNS}) "));
        builder.push_values(files, |mut row, file| {
            row.push_bind(&file.path)
                .push_bind(&file.parent_path)
                .push_bind(&file.name)
                .push_bind(file.is_directory)
                .push_bind(file.size)
                .push_bind(file.mod_time)
                .push_bind(file.is_gzipped)
                .push_bind(file.is_scraped);
        });
        builder.push(
            " ON CONFLICT (path) DO UPDATE SET \
             parent_path = EXCLUDED.parent_path, \
             name = EXCLUDED.name, \
             is_directory = EXCLUDED.is_directory, \
             size = EXCLUDED.size, \
             mod_time = EXCLUDED.mod_time, \
             is_gzipped = EXCLUDED.is_gzipped, \
             is_scraped = EXCLUDED.is_scraped",
        );

        builder.build().execute(self.pool()).await?;
        Ok(())
    }

    /// Bulk delete by path, one round trip
    pub async fn delete_files(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM files WHERE path = ANY($1)")
            .bind(paths)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Fetch the subtree rooted at `path`, `depth` levels deep
    ///
    /// Directories sort before files within each level. Depth is
    /// clamped to keep the recursion bounded regardless of caller.
    pub async fn file_tree(&self, path: &str, depth: i32) -> Result<Vec<FileNode>> {
        let depth = depth.clamp(1, MAX_TREE_DEPTH);

        let rows = if path == ROOT_PARENT {
            sqlx::query(&format!(
                r#"
                WITH RECURSIVE tree AS (
                    SELECT f.*, 1 AS level
                    FROM files f
                    WHERE f.parent_path = '/' OR f.parent_path = ''

                    UNION ALL

                    SELECT f.*, t.level + 1
                    FROM files f
                    JOIN tree t ON f.parent_path = t.path
                    WHERE t.is_directory AND t.level < $1
                )
                SELECT {FILE_COLUMNS}
                FROM tree
                ORDER BY level, parent_path,
                         CASE WHEN is_directory THEN 0 ELSE 1 END, name
                "#
            ))
            .bind(depth)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query(&format!(
                r#"
                WITH RECURSIVE tree AS (
                    SELECT f.*, 0 AS level
                    FROM files f
                    WHERE f.path = $1

                    UNION ALL

                    SELECT f.*, t.level + 1
                    FROM files f
                    JOIN tree t ON f.parent_path = t.path
                    WHERE t.is_directory AND t.level < $2
                )
                SELECT DISTINCT {FILE_COLUMNS}, level
                FROM tree
                ORDER BY level, parent_path,
                         CASE WHEN is_directory THEN 0 ELSE 1 END, name
                "#
            ))
            .bind(path)
            .bind(depth)
            .fetch_all(self.pool())
            .await?
        };

        rows.iter().map(read_file_node).collect()
    }
}

/// Map a row to a `FileNode`, normalizing a blank parent to the root
/// sentinel
fn read_file_node(row: &PgRow) -> Result<FileNode> {
    let parent_path: String = row.try_get("parent_path")?;
    Ok(FileNode {
        path: row.try_get("path")?,
        parent_path: if parent_path.is_empty() {
            ROOT_PARENT.to_string()
        } else {
            parent_path
        },
        name: row.try_get("name")?,
        is_directory: row.try_get("is_directory")?,
        size: row.try_get("size")?,
        mod_time: row.try_get("mod_time")?,
        is_gzipped: row.try_get("is_gzipped")?,
        is_scraped: row.try_get("is_scraped")?,
    })
}
