//! DuckDB warehouse loader
//!
//! Creates the target table from the artifact's DDL fragment and bulk-inserts
//! every staged file with `read_csv`, using the same dialect the files were
//! written with.

use super::Loader;
use crate::error::{Error, Result};
use crate::output::StagingDialect;
use crate::stage::StagingArtifact;
use crate::types::LoadMode;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Loader writing into a DuckDB database
pub struct DuckDbLoader {
    conn: Mutex<Connection>,
    dialect: StagingDialect,
    target: String,
}

impl DuckDbLoader {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::config(format!("Failed to open DuckDB at {}: {e}", path.display())))?;
        Ok(Self::with_connection(conn, path.display().to_string()))
    }

    /// Open an in-memory database
    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self::with_connection(conn, ":memory:".to_string()))
    }

    fn with_connection(conn: Connection, target: String) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect: StagingDialect::new(),
            target,
        }
    }

    /// Set the dialect staged files are read with
    #[must_use]
    pub fn with_dialect(mut self, dialect: StagingDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> Result<u64> {
        let conn = self.lock(table)?;
        let count: i64 = conn
            .query_row(&format!("SELECT count(*) FROM {}", quote_ident(table)), [], |row| {
                row.get(0)
            })
            .map_err(|e| Error::load(table, e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Values of one column rendered as text, in insertion order
    pub fn column_text(&self, table: &str, column: &str) -> Result<Vec<Option<String>>> {
        let conn = self.lock(table)?;
        let sql = format!(
            "SELECT CAST({} AS VARCHAR) FROM {}",
            quote_ident(column),
            quote_ident(table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::load(table, e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| Error::load(table, e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::load(table, e.to_string()))
    }

    fn lock(&self, dataset: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::load(dataset, "DuckDB connection lock poisoned"))
    }

    fn read_csv_sql(&self, file: &Path) -> String {
        format!(
            "read_csv({}, delim={}, quote={}, nullstr={}, header=true, all_varchar=true, allow_quoted_nulls=false)",
            quote_literal(&file.display().to_string()),
            quote_literal(&char::from(self.dialect.delimiter()).to_string()),
            quote_literal(&char::from(self.dialect.quote()).to_string()),
            quote_literal(self.dialect.null_text()),
        )
    }
}

impl Loader for DuckDbLoader {
    fn load(&self, artifact: &StagingArtifact, mode: LoadMode) -> Result<()> {
        let dataset = artifact.dataset.as_str();
        if artifact.is_empty() {
            debug!(dataset, "Nothing staged, skipping load");
            return Ok(());
        }
        if artifact.ddl.is_empty() {
            return Err(Error::load(dataset, "staged files carry no column DDL"));
        }

        let table = quote_ident(dataset);
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} ({});\n", artifact.ddl);
        if mode == LoadMode::Truncate {
            sql.push_str(&format!("DELETE FROM {table};\n"));
        }
        for file in &artifact.files {
            sql.push_str(&format!(
                "INSERT INTO {table} BY NAME SELECT * FROM {};\n",
                self.read_csv_sql(file)
            ));
        }

        let conn = self.lock(dataset)?;
        conn.execute_batch(&format!("BEGIN TRANSACTION;\n{sql}COMMIT;"))
            .map_err(|e| {
                // Leave the table as it was before this load
                let _ = conn.execute_batch("ROLLBACK;");
                Error::load(dataset, e.to_string())
            })?;

        info!(
            dataset,
            %mode,
            files = artifact.files.len(),
            rows = artifact.rows,
            target = %self.target,
            "Loaded artifact"
        );
        Ok(())
    }
}

impl std::fmt::Debug for DuckDbLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbLoader")
            .field("target", &self.target)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

/// Quote an SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
