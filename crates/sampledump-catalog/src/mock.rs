//! Mock source adapter for testing
//!
//! Returns predefined catalog metadata and row data without connecting to a
//! real database. Useful for:
//! - Unit testing the dependency resolver and dump writer
//! - Integration tests in CI without credentials
//! - Simulating error conditions per table
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sampledump_catalog::{MockAdapterBuilder, SourceAdapter};
//!
//! let adapter = MockAdapterBuilder::new()
//!     .with_table("users", &["id", "name"], &[], "1\talice\n")
//!     .with_table("orders", &["id", "user_id"], &["users"], "1\t1\n")
//!     .build();
//!
//! let deps = adapter.table_dependencies("orders").await?;
//! assert_eq!(deps, vec!["users"]);
//! ```

use crate::adapter::{SourceAdapter, SourceError};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog metadata for one mock table
#[derive(Debug, Clone, Default)]
struct MockTable {
    columns: Vec<String>,
    dependencies: Vec<String>,
}

/// Mock source adapter for testing
///
/// Stores catalog metadata and COPY-format row text in memory. Row data is
/// keyed by relation, so both bare table names and parenthesized subqueries
/// can be registered.
pub struct MockAdapter {
    /// Catalog metadata by table name
    tables: Arc<RwLock<HashMap<String, MockTable>>>,

    /// Raw COPY text by relation (table name or parenthesized subquery)
    rows: Arc<RwLock<HashMap<String, String>>>,

    /// Errors to return for specific tables
    errors: Arc<RwLock<HashMap<String, SourceError>>>,

    /// Simulate connection failure
    fail_connection: bool,
}

impl MockAdapter {
    /// Create a new mock adapter with no tables
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            rows: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            fail_connection: false,
        }
    }

    /// Register a table with its columns, foreign-key dependencies, and rows
    pub async fn add_table(&self, table: &str, columns: &[&str], dependencies: &[&str], rows: &str) {
        self.add_table_meta(table, columns, dependencies).await;
        self.add_rows(table, rows).await;
    }

    /// Register catalog metadata only; `copy_rows` for the table will fail
    pub async fn add_table_meta(&self, table: &str, columns: &[&str], dependencies: &[&str]) {
        self.tables.write().await.insert(
            table.to_string(),
            MockTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            },
        );
    }

    /// Register COPY-format row text for a relation
    pub async fn add_rows(&self, relation: &str, rows: &str) {
        self.rows
            .write()
            .await
            .insert(relation.to_string(), rows.to_string());
    }

    /// Configure an error to be returned for a specific table's metadata
    pub async fn add_error_for_table(&self, table: &str, error: SourceError) {
        self.errors.write().await.insert(table.to_string(), error);
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    async fn check_error(&self, table: &str) -> Result<(), SourceError> {
        if let Some(error) = self.errors.read().await.get(table) {
            return Err(error.clone());
        }
        Ok(())
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAdapter {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            rows: Arc::clone(&self.rows),
            errors: Arc::clone(&self.errors),
            fail_connection: self.fail_connection,
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn test_connection(&self) -> Result<(), SourceError> {
        if self.fail_connection {
            Err(SourceError::AuthenticationError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, SourceError> {
        self.check_error(table).await?;

        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| SourceError::TableNotFound(table.to_string()))
    }

    async fn table_dependencies(&self, table: &str) -> Result<Vec<String>, SourceError> {
        self.check_error(table).await?;

        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.dependencies.clone())
            .ok_or_else(|| SourceError::TableNotFound(table.to_string()))
    }

    async fn copy_rows(
        &self,
        relation: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, SourceError> {
        let rows = self.rows.read().await;
        let data = rows
            .get(relation)
            .ok_or_else(|| SourceError::TableNotFound(relation.to_string()))?;

        out.write_all(data.as_bytes())
            .map_err(|e| SourceError::SinkError(e.to_string()))?;

        Ok(data.len() as u64)
    }
}

/// Builder for creating a MockAdapter with predefined tables
pub struct MockAdapterBuilder {
    tables: HashMap<String, MockTable>,
    rows: HashMap<String, String>,
    errors: HashMap<String, SourceError>,
    fail_connection: bool,
}

impl MockAdapterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            rows: HashMap::new(),
            errors: HashMap::new(),
            fail_connection: false,
        }
    }

    /// Add a table with columns, dependencies, and COPY-format rows
    pub fn with_table(
        mut self,
        table: &str,
        columns: &[&str],
        dependencies: &[&str],
        rows: &str,
    ) -> Self {
        self.tables.insert(
            table.to_string(),
            MockTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            },
        );
        self.rows.insert(table.to_string(), rows.to_string());
        self
    }

    /// Add a table with metadata only (no row data registered)
    pub fn with_table_meta(mut self, table: &str, columns: &[&str], dependencies: &[&str]) -> Self {
        self.tables.insert(
            table.to_string(),
            MockTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            },
        );
        self
    }

    /// Register COPY-format rows for a relation (e.g. a parenthesized subquery)
    pub fn with_rows(mut self, relation: &str, rows: &str) -> Self {
        self.rows.insert(relation.to_string(), rows.to_string());
        self
    }

    /// Add an error for a specific table's metadata lookups
    pub fn with_error(mut self, table: &str, error: SourceError) -> Self {
        self.errors.insert(table.to_string(), error);
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Build the MockAdapter
    pub fn build(self) -> MockAdapter {
        MockAdapter {
            tables: Arc::new(RwLock::new(self.tables)),
            rows: Arc::new(RwLock::new(self.rows)),
            errors: Arc::new(RwLock::new(self.errors)),
            fail_connection: self.fail_connection,
        }
    }
}

impl Default for MockAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
