//! Source adapter trait for schema inspection and row export

use std::io::Write;

/// Errors that can occur while talking to the source database
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Row export failed: {0}")]
    CopyError(String),

    #[error("Write to output sink failed: {0}")]
    SinkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Trait for adapters that expose a source database to the dump engine
///
/// The engine consumes three capabilities: ordered column names for a table,
/// the set of tables a table references via foreign keys, and a bulk text
/// export of a relation's rows into an output sink.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Get the adapter name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Test the connection to the database
    async fn test_connection(&self) -> Result<(), SourceError>;

    /// Fetch a table's column names, in physical attribute order,
    /// excluding dropped columns
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, SourceError>;

    /// Fetch the tables a table references via foreign-key constraints,
    /// in catalog row order
    ///
    /// The result may repeat a referenced table when several constraints
    /// point at it; callers collapse duplicate edges.
    async fn table_dependencies(&self, table: &str) -> Result<Vec<String>, SourceError>;

    /// Stream a relation's rows into `out` in COPY text format
    ///
    /// `relation` is either a bare table name or a parenthesized subquery.
    /// Returns the number of bytes written.
    async fn copy_rows(
        &self,
        relation: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, SourceError>;
}
