//! Engine error taxonomy
//!
//! The first failure at any stage aborts the whole run; every variant names
//! the table being processed so an aborted dump is diagnosable.

use crate::template::TemplateError;
use sampledump_catalog::SourceError;

/// Errors that abort a dump run
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Metadata lookup failed for table {table}: {source}")]
    Metadata {
        table: String,
        #[source]
        source: SourceError,
    },

    #[error("Query template for table {table} failed: {source}")]
    Template {
        table: String,
        #[source]
        source: TemplateError,
    },

    #[error("Row export failed for table {table}: {source}")]
    Stream {
        table: String,
        #[source]
        source: SourceError,
    },

    #[error("Failed to write dump output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Circular foreign-key reference involving table {0}")]
    Cycle(String),
}
