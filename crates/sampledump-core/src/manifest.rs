//! Dump manifest parsing
//!
//! Parses the YAML manifest that declares which tables to dump, with optional
//! per-table selection queries, explicit column lists, and post-load actions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// The dump manifest (top-level YAML document)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Template variables substituted into selection queries
    #[serde(default)]
    pub vars: HashMap<String, String>,

    /// Tables to dump, in declaration order
    #[serde(default)]
    pub tables: Vec<ManifestItem>,
}

impl Manifest {
    /// Load a manifest from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_yaml(&contents)
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_yaml::from_str(yaml).map_err(|e| ManifestError::ParseError(e.to_string()))?;

        manifest.validate()?;

        Ok(manifest)
    }

    /// Reject entries that cannot name a table
    fn validate(&self) -> Result<(), ManifestError> {
        for (index, item) in self.tables.iter().enumerate() {
            if item.table.is_empty() {
                return Err(ManifestError::EmptyTableName { index });
            }
        }

        Ok(())
    }
}

/// One table entry in the manifest
///
/// Only `table` is required. An absent `query` dumps the whole table, an
/// absent `columns` list is discovered from the live catalog, and
/// `post_actions` are emitted verbatim after the table's data block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Table name
    pub table: String,

    /// Selection query template ({{ var }} placeholders refer to `vars`)
    #[serde(default)]
    pub query: Option<String>,

    /// Explicit column projection, in emission order
    #[serde(default)]
    pub columns: Vec<String>,

    /// Statements emitted after the table's data block
    #[serde(default)]
    pub post_actions: Vec<String>,
}

impl ManifestItem {
    /// Create a default entry for a table discovered via a foreign key but
    /// not declared in the manifest
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// Manifest error types
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest YAML: {0}")]
    ParseError(String),

    #[error("Manifest entry #{index} has an empty table name")]
    EmptyTableName { index: usize },
}
