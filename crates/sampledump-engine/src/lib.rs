//! sampledump Engine
//!
//! The dependency-ordered dump engine: resolves the manifest against the live
//! foreign-key graph, renders per-table selection queries, and streams each
//! table's data block into the output document.

pub mod error;
pub mod resolver;
pub mod template;
pub mod writer;

pub use error::DumpError;
pub use resolver::ManifestResolver;
pub use template::{render_query, TemplateError};
pub use writer::{write_dump, DumpSummary};
