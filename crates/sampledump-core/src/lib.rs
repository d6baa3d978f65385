//! sampledump Core
//!
//! The manifest model: the declarative plan naming which tables to dump,
//! with optional per-table query/column/post-action overrides.

pub mod manifest;

pub use manifest::{Manifest, ManifestError, ManifestItem};
