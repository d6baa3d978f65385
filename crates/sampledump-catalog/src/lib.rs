//! Source database adapters for the dump engine
//!
//! This crate provides the [`SourceAdapter`] trait the engine consumes for
//! schema inspection and bulk row export, a live [`PostgresAdapter`], and a
//! [`MockAdapter`] for tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sampledump_catalog::{PostgresAdapter, SourceAdapter};
//!
//! let adapter = PostgresAdapter::connect("localhost", 5432, "mydb", "me", "secret").await?;
//! let columns = adapter.table_columns("users").await?;
//! let deps = adapter.table_dependencies("orders").await?;
//! ```

pub mod adapter;
pub mod mock;
pub mod postgres;

pub use adapter::{SourceAdapter, SourceError};
pub use mock::{MockAdapter, MockAdapterBuilder};
pub use postgres::PostgresAdapter;
