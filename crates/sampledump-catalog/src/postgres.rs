//! PostgreSQL source adapter
//!
//! Schema inspection goes through the system catalogs directly:
//! `pg_catalog.pg_attribute` for column order and `pg_catalog.pg_constraint`
//! for foreign-key edges. Row export uses `COPY ... TO STDOUT` so the wire
//! format of the data blocks is produced by the server, not by this crate.
//!
//! ## Authentication
//!
//! The adapter supports:
//! 1. Direct password authentication (`connect`)
//! 2. TLS/SSL connections via native-tls (`connect_with_tls`)
//! 3. A PostgreSQL connection string (`from_connection_string`)

use crate::adapter::{SourceAdapter, SourceError};
use std::io::Write;
use std::pin::pin;

use futures_util::TryStreamExt;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, NoTls};

/// Ordered column names for a table, dropped columns excluded
const COLUMNS_SQL: &str = "
    SELECT attname
    FROM pg_catalog.pg_attribute
    WHERE
        attrelid = $1::text::regclass
        AND attnum > 0
        AND NOT attisdropped
    ORDER BY attnum
";

/// Tables referenced by a table's foreign-key constraints, in catalog order
const DEPENDENCIES_SQL: &str = "
    SELECT confrelid::regclass::text
    FROM pg_catalog.pg_constraint
    WHERE
        conrelid = $1::text::regclass
        AND contype = 'f'
";

/// PostgreSQL source adapter
pub struct PostgresAdapter {
    client: Client,

    /// Connection host
    host: String,

    /// Connection port
    port: u16,

    /// Database name
    database: String,
}

impl PostgresAdapter {
    /// Connect with direct credentials
    ///
    /// For TLS connections, use [`connect_with_tls`](Self::connect_with_tls)
    /// instead. A host starting with `/` is treated as a Unix socket
    /// directory, matching libpq.
    pub async fn connect(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let host = host.into();
        let database = database.into();

        let config = format!(
            "host={} port={} dbname={} user={} password={}",
            host,
            port,
            database,
            user.into(),
            password.into()
        );

        let (client, connection) =
            tokio_postgres::connect(&config, NoTls)
                .await
                .map_err(|e| {
                    SourceError::AuthenticationError(format!(
                        "Failed to connect to PostgreSQL at {}:{}: {}",
                        host, port, e
                    ))
                })?;

        let host_clone = host.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(host = %host_clone, port, "PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            client,
            host,
            port,
            database,
        })
    }

    /// Connect with direct credentials over TLS
    pub async fn connect_with_tls(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let host = host.into();
        let database = database.into();

        let config = format!(
            "host={} port={} dbname={} user={} password={}",
            host,
            port,
            database,
            user.into(),
            password.into()
        );

        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| SourceError::ConfigError(format!("Failed to create TLS connector: {}", e)))?;

        let tls = MakeTlsConnector::new(connector);

        let (client, connection) = tokio_postgres::connect(&config, tls).await.map_err(|e| {
            SourceError::AuthenticationError(format!(
                "Failed to connect to PostgreSQL at {}:{} with TLS: {}",
                host, port, e
            ))
        })?;

        let host_clone = host.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(host = %host_clone, port, "PostgreSQL TLS connection error: {}", e);
            }
        });

        Ok(Self {
            client,
            host,
            port,
            database,
        })
    }

    /// Connect using a PostgreSQL connection string
    ///
    /// Supports the standard keyword/value format:
    /// `host=localhost port=5432 dbname=mydb user=postgres password=secret`
    pub async fn from_connection_string(conn_str: &str) -> Result<Self, SourceError> {
        let config: tokio_postgres::Config = conn_str
            .parse()
            .map_err(|e| SourceError::ConfigError(format!("Invalid connection string: {}", e)))?;

        let host = config
            .get_hosts()
            .first()
            .map(|h| format!("{:?}", h))
            .unwrap_or_else(|| "localhost".to_string());
        let port = config.get_ports().first().copied().unwrap_or(5432);
        let database = config.get_dbname().unwrap_or("postgres").to_string();

        let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .map_err(|e| SourceError::AuthenticationError(format!("Failed to connect: {}", e)))?;

        let host_clone = host.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(host = %host_clone, port, "PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            client,
            host,
            port,
            database,
        })
    }

    /// Get the connection host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the connection port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the database name
    pub fn database(&self) -> &str {
        &self.database
    }

    fn map_query_error(table: &str, e: tokio_postgres::Error) -> SourceError {
        let err_str = e.to_string();
        if err_str.contains("does not exist") {
            SourceError::TableNotFound(table.to_string())
        } else if err_str.contains("permission denied") {
            SourceError::PermissionDenied(format!("Cannot access {}: {}", table, err_str))
        } else {
            SourceError::QueryError(err_str)
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for PostgresAdapter {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn test_connection(&self) -> Result<(), SourceError> {
        self.client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| SourceError::QueryError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, SourceError> {
        let rows = self
            .client
            .query(COLUMNS_SQL, &[&table])
            .await
            .map_err(|e| Self::map_query_error(table, e))?;

        let columns: Vec<String> = rows.iter().map(|row| row.get(0)).collect();

        if columns.is_empty() {
            return Err(SourceError::TableNotFound(format!(
                "Table {} not found or has no columns",
                table
            )));
        }

        Ok(columns)
    }

    async fn table_dependencies(&self, table: &str) -> Result<Vec<String>, SourceError> {
        let rows = self
            .client
            .query(DEPENDENCIES_SQL, &[&table])
            .await
            .map_err(|e| Self::map_query_error(table, e))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn copy_rows(
        &self,
        relation: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, SourceError> {
        let sql = format!("COPY {} TO STDOUT", relation);

        let stream = self
            .client
            .copy_out(&sql)
            .await
            .map_err(|e| Self::map_query_error(relation, e))?;
        let mut stream = pin!(stream);

        let mut written = 0u64;
        while let Some(bytes) = stream
            .try_next()
            .await
            .map_err(|e| SourceError::CopyError(e.to_string()))?
        {
            out.write_all(&bytes)
                .map_err(|e| SourceError::SinkError(e.to_string()))?;
            written += bytes.len() as u64;
        }

        tracing::debug!(relation, bytes = written, "exported rows");

        Ok(written)
    }
}
