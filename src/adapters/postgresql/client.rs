//! Pooled PostgreSQL connections

use crate::config::{redact_connection_string, PostgreSQLConfig};
use crate::domain::{Result, TableError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

/// Connection pool plus the settings each checkout applies
pub struct PostgresClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgresClient {
    /// Builds the pool; no connection is opened until first use
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the connection string does not parse or
    /// the TLS connector cannot be built.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        let mut pg_config: tokio_postgres::Config =
            config.connection_string.expose_secret().parse().map_err(|e| {
                TableError::ConnectionFailed(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    TableError::ConnectionFailed(format!("Failed to build TLS connector: {e}"))
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
            }
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .build()
            .map_err(|e| {
                TableError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self { pool, config })
    }

    /// Checks out a connection with the statement timeout applied
    pub async fn connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            TableError::ConnectionFailed(format!("Failed to get connection from pool: {e}"))
        })?;

        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                self.config.statement_timeout_seconds * 1000
            ))
            .await
            .map_err(|e| {
                TableError::ConnectionFailed(format!("Failed to set statement timeout: {e}"))
            })?;

        Ok(client)
    }

    /// Runs `SELECT 1`
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| TableError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        tracing::info!(connection = %self.connection_string_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Connection string without the password
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(&self.config.connection_string)
    }

    pub fn config(&self) -> &PostgreSQLConfig {
        &self.config
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}
