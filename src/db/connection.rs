//! Transient connection management.
//!
//! Every call opens exactly one connection to the target database, hands it
//! to the caller's operation, and closes it before returning. Nothing is
//! pooled or cached between calls.

use crate::db::dsn;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ConnectionDescriptor, EngineKind};
use futures_util::future::BoxFuture;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use std::time::Instant;
use tracing::{debug, warn};

/// Where to connect: an explicit descriptor or a stored DSN.
#[derive(Debug, Clone)]
pub enum ConnectionTarget {
    Descriptor(ConnectionDescriptor),
    /// Contains the plaintext password - never log
    Dsn(String),
}

impl ConnectionTarget {
    /// Resolve to a descriptor. Decoding a DSN never touches the network.
    pub fn resolve(&self) -> GatewayResult<ConnectionDescriptor> {
        match self {
            Self::Descriptor(d) => Ok(d.clone()),
            Self::Dsn(s) => dsn::decode(s),
        }
    }
}

impl From<ConnectionDescriptor> for ConnectionTarget {
    fn from(descriptor: ConnectionDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// An open connection to a target database.
#[derive(Debug)]
pub enum TargetConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

impl TargetConnection {
    /// Open a single connection for the given descriptor.
    ///
    /// Every failure here is reported as [`GatewayError::ConnectionFailed`],
    /// including authentication errors returned by the server.
    pub async fn open(descriptor: &ConnectionDescriptor) -> GatewayResult<Self> {
        let start = Instant::now();
        let result = match descriptor.engine {
            EngineKind::MySQL => {
                let mut options = MySqlConnectOptions::new()
                    .host(&descriptor.host)
                    .port(descriptor.port)
                    .username(&descriptor.username)
                    .database(&descriptor.database)
                    .charset("utf8mb4");
                if let Some(password) = &descriptor.password {
                    options = options.password(password);
                }
                options.connect().await.map(Self::MySql)
            }
            EngineKind::PostgreSQL => {
                let mut options = PgConnectOptions::new()
                    .host(&descriptor.host)
                    .port(descriptor.port)
                    .username(&descriptor.username)
                    .database(&descriptor.database);
                if let Some(password) = &descriptor.password {
                    options = options.password(password);
                }
                options.connect().await.map(Self::Postgres)
            }
        };

        match result {
            Ok(conn) => {
                debug!(
                    engine = %descriptor.engine,
                    host = %descriptor.host,
                    port = descriptor.port,
                    database = %descriptor.database,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Opened transient connection"
                );
                Ok(conn)
            }
            Err(e) => {
                warn!(
                    engine = %descriptor.engine,
                    host = %descriptor.host,
                    port = descriptor.port,
                    error = %e,
                    "Failed to connect to target database"
                );
                Err(GatewayError::connection_failed(
                    e.to_string(),
                    connection_suggestion(descriptor.engine, &e),
                ))
            }
        }
    }

    pub fn engine(&self) -> EngineKind {
        match self {
            Self::MySql(_) => EngineKind::MySQL,
            Self::Postgres(_) => EngineKind::PostgreSQL,
        }
    }

    /// Close the connection gracefully. Failures are logged, not returned.
    pub async fn close(self) {
        let engine = self.engine();
        let result = match self {
            Self::MySql(conn) => conn.close().await,
            Self::Postgres(conn) => conn.close().await,
        };
        match result {
            Ok(()) => debug!(engine = %engine, "Closed transient connection"),
            Err(e) => warn!(engine = %engine, error = %e, "Error while closing connection"),
        }
    }
}

/// Run `op` against a freshly opened connection and always release it.
///
/// The connection is closed after `op` completes, whether it returned `Ok`
/// or `Err`. If the future is dropped or `op` panics, dropping the
/// connection closes the socket.
///
/// There is no timeout: a slow target holds the caller until the transport
/// gives up.
///
/// # Example
///
/// ```ignore
/// let tables = with_connection(&target, |conn| {
///     Box::pin(async move { SchemaInspector::list_tables(conn).await })
/// })
/// .await?;
/// ```
pub async fn with_connection<T, F>(target: &ConnectionTarget, op: F) -> GatewayResult<T>
where
    F: for<'c> FnOnce(&'c mut TargetConnection) -> BoxFuture<'c, GatewayResult<T>>,
{
    let descriptor = target.resolve()?;
    let mut conn = TargetConnection::open(&descriptor).await?;
    let result = op(&mut conn).await;
    conn.close().await;
    result
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(engine: EngineKind, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", engine);
    }

    if error_str.contains("authentication")
        || error_str.contains("password")
        || error_str.contains("access denied")
    {
        return "Verify the username and password of the project".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration of the target server".to_string();
    }

    if error_str.contains("failed to lookup") || error_str.contains("name or service") {
        return "Check that the host name resolves".to_string();
    }

    format!("Verify host, port and credentials for the {} server", engine)
}
