//! Error types for the API gateway.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant belongs to exactly one [`ErrorKind`], and the kind alone decides the
//! HTTP status and whether the upstream error text is exposed in the `detail` field.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Required fields missing: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("Engine \"{engine}\" is not supported")]
    EngineNotFound { engine: String },

    #[error("Malformed connection string: {reason}")]
    MalformedDsn { reason: String },

    #[error("Invalid table name \"{table}\": only letters, digits and underscore are allowed")]
    InvalidTableName { table: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Table \"{table}\" not found")]
    TableNotFound { table: String },

    #[error("Failed to connect to target database")]
    ConnectionFailed { message: String, suggestion: String },

    #[error("Failed to execute statement")]
    QueryFailed {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    #[error("Failed to fetch from external URL")]
    UpstreamUnavailable { url: String, message: String },

    #[error("External URL responded with an error")]
    UpstreamRejected { url: String, status: u16, body: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input; never reaches I/O.
    Validation,
    /// Referenced catalog entity or table absent.
    NotFound,
    /// Target database or HTTP service unreachable.
    UpstreamConnection,
    /// Target reachable, statement or request failed.
    UpstreamQuery,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamConnection | Self::UpstreamQuery | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl GatewayError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a missing fields error.
    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingFields {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn engine_not_found(engine: impl Into<String>) -> Self {
        Self::EngineNotFound {
            engine: engine.into(),
        }
    }

    pub fn malformed_dsn(reason: impl Into<String>) -> Self {
        Self::MalformedDsn {
            reason: reason.into(),
        }
    }

    pub fn invalid_table_name(table: impl Into<String>) -> Self {
        Self::InvalidTableName {
            table: table.into(),
        }
    }

    /// Create a not found error for a catalog entity.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection_failed(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement error with optional SQL state.
    pub fn query_failed(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
            sql_state,
        }
    }

    pub fn upstream_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn upstream_rejected(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamRejected {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::MissingFields { .. }
            | Self::EngineNotFound { .. }
            | Self::MalformedDsn { .. }
            | Self::InvalidTableName { .. } => ErrorKind::Validation,
            Self::NotFound { .. } | Self::TableNotFound { .. } => ErrorKind::NotFound,
            Self::ConnectionFailed { .. } | Self::UpstreamUnavailable { .. } => {
                ErrorKind::UpstreamConnection
            }
            Self::QueryFailed { .. } | Self::UpstreamRejected { .. } => ErrorKind::UpstreamQuery,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Upstream error text, only for upstream failures.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::ConnectionFailed {
                message,
                suggestion,
            } => Some(format!("{message}. {suggestion}")),
            Self::QueryFailed {
                message,
                sql_state: Some(code),
            } => Some(format!("{message} (SQLSTATE: {code})")),
            Self::QueryFailed { message, .. } => Some(message.clone()),
            Self::UpstreamUnavailable { message, .. } => Some(message.clone()),
            Self::UpstreamRejected { status, body, .. } if body.is_empty() => {
                Some(format!("HTTP {status}"))
            }
            Self::UpstreamRejected { status, body, .. } => Some(format!("HTTP {status}: {body}")),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// Convert sqlx errors raised by a statement on an open connection.
///
/// Errors raised while opening a connection never pass through here; the
/// connection manager maps those to [`GatewayError::ConnectionFailed`] itself.
impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                GatewayError::query_failed(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => GatewayError::query_failed("No rows returned", None),
            sqlx::Error::Io(io_err) => GatewayError::connection_failed(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => GatewayError::connection_failed(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => GatewayError::connection_failed(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => GatewayError::connection_failed(
                err.to_string(),
                "Check that the catalog database is reachable",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                GatewayError::query_failed(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                GatewayError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                GatewayError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => GatewayError::internal("Database worker crashed"),
            _ => GatewayError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error envelope: `{ error, detail? }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        match err.kind() {
            ErrorKind::Internal => Self {
                error: "Internal server error".to_string(),
                detail: None,
            },
            _ => Self {
                error: err.to_string(),
                detail: err.detail(),
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = ?self.kind(), error = %self, detail = ?self.detail(), "Request failed");
            if let Self::Internal { message } = &self {
                error!(message = %message, "Internal error");
            }
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
