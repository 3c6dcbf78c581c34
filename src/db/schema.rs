//! Schema introspection module.
//!
//! Lists base tables and describes column structure on an open transient
//! connection, for MySQL and PostgreSQL.
//!
//! # Architecture
//!
//! The statements live in the engine catalog (`db::engines`). Engine-specific
//! row shapes are normalized here in the `mysql` and `postgres` submodules,
//! each providing the same interface.

use crate::db::connection::TargetConnection;
use crate::db::engines::{self, EngineProfile};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ColumnDescriptor, TableDescriptor};
use indexmap::IndexMap;
use tracing::debug;

/// SQLSTATE reported by MySQL for an unknown table.
const MYSQL_NO_SUCH_TABLE: &str = "42S02";

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List all base tables, in the order the engine returns them.
    pub async fn list_tables(conn: &mut TargetConnection) -> GatewayResult<Vec<String>> {
        let profile = engines::profile(conn.engine());
        let tables = match conn {
            TargetConnection::MySql(c) => mysql::list_tables(c, profile).await?,
            TargetConnection::Postgres(c) => postgres::list_tables(c, profile).await?,
        };
        debug!(engine = profile.name, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Describe a table's columns.
    ///
    /// The table name is validated before any statement is sent.
    pub async fn describe_table(
        conn: &mut TargetConnection,
        table: &str,
    ) -> GatewayResult<TableDescriptor> {
        let profile = engines::profile(conn.engine());
        let sql = profile.describe_query(table)?;

        let columns = match conn {
            TargetConnection::MySql(c) => mysql::describe(c, &sql, table).await?,
            TargetConnection::Postgres(c) => postgres::describe(c, &sql).await?,
        };

        // PostgreSQL reports an unknown table and a zero-column table alike.
        if columns.is_empty() && !contains_table(&Self::list_tables(conn).await?, table) {
            return Err(GatewayError::table_not_found(table));
        }

        debug!(
            engine = profile.name,
            table = table,
            columns = columns.len(),
            "Described table"
        );
        Ok(TableDescriptor::new(table, columns))
    }

    /// Describe every base table.
    ///
    /// All-or-nothing: the first table that fails to describe aborts the
    /// whole operation.
    pub async fn describe_all(
        conn: &mut TargetConnection,
    ) -> GatewayResult<IndexMap<String, TableDescriptor>> {
        let tables = Self::list_tables(conn).await?;
        let mut described = IndexMap::with_capacity(tables.len());
        for table in tables {
            let descriptor = Self::describe_table(conn, &table).await?;
            described.insert(table, descriptor);
        }
        Ok(described)
    }
}

/// Check whether `table` is one of the listed tables (exact match).
pub fn contains_table(tables: &[String], table: &str) -> bool {
    tables.iter().any(|t| t == table)
}

/// "YES"/"NO" as reported by both engines.
fn parse_nullable(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use crate::db::types::text_or_bytes;
    use crate::models::KeyRole;
    use sqlx::MySqlConnection;
    use sqlx::mysql::MySqlRow;

    pub async fn list_tables(
        conn: &mut MySqlConnection,
        profile: &EngineProfile,
    ) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(profile.list_tables_query)
            .fetch_all(&mut *conn)
            .await?;

        // Name comes first (`Tables_in_<database>`), then `Table_type`.
        rows.iter()
            .map(|row| {
                text_or_bytes(row, 0usize).ok_or_else(|| {
                    GatewayError::query_failed("Table name could not be decoded", None)
                })
            })
            .collect()
    }

    pub async fn describe(
        conn: &mut MySqlConnection,
        sql: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDescriptor>> {
        let rows = match sqlx::query(sql).fetch_all(&mut *conn).await {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(MYSQL_NO_SUCH_TABLE) => {
                return Err(GatewayError::table_not_found(table));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(rows.iter().map(normalize).collect())
    }

    /// `DESCRIBE` yields Field, Type, Null, Key, Default, Extra.
    fn normalize(row: &MySqlRow) -> ColumnDescriptor {
        let name = text_or_bytes(row, "Field").unwrap_or_default();
        let data_type = text_or_bytes(row, "Type").unwrap_or_default();
        let nullable = parse_nullable(text_or_bytes(row, "Null").as_deref());
        let key = text_or_bytes(row, "Key").and_then(|k| KeyRole::parse(&k));

        ColumnDescriptor::new(name, data_type, nullable)
            .with_key(key)
            .with_default(text_or_bytes(row, "Default"))
            .with_extra(text_or_bytes(row, "Extra"))
    }
}

mod postgres {
    use super::*;
    use crate::models::KeyRole;
    use sqlx::postgres::PgRow;
    use sqlx::{PgConnection, Row};

    pub async fn list_tables(
        conn: &mut PgConnection,
        profile: &EngineProfile,
    ) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(profile.list_tables_query)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    /// An unknown table yields zero rows rather than an error.
    pub async fn describe(
        conn: &mut PgConnection,
        sql: &str,
    ) -> GatewayResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(normalize).collect())
    }

    fn normalize(row: &PgRow) -> ColumnDescriptor {
        let name: String = row.try_get("column_name").unwrap_or_default();
        let data_type: String = row.try_get("data_type").unwrap_or_default();
        let nullable =
            parse_nullable(row.try_get::<Option<String>, _>("is_nullable").ok().flatten().as_deref());
        let key = row
            .try_get::<Option<String>, _>("column_key")
            .ok()
            .flatten()
            .and_then(|k| KeyRole::parse(&k));

        ColumnDescriptor::new(name, data_type, nullable)
            .with_key(key)
            .with_default(row.try_get::<Option<String>, _>("column_default").ok().flatten())
            .with_extra(row.try_get::<Option<String>, _>("extra").ok().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nullable() {
        assert!(parse_nullable(Some("YES")));
        assert!(parse_nullable(Some("yes")));
        assert!(!parse_nullable(Some("NO")));
        assert!(!parse_nullable(None));
    }

    #[test]
    fn test_contains_table_is_exact() {
        let tables = vec!["users".to_string(), "orders".to_string()];
        assert!(contains_table(&tables, "users"));
        assert!(!contains_table(&tables, "Users"));
        assert!(!contains_table(&tables, "user"));
    }
}
