//! Table reads on a transient connection.
//!
//! The only statement shape issued against a target database besides
//! introspection is `SELECT * FROM <table>` with an optional `LIMIT`. The
//! table name is validated and quoted per engine; the limit is always bound.

use crate::db::connection::TargetConnection;
use crate::db::engines::{self, validate_table_name};
use crate::db::types::RowToJson;
use crate::error::GatewayResult;
use crate::models::EngineKind;
use serde_json::{Map, Value as JsonValue};
use std::time::Instant;
use tracing::debug;

pub type JsonRow = Map<String, JsonValue>;

/// Build the `SELECT *` statement for an already validated table.
fn select_statement(engine: EngineKind, table: &str, limited: bool) -> String {
    let profile = engines::profile(engine);
    let quoted = profile.quote_identifier(table);
    match (limited, engine) {
        (false, _) => format!("SELECT * FROM {quoted}"),
        (true, EngineKind::MySQL) => format!("SELECT * FROM {quoted} LIMIT ?"),
        (true, EngineKind::PostgreSQL) => format!("SELECT * FROM {quoted} LIMIT $1"),
    }
}

/// Read rows from `table`, at most `limit` when given.
pub async fn read_table(
    conn: &mut TargetConnection,
    table: &str,
    limit: Option<u32>,
) -> GatewayResult<Vec<JsonRow>> {
    validate_table_name(table)?;

    let start = Instant::now();
    let sql = select_statement(conn.engine(), table, limit.is_some());
    debug!(sql = %sql, limit = ?limit, "Reading table");

    let rows = match conn {
        TargetConnection::MySql(c) => mysql::fetch_rows(c, &sql, limit).await?,
        TargetConnection::Postgres(c) => postgres::fetch_rows(c, &sql, limit).await?,
    };

    debug!(
        table = table,
        rows = rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Table read complete"
    );
    Ok(rows)
}

/// Fetch a single sample row, or `None` when the table is empty.
pub async fn sample_row(
    conn: &mut TargetConnection,
    table: &str,
) -> GatewayResult<Option<JsonRow>> {
    Ok(read_table(conn, table, Some(1)).await?.into_iter().next())
}

fn to_json_rows<R: RowToJson>(rows: &[R]) -> Vec<JsonRow> {
    rows.iter().map(RowToJson::to_json_map).collect()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::MySqlConnection;

    pub async fn fetch_rows(
        conn: &mut MySqlConnection,
        sql: &str,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<JsonRow>> {
        let mut query = sqlx::query(sql);
        if let Some(limit) = limit {
            query = query.bind(i64::from(limit));
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(to_json_rows(&rows))
    }
}

mod postgres {
    use super::*;
    use sqlx::PgConnection;

    pub async fn fetch_rows(
        conn: &mut PgConnection,
        sql: &str,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<JsonRow>> {
        let mut query = sqlx::query(sql);
        if let Some(limit) = limit {
            query = query.bind(i64::from(limit));
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(to_json_rows(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_statement_mysql() {
        assert_eq!(
            select_statement(EngineKind::MySQL, "users", false),
            "SELECT * FROM `users`"
        );
        assert_eq!(
            select_statement(EngineKind::MySQL, "users", true),
            "SELECT * FROM `users` LIMIT ?"
        );
    }

    #[test]
    fn test_select_statement_postgres() {
        assert_eq!(
            select_statement(EngineKind::PostgreSQL, "users", true),
            "SELECT * FROM \"users\" LIMIT $1"
        );
    }
}
