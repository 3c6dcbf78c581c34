//! Engine catalog.
//!
//! Static, read-only reference data: one profile per supported engine with
//! its default port and introspection statements.

use crate::error::{GatewayError, GatewayResult};
use crate::models::EngineKind;

/// Placeholder substituted with a validated table name.
pub const TABLE_PLACEHOLDER: &str = "{table_name}";

/// Longest identifier accepted by either engine (MySQL: 64, PostgreSQL: 63).
pub const MAX_TABLE_NAME_LEN: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub struct EngineProfile {
    pub engine: EngineKind,
    pub name: &'static str,
    pub default_port: u16,
    pub list_tables_query: &'static str,
    /// Contains [`TABLE_PLACEHOLDER`] exactly once.
    pub describe_template: &'static str,
}

mod queries {
    pub mod mysql {
        /// Views are excluded; the name is column 0.
        pub const LIST_TABLES: &str = "SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'";

        pub const DESCRIBE: &str = "DESCRIBE `{table_name}`";
    }

    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            "#;

        pub const DESCRIBE: &str = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.is_nullable::text AS is_nullable,
                (
                    SELECT
                        CASE MAX(CASE tc.constraint_type WHEN 'PRIMARY KEY' THEN 2 ELSE 1 END)
                            WHEN 2 THEN 'PRI'
                            WHEN 1 THEN 'UNI'
                        END
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                    WHERE tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
                    AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
                ) AS column_key,
                c.column_default::text AS column_default,
                CASE WHEN c.is_identity = 'YES' THEN 'identity' ELSE '' END AS extra
            FROM information_schema.columns c
            WHERE c.table_schema = 'public' AND c.table_name = '{table_name}'
            ORDER BY c.ordinal_position
            "#;
    }
}

static PROFILES: [EngineProfile; 2] = [
    EngineProfile {
        engine: EngineKind::MySQL,
        name: "MySQL",
        default_port: 3306,
        list_tables_query: queries::mysql::LIST_TABLES,
        describe_template: queries::mysql::DESCRIBE,
    },
    EngineProfile {
        engine: EngineKind::PostgreSQL,
        name: "PostgreSQL",
        default_port: 5432,
        list_tables_query: queries::postgres::LIST_TABLES,
        describe_template: queries::postgres::DESCRIBE,
    },
];

/// Look up an engine profile by name or DSN scheme, case-insensitively.
pub fn lookup(name: &str) -> GatewayResult<&'static EngineProfile> {
    EngineKind::from_name(name)
        .map(profile)
        .ok_or_else(|| GatewayError::engine_not_found(name.trim()))
}

/// Profile for a known engine.
pub fn profile(engine: EngineKind) -> &'static EngineProfile {
    match engine {
        EngineKind::MySQL => &PROFILES[0],
        EngineKind::PostgreSQL => &PROFILES[1],
    }
}

/// All supported engine profiles.
pub fn all() -> &'static [EngineProfile] {
    &PROFILES
}

/// Check a caller-supplied table name before it is spliced into SQL text.
///
/// Identifiers cannot be bound as parameters, so only `[A-Za-z0-9_]` is
/// accepted, up to [`MAX_TABLE_NAME_LEN`] characters.
pub fn validate_table_name(table: &str) -> GatewayResult<()> {
    let valid = !table.is_empty()
        && table.len() <= MAX_TABLE_NAME_LEN
        && !table.contains(TABLE_PLACEHOLDER)
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(GatewayError::invalid_table_name(table))
    }
}

impl EngineProfile {
    /// Render the describe statement for a table.
    pub fn describe_query(&self, table: &str) -> GatewayResult<String> {
        validate_table_name(table)?;
        Ok(self.describe_template.replace(TABLE_PLACEHOLDER, table))
    }

    /// Quote an already validated identifier for this engine.
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self.engine {
            EngineKind::MySQL => format!("`{ident}`"),
            EngineKind::PostgreSQL => format!("\"{ident}\""),
        }
    }
}
