//! Schema-related data models.
//!
//! Both engines report column structure with different column names and
//! value spellings; these types are the normalized shape.

use serde::{Deserialize, Serialize};

/// Role a column plays in keys/indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    Primary,
    Unique,
    /// Non-unique index (MySQL `MUL`)
    Multiple,
}

impl KeyRole {
    /// Parse from engine-specific spelling. Empty or unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRI" | "PRIMARY" | "PRIMARY KEY" => Some(Self::Primary),
            "UNI" | "UNIQUE" => Some(Self::Unique),
            "MUL" | "INDEX" => Some(Self::Multiple),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub key: Option<KeyRole>,
    pub default: Option<String>,
    /// e.g. "auto_increment"
    pub extra: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            key: None,
            default: None,
            extra: None,
        }
    }

    pub fn with_key(mut self, key: Option<KeyRole>) -> Self {
        self.key = key;
        self
    }

    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }

    /// Set the extra attribute; empty strings are dropped.
    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|e| !e.trim().is_empty());
        self
    }

    /// Check if this column is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.key == Some(KeyRole::Primary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
