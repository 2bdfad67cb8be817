//! Schema-related data models.

use serde::{Deserialize, Serialize};

/// One column of a described table, in ordinal position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column: String,
    /// Full type (e.g., `varchar(30)`, `bigint unsigned`)
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    /// Key marker: `PRI`, `UNI`, `MUL` or empty.
    pub key: String,
    /// Raw default expression as reported by the catalog.
    pub default: Option<String>,
    /// MySQL only (e.g., `auto_increment`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl ColumnInfo {
    pub fn new(column: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            column: column.into(),
            data_type: data_type.into(),
            nullable,
            key: String::new(),
            default: None,
            extra: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }

    /// Empty strings are treated as absent.
    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|e| !e.is_empty());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.key == "PRI"
    }
}
