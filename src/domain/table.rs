//! Analytical table targets and the fixed load schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type in the analytical store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Free-form text
    String,
}

impl FieldType {
    /// SQL type used by relational table stores
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::String => "TEXT",
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl SchemaField {
    const fn string(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::String,
        }
    }
}

/// Block metadata columns applied to every created or loaded table, in order
pub const FIXED_SCHEMA: [SchemaField; 13] = [
    SchemaField::string("hash"),
    SchemaField::string("size"),
    SchemaField::string("stripped_size"),
    SchemaField::string("weight"),
    SchemaField::string("number"),
    SchemaField::string("version"),
    SchemaField::string("merkle_root"),
    SchemaField::string("timestamp"),
    SchemaField::string("timestamp_month"),
    SchemaField::string("nonce"),
    SchemaField::string("bits"),
    SchemaField::string("coinbase_param"),
    SchemaField::string("transaction_count"),
];

/// Fully qualified analytical table: `{dataset}.{table_id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableTarget {
    pub dataset: String,
    pub table_id: String,
}

impl TableTarget {
    /// Base table without a suffix, used by streaming inserts
    pub fn base(dataset: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table_id: prefix.into(),
        }
    }

    /// Freshly named table for one ingestion run: `{prefix}_{YYYYMMDDHHMMSS}`
    ///
    /// Every run gets its own table, so re-processing the same file after a fix
    /// never collides with an earlier table.
    pub fn timestamped(
        dataset: impl Into<String>,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            table_id: format!("{prefix}_{}", table_suffix(now)),
        }
    }
}

impl fmt::Display for TableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table_id)
    }
}

/// Second-precision UTC suffix for table names
pub fn table_suffix(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}
