//! Ingestion record model
//!
//! One record per file identifier, persisted in the document store as
//! `{success, when, error_message?, duplication_attempts?}`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Field names as they appear in the persisted document
pub mod fields {
    pub const SUCCESS: &str = "success";
    pub const WHEN: &str = "when";
    pub const ERROR_MESSAGE: &str = "error_message";
    pub const DUPLICATION_ATTEMPTS: &str = "duplication_attempts";
}

/// Ingestion outcome for a single file
///
/// A record without a `success` field is treated exactly like an absent record:
/// the file has not been ingested yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestionRecord {
    /// Outcome of the most recent ingestion attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// When the outcome was recorded
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "ledger_time::option"
    )]
    pub when: Option<DateTime<Utc>>,

    /// Cause and context of a failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Re-trigger timestamps for an already ingested file, newest first
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "ledger_time::vec"
    )]
    pub duplication_attempts: Vec<DateTime<Utc>>,
}

impl IngestionRecord {
    /// Record for a successful ingestion
    pub fn succeeded(when: DateTime<Utc>) -> Self {
        Self {
            success: Some(true),
            when: Some(when.trunc_subsecs(0)),
            ..Default::default()
        }
    }

    /// Record for a failed ingestion
    pub fn failed(message: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            success: Some(false),
            when: Some(when.trunc_subsecs(0)),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether this record marks the file as successfully ingested
    pub fn is_ingested(&self) -> bool {
        self.success == Some(true)
    }

    /// Whether the last attempt failed
    pub fn is_failed(&self) -> bool {
        self.success == Some(false)
    }
}

/// Ledger timestamp format: UTC, second precision
///
/// Serialized as `2024-01-31 17:04:05 UTC`.
pub mod ledger_time {
    use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const SUFFIX: &str = " UTC";

    /// Formats a timestamp the way it is stored in the ledger
    pub fn format(when: &DateTime<Utc>) -> String {
        format!("{}{SUFFIX}", when.trunc_subsecs(0).format(FORMAT))
    }

    /// Parses a stored ledger timestamp
    pub fn parse(value: &str) -> Result<DateTime<Utc>, String> {
        let naive = value
            .strip_suffix(SUFFIX)
            .ok_or_else(|| format!("timestamp '{value}' is not in UTC"))?;
        NaiveDateTime::parse_from_str(naive, FORMAT)
            .map(|dt| dt.and_utc())
            .map_err(|e| format!("invalid timestamp '{value}': {e}"))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(when) => serializer.serialize_str(&super::format(when)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

    pub mod vec {
        use super::*;
        use serde::ser::SerializeSeq;

        pub fn serialize<S>(values: &[DateTime<Utc>], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for when in values {
                seq.serialize_element(&super::format(when))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Vec<String>>::deserialize(deserializer)?
                .unwrap_or_default()
                .iter()
                .map(|s| super::parse(s).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}
