pub mod airtable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use airtable::{AirtableConfig, AirtableStore, TableIds};

/// Column values keyed by column name, as sent to and read from the store.
pub type Fields = serde_json::Map<String, Value>;

/// The three tables the intent pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Leads,
    Activities,
    Tasks,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Activities => "activities",
            Self::Tasks => "tasks",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
}

impl Record {
    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(Value::as_str)
    }
}

/// Store-agnostic record filter. Backends render it into their own query
/// language.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Case-insensitive substring match.
    ContainsIgnoreCase { column: String, needle: String },
    /// Case-sensitive substring match.
    Contains { column: String, needle: String },
    Any(Vec<Filter>),
}

impl Filter {
    pub fn contains_ignore_case(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase {
            column: column.into(),
            needle: needle.into(),
        }
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            column: column.into(),
            needle: needle.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub max_records: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store is not configured for the {0} table")]
    Unconfigured(Table),
    #[error("store rejected the request with status {status}")]
    Rejected { status: u16, body: String },
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// The system of record: create/read/update over a handful of tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether connection settings for `table` are present. Callers check
    /// this before attempting any request.
    fn is_configured(&self, table: Table) -> bool;

    async fn find(&self, table: Table, query: &FindQuery) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, table: Table, record_id: &str) -> Result<Record, StoreError>;

    async fn create(&self, table: Table, fields: Fields) -> Result<Record, StoreError>;

    async fn update(
        &self,
        table: Table,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError>;

    /// Browse link for a record, when the backend has one.
    fn record_url(&self, table: Table, record_id: &str) -> Option<String>;
}
