#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// One committed row mutation. Rows are journaled as they were stored so a
/// replay never re-runs policy checks or id generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    Upsert {
        table: String,
        key: String,
        row: serde_json::Value,
    },
    Delete {
        table: String,
        key: String,
    },
}

impl JournalEntry {
    pub fn table(&self) -> &str {
        match self {
            JournalEntry::Upsert { table, .. } | JournalEntry::Delete { table, .. } => table,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            JournalEntry::Upsert { key, .. } | JournalEntry::Delete { key, .. } => key,
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
