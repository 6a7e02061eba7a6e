//! Queue data models and wire format

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed attempts after which an item is evicted
pub const MAX_RETRIES: u32 = 3;

/// Store key holding the serialized queue
pub const DEFAULT_STORAGE_KEY: &str = "af_ablation_offline_queue";

/// What a queued item delivers. The processor dispatches on this tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    /// Procedure record posted to a Power Automate / Salesforce webhook
    #[serde(rename = "salesforce_export")]
    SalesforceExport,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::SalesforceExport => "salesforce_export",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salesforce_export" => Ok(QueueKind::SalesforceExport),
            other => Err(format!("unknown queue item kind '{}'", other)),
        }
    }
}

/// Payload of a `salesforce_export` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookExport {
    /// Endpoint the payload is POSTed to
    pub webhook_url: String,
    /// JSON body sent as-is
    pub payload: serde_json::Value,
}

/// One pending delivery with its retry bookkeeping.
///
/// Serialized as `{id, kind, data, timestamp, retryCount}`; `type` is
/// accepted in place of `kind` when reading older blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: QueueKind,
    pub data: serde_json::Value,
    /// Creation time, millisecond precision
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,
}

impl QueueItem {
    pub fn new(kind: QueueKind, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            data,
            // Truncated so the in-memory value survives the millisecond wire format
            enqueued_at: Utc::now().trunc_subsecs(3),
            retry_count: 0,
        }
    }

    /// Whether the item has used up its delivery attempts
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

/// Serialize a queue into the blob written to the store
pub fn encode_queue(items: &[QueueItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(items)
}

/// Parse a blob read from the store
pub fn decode_queue(blob: &str) -> Result<Vec<QueueItem>, serde_json::Error> {
    serde_json::from_str(blob)
}

/// Statistics about the queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total_items: usize,
    /// Items that have failed at least once
    pub retrying_items: usize,
    pub oldest_enqueued_at: Option<DateTime<Utc>>,
    pub max_retries: u32,
}
