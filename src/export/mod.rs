//! Procedure export submission.
//!
//! A record is POSTed straight to the webhook while online. While offline it
//! is queued as a `salesforce_export` item and delivered by the drain once
//! connectivity returns.

mod record;

pub use record::{
    Catheters, Equipment, ProcedureRecord, SalesforceEquipment, SalesforcePayload,
    SalesforceTimeEvents, TimeEvents,
};

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::connectivity::ConnectivitySignal;
use crate::queue::{QueueKind, QueueManager, WebhookExport};
use crate::transport::{Transport, TransportError};

pub const SENT_MESSAGE: &str = "Data successfully sent to Salesforce!";
pub const QUEUED_MESSAGE: &str =
    "You're offline. Data queued for export when connection is restored.";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Please enter a Power Automate webhook URL first.")]
    MissingWebhookUrl,

    #[error(transparent)]
    Delivery(#[from] TransportError),

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Sent,
    Queued { item_id: String },
}

impl SubmitOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubmitOutcome::Sent => SENT_MESSAGE,
            SubmitOutcome::Queued { .. } => QUEUED_MESSAGE,
        }
    }
}

pub struct ExportSubmitter {
    queue: Arc<QueueManager>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn ConnectivitySignal>,
}

impl ExportSubmitter {
    pub fn new(
        queue: Arc<QueueManager>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Self {
        Self {
            queue,
            transport,
            connectivity,
        }
    }

    /// Send `record` to `webhook_url`, or queue it when offline.
    ///
    /// An online failure is returned to the caller and not queued.
    #[tracing::instrument(name = "export.submit", skip(self, webhook_url, record))]
    pub async fn submit(
        &self,
        webhook_url: &str,
        record: &ProcedureRecord,
    ) -> Result<SubmitOutcome, ExportError> {
        let webhook_url = webhook_url.trim();
        if webhook_url.is_empty() {
            return Err(ExportError::MissingWebhookUrl);
        }

        let payload = serde_json::to_value(record.to_salesforce_payload())?;

        if !self.connectivity.is_online() {
            let export = WebhookExport {
                webhook_url: webhook_url.to_string(),
                payload,
            };
            let data = serde_json::to_value(export)?;
            let item_id = self.queue.enqueue(QueueKind::SalesforceExport, data);
            tracing::info!(item_id = %item_id, "Offline, export queued");
            return Ok(SubmitOutcome::Queued { item_id });
        }

        self.transport.post_json(webhook_url, &payload).await?;
        tracing::info!("Export sent");
        Ok(SubmitOutcome::Sent)
    }
}
