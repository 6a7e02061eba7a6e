//! Per-kind delivery of a queued item.

use thiserror::Error;

use crate::queue::{QueueItem, QueueKind, WebhookExport};
use crate::transport::{Transport, TransportError};

/// Why a single delivery attempt failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Malformed {kind} payload: {source}")]
    InvalidPayload {
        kind: QueueKind,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Attempt one delivery of `item`. New kinds only add a match arm here.
pub async fn deliver(transport: &dyn Transport, item: &QueueItem) -> Result<(), DeliveryError> {
    match item.kind {
        QueueKind::SalesforceExport => {
            let export: WebhookExport =
                serde_json::from_value(item.data.clone()).map_err(|source| {
                    DeliveryError::InvalidPayload {
                        kind: item.kind,
                        source,
                    }
                })?;
            transport
                .post_json(&export.webhook_url, &export.payload)
                .await?;
            Ok(())
        }
    }
}
