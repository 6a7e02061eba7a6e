use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::connectivity::ConnectivityState;
use crate::delivery::DeliveryProcessor;
use crate::export::ExportSubmitter;
use crate::queue::QueueManager;
use crate::transport::Transport;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub queue: Arc<QueueManager>,
    pub processor: Arc<DeliveryProcessor>,
    pub connectivity: Arc<ConnectivityState>,
    pub submitter: Arc<ExportSubmitter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        queue: Arc<QueueManager>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<ConnectivityState>,
    ) -> Self {
        let processor = Arc::new(DeliveryProcessor::new(
            queue.clone(),
            transport.clone(),
            connectivity.clone(),
        ));
        let submitter = Arc::new(ExportSubmitter::new(
            queue.clone(),
            transport,
            connectivity.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            queue,
            processor,
            connectivity,
            submitter,
            start_time: Instant::now(),
        }
    }
}
