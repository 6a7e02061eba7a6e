use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use offline_export_queue::config::{ConnectivityMode, Settings};
use offline_export_queue::connectivity::{ConnectivityState, HttpProbe, ProbeMonitor};
use offline_export_queue::delivery::DrainTrigger;
use offline_export_queue::queue::{PersistTask, QueueManager};
use offline_export_queue::server::{create_app, AppState};
use offline_export_queue::shutdown::GracefulShutdown;
use offline_export_queue::store::{self, FileStore, KeyValueStore, ScopedStore};
use offline_export_queue::telemetry::init_tracing;
use offline_export_queue::transport::HttpTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_tracing(&settings.logging);
    tracing::info!("Configuration loaded");

    // Open the store and resolve the device-scoped view of it
    let file_store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(settings.store.dir.clone())?);
    let device_id = match &settings.store.device_id {
        Some(id) => id.clone(),
        None => store::device_id(file_store.as_ref()),
    };
    tracing::info!(device_id = %device_id, dir = %settings.store.dir.display(), "Store opened");
    let scoped: Arc<dyn KeyValueStore> = Arc::new(ScopedStore::new(file_store, device_id));

    let queue = Arc::new(QueueManager::load(scoped, &settings.queue));
    let transport = Arc::new(HttpTransport::new(settings.delivery.request_timeout())?);
    let connectivity = Arc::new(ConnectivityState::new(
        settings.connectivity.initially_online,
    ));

    // Create application state
    let state = AppState::new(
        settings.clone(),
        queue.clone(),
        transport,
        connectivity.clone(),
    );
    let processor = state.processor.clone();
    tracing::info!(queued = queue.len(), "Application state initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background tasks
    let persist_task = PersistTask::new(queue.clone(), shutdown_tx.subscribe());
    let persist_handle = tokio::spawn(persist_task.run());

    let trigger = DrainTrigger::new(
        processor.clone(),
        connectivity.clone(),
        settings.delivery.stabilization_delay(),
        shutdown_tx.subscribe(),
    );
    let trigger_handle = tokio::spawn(trigger.run());

    let probe_handle = match settings.connectivity.mode {
        ConnectivityMode::Probe => {
            let probe = Arc::new(HttpProbe::new(
                settings.connectivity.probe_url.clone(),
                settings.connectivity.probe_timeout(),
            )?);
            let monitor = ProbeMonitor::new(
                probe,
                connectivity.clone(),
                settings.connectivity.probe_interval(),
                shutdown_tx.subscribe(),
            );
            Some(tokio::spawn(monitor.run()))
        }
        ConnectivityMode::Manual => {
            tracing::info!("Manual connectivity mode, probe disabled");
            None
        }
    };

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    let result = GracefulShutdown::new(queue, processor, shutdown_tx)
        .execute("server stopped")
        .await;
    if !result.success {
        tracing::warn!(
            items_remaining = result.items_remaining,
            "Final queue flush failed"
        );
    }

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = tokio::join!(persist_handle, trigger_handle);
    if let Some(handle) = probe_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
