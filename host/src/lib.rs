//! ==============================================================================
//! thermo-host - temperature/humidity node and monitor
//! ==============================================================================
//!
//! two processes, one crate:
//!
//!     node:     sensor ──> http responder (GET /, GET /data)
//!     monitor:  poller ──> history (json log) ──> trend renderer
//!
//!     sensor ──pull per request──> node ──pull per tick──> monitor
//!
//! ==============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod gpio;
pub mod history;
pub mod monitor;
pub mod poller;
pub mod render;
pub mod sensor;
pub mod server;

/// resolves on ctrl-c; never resolves if the signal cannot be installed
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("[SHUTDOWN] ctrl-c received"),
        Err(e) => {
            tracing::warn!("[SHUTDOWN] cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
