//! OS signal handling.

/// Resolve once the process receives Ctrl-C.
///
/// If the handler cannot be installed the error is logged and this never
/// resolves; the process then only stops when its server does.
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
