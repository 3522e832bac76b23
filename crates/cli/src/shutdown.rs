//! Waits for `Ctrl+C` or `SIGTERM`, the way `examples/krukah-robopoker`'s
//! `lib.rs` and `examples/zircote-rlm`'s `mcp/transport.rs` drain a
//! listener loop: a single future that resolves once, handed to
//! `axum::serve(...).with_graceful_shutdown(...)`.

use tokio::signal;

pub async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("received ctrl-c, shutting down"),
        _ = terminate => log::info!("received SIGTERM, shutting down"),
    }
}
