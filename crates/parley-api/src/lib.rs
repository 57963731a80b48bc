pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Maximum upload size per file (256 MB).
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // peer protocol surface
        .route("/connect", post(handlers::handle_connect))
        .route("/ping", post(handlers::handle_ping))
        .route("/status", get(handlers::handle_status))
        .route("/history/{peer_id}", get(handlers::handle_history))
        .route("/receive-message", post(handlers::handle_receive_message))
        .route("/receive-file", post(handlers::handle_receive_file))
        .route("/download/{file_id}", get(handlers::handle_download))
        .route("/user-info-update", post(handlers::handle_user_info_update))
        // local control surface
        .route("/user", get(handlers::handle_get_user))
        .route("/user", post(handlers::handle_update_user))
        .route("/recent-peers", get(handlers::handle_recent_peers))
        .route("/peers/cleanup", delete(handlers::handle_peers_cleanup))
        .route("/peers", get(handlers::handle_peers))
        .route("/peers/connect", post(handlers::handle_peer_connect))
        .route("/peers/sweep", post(handlers::handle_peers_sweep))
        .route("/peers/reset", post(handlers::handle_peers_reset))
        .route("/scan", post(handlers::handle_scan))
        .route("/messages/send", post(handlers::handle_send_message))
        .route("/files/send", post(handlers::handle_send_file))
        .route(
            "/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/sync-profile", post(handlers::handle_sync_profile))
        .with_state(state)
        .layer(cors)
}

/// A running directory service. Dropping the handle leaves the server
/// running; call [`DirectoryHandle::stop`] to shut it down.
pub struct DirectoryHandle {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DirectoryHandle {
    /// The port actually bound, which differs from the requested one
    /// when 0 asked the OS to pick.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Bind `0.0.0.0:<port>` and serve in a background task.
pub async fn spawn(state: ApiState, port: u16) -> anyhow::Result<DirectoryHandle> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let bound = listener.local_addr()?.port();
    let node = state.node.clone();
    node.set_running(true);
    tracing::info!(port = bound, "directory service listening on 0.0.0.0");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(state);
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = serve.await {
            tracing::error!(error = %err, "directory service exited");
        }
        node.set_running(false);
    });

    Ok(DirectoryHandle {
        port: bound,
        shutdown: Some(shutdown_tx),
        task,
    })
}

/// Bind and serve until the process exits. The daemon's entry point.
pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    state.node.set_running(true);
    tracing::info!(port, "directory service listening on 0.0.0.0");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
