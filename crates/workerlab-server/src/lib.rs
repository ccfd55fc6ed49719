//! workerlab-server: HTTP boundary for running and grading submissions.
//!
//! Routes:
//! - `POST /run` (also `/api/run`): one invocation, returns the raw outcome
//! - `POST /grade`: run every test case and return the verdicts
//! - `GET /health`: liveness plus the active substrate name

pub mod api;
pub mod state;

use std::future::Future;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use api::create_router;
pub use state::AppState;

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    serve_with_shutdown(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let substrate = state.coordinator.substrate_name().to_string();
    let app = create_router(state).layer(TraceLayer::new_for_http());

    tracing::info!(%substrate, "listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}
