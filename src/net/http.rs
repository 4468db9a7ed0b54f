// HTTP state endpoint
// Serves the monitor's current snapshot and history position, plus optional static files

use std::path::PathBuf;
use std::sync::Arc;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::dashboard::StateSnapshot;

use super::monitor::{HistoryStatus, Published};

type Shared = watch::Receiver<Published>;

async fn get_state(State(rx): State<Shared>) -> Json<Arc<StateSnapshot>> {
    Json(Arc::clone(&rx.borrow().snapshot))
}

async fn get_history_len(State(rx): State<Shared>) -> Json<HistoryStatus> {
    Json(rx.borrow().status)
}

pub fn router(state: Shared, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/state", get(get_state))
        .route("/history/len", get(get_history_len));
    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.with_state(state)
}

/// Serve `app` on `listener` until the process exits.
pub async fn serve(listener: TcpListener, app: Router) {
    match listener.local_addr() {
        Ok(addr) => info!("HTTP server on {}", addr),
        Err(e) => error!("HTTP listener has no address: {}", e),
    }
    if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {}", e);
    }
}
