/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod endpoints;
pub mod error;

use axum::Router;
use axum::routing::{get, post};
use builder::Orchestrator;
use endpoints::builds;
use shipyard_core::types::ServerState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct AppState {
    pub state: Arc<ServerState>,
    pub orchestrator: Orchestrator,
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/api/v1/collect", post(builds::post_collect))
        .route("/api/v1/build/{build}", get(builds::get_build_status))
        .route(
            "/api/v1/build/{build}/details",
            get(builds::get_build_details),
        )
        .route("/api/v1/build/{build}/log", get(builds::get_build_log))
        .route(
            "/api/v1/build/{build}/cancel",
            post(builds::post_build_cancel),
        )
        .route(
            "/api/v1/build-events/{build}",
            get(builds::get_build_events),
        )
        .route("/api/health", get(endpoints::get_health))
        .fallback(endpoints::handle_404)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
}

pub async fn serve_web(
    state: Arc<ServerState>,
    orchestrator: Orchestrator,
) -> std::io::Result<()> {
    let server_url = state.cli.server_url();
    let app = router(AppState {
        state,
        orchestrator: orchestrator.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&server_url).await?;
    info!(address = %server_url, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown().await;
    Ok(())
}
