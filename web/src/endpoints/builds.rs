/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_stream::stream;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use axum_streams::StreamBodyAs;
use chrono::{DateTime, Utc};
use entity::build::BuildStatus;
use serde::{Deserialize, Serialize};
use shipyard_core::types::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::WebResult;

const LOG_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize, Deserialize, Debug)]
pub struct CollectResponse {
    pub build_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: BuildStatus,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EventResponse {
    pub build_id: Uuid,
    pub status: BuildStatus,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

impl From<MBuildEvent> for EventResponse {
    fn from(event: MBuildEvent) -> Self {
        Self {
            build_id: event.build,
            status: event.status,
            timestamp: event.created_at.and_utc(),
            detail: event.detail,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CancelResponse {
    pub cancelled: bool,
}

pub async fn post_collect(
    State(app): State<AppState>,
    body: Result<Json<BuildRequest>, JsonRejection>,
) -> WebResult<Json<CollectResponse>> {
    let Json(request) = body?;
    let build_id = app.orchestrator.submit(request).await?;

    Ok(Json(CollectResponse { build_id }))
}

pub async fn get_build_status(
    State(app): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> WebResult<Json<StatusResponse>> {
    let Path(build_id) = path?;
    let build = app.state.ledger.get(build_id).await?;

    Ok(Json(StatusResponse {
        status: build.status,
    }))
}

pub async fn get_build_events(
    State(app): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> WebResult<Json<Vec<EventResponse>>> {
    let Path(build_id) = path?;
    let events = app.state.ledger.list_events(build_id).await?;

    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

pub async fn get_build_details(
    State(app): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> WebResult<Json<BaseResponse<MBuild>>> {
    let Path(build_id) = path?;
    let build = app.state.ledger.get(build_id).await?;

    let res = BaseResponse {
        error: false,
        message: build,
    };

    Ok(Json(res))
}

pub async fn post_build_cancel(
    State(app): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> WebResult<Json<CancelResponse>> {
    let Path(build_id) = path?;
    let cancelled = app.orchestrator.cancel(build_id).await?;

    Ok(Json(CancelResponse { cancelled }))
}

/// Streams the build log as newline-delimited JSON strings. The first item is
/// everything logged so far, followed by whatever gets appended until the build
/// reaches a terminal state.
pub async fn get_build_log(
    State(app): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> WebResult<StreamBodyAs<'static>> {
    let Path(build_id) = path?;
    let build = app.state.ledger.get(build_id).await?;
    let ledger = Arc::clone(&app.state.ledger);

    let stream = stream! {
        let mut sent = build.log.len();
        let mut finished = build.status.is_terminal();
        yield build.log;

        while !finished {
            tokio::time::sleep(LOG_POLL_INTERVAL).await;

            let build = match ledger.get(build_id).await {
                Ok(build) => build,
                Err(e) => {
                    warn!(error = %e, build_id = %build_id, "Stopping log stream");
                    break;
                }
            };

            finished = build.status.is_terminal();

            if let Some(new) = build.log.get(sent..).filter(|new| !new.is_empty()) {
                sent = build.log.len();
                yield new.to_string();
            }
        }

        debug!(build_id = %build_id, "Log stream finished");
    };

    Ok(StreamBodyAs::json_nl(stream))
}
