/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use builder::error::StageError;
use builder::stages::{
    ContainerLauncher, ImageBuildRequest, ImageBuilder, RegistryPublisher, SourceMaterializer,
    Stages,
};
use builder::{Orchestrator, PipelineConfig};
use clap::Parser;
use entity::build::BuildStatus;
use http_body_util::BodyExt;
use sea_orm::DbErr;
use shipyard_core::ledger::{Ledger, LedgerError, MemoryLedger, NewBuild};
use shipyard_core::types::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use web::AppState;

#[derive(Default)]
pub struct StubStages {
    pub build_delay: Option<Duration>,
}

#[async_trait]
impl SourceMaterializer for StubStages {
    async fn materialize(
        &self,
        build_id: Uuid,
        _source_location: &str,
    ) -> Result<PathBuf, StageError> {
        Ok(PathBuf::from(format!("/work/{}", build_id)))
    }

    async fn release(&self, _build_id: Uuid) {}
}

#[async_trait]
impl ImageBuilder for StubStages {
    async fn build(
        &self,
        request: &ImageBuildRequest,
        log: &mut String,
    ) -> Result<String, StageError> {
        log.push_str("compiling\n");

        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(request.tag.clone())
    }

    async fn remove(&self, _image_ref: &str) {}
}

#[async_trait]
impl RegistryPublisher for StubStages {
    async fn publish(&self, image_ref: &str) -> Result<String, StageError> {
        Ok(image_ref.to_string())
    }
}

#[async_trait]
impl ContainerLauncher for StubStages {
    async fn launch(&self, _published_ref: &str, _build_id: Uuid) -> Result<String, StageError> {
        Ok("127.0.0.1:49153".to_string())
    }

    async fn remove(&self, _build_id: Uuid) {}
}

/// A ledger whose database is unreachable.
pub struct FailingLedger;

fn unreachable_database() -> LedgerError {
    LedgerError::Database(DbErr::Custom("connection refused".to_string()))
}

#[async_trait]
impl Ledger for FailingLedger {
    async fn create(&self, _build: NewBuild) -> Result<MBuild, LedgerError> {
        Err(unreachable_database())
    }

    async fn update_state(
        &self,
        _id: Uuid,
        _status: BuildStatus,
        _detail: Option<String>,
    ) -> Result<MBuild, LedgerError> {
        Err(unreachable_database())
    }

    async fn append_log(&self, _id: Uuid, _text: &str) -> Result<(), LedgerError> {
        Err(unreachable_database())
    }

    async fn record_image(&self, _id: Uuid, _image_ref: &str) -> Result<(), LedgerError> {
        Err(unreachable_database())
    }

    async fn record_published(&self, _id: Uuid, _published_ref: &str) -> Result<(), LedgerError> {
        Err(unreachable_database())
    }

    async fn get(&self, _id: Uuid) -> Result<MBuild, LedgerError> {
        Err(unreachable_database())
    }

    async fn list_events(&self, _id: Uuid) -> Result<Vec<MBuildEvent>, LedgerError> {
        Err(unreachable_database())
    }

    async fn fail_in_flight(&self, _detail: &str) -> Result<u64, LedgerError> {
        Err(unreachable_database())
    }
}

pub fn create_mock_state(ledger: Arc<dyn Ledger>) -> Arc<ServerState> {
    Arc::new(ServerState {
        ledger,
        cli: Cli::parse_from(["shipyard-server", "--in-memory"]),
    })
}

pub fn create_app(stubs: StubStages) -> (Router, AppState) {
    create_app_with_ledger(Arc::new(MemoryLedger::new()), stubs)
}

pub fn create_app_with_ledger(ledger: Arc<dyn Ledger>, stubs: StubStages) -> (Router, AppState) {
    let state = create_mock_state(ledger);
    let stubs = Arc::new(stubs);
    let stages = Stages {
        materializer: stubs.clone(),
        builder: stubs.clone(),
        publisher: stubs.clone(),
        launcher: stubs,
    };

    let app = AppState {
        orchestrator: Orchestrator::new(
            Arc::clone(&state.ledger),
            stages,
            PipelineConfig::default(),
        ),
        state,
    };

    (web::router(app.clone()), app)
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, bytes.to_vec())
}

pub async fn send_json(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send(router, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn wait_idle(app: &AppState) {
    for _ in 0..1000 {
        if app.orchestrator.in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("pipeline did not finish");
}
