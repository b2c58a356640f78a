/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Drives one build through `Cloning → Building → Publishing → Deploying →
//! Running`, one tokio task per build.
//!
//! Every state is written to the ledger before the matching stage runs. Any
//! failure, timeout or cancellation ends the build in `Failed` with the error as
//! event detail, and releases whatever the run created so far.

use entity::build::BuildStatus;
use shipyard_core::input::{require_field, validate_build_output_dir, validate_source_location};
use shipyard_core::ledger::{Ledger, LedgerError, NewBuild};
use shipyard_core::types::{BuildRequest, Cli, MBuild};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{StageError, SubmitError};
use crate::stages::{ImageBuildRequest, Stage, Stages, image_tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub stage_timeout: Duration,
    pub pipeline_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            stage_timeout: cli.stage_timeout(),
            pipeline_timeout: cli.pipeline_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(120),
            pipeline_timeout: Duration::from_secs(300),
        }
    }
}

type Tasks = Arc<Mutex<HashMap<Uuid, CancellationToken>>>;

fn lock(tasks: &Tasks) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unregisters the build's cancellation token when its task ends, also on panic.
struct Registration {
    tasks: Tasks,
    build_id: Uuid,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock(&self.tasks).remove(&self.build_id);
    }
}

/// What a run has created so far, kept outside the pipeline future so it
/// survives a timeout or cancellation and can be cleaned up.
#[derive(Debug, Default)]
struct Progress {
    materializing: bool,
    building: bool,
    image_ref: Option<String>,
    launching: bool,
    log: String,
}

#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn Ledger>,
    stages: Stages,
    config: PipelineConfig,
    tasks: Tasks,
    tracker: TaskTracker,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(ledger: Arc<dyn Ledger>, stages: Stages, config: PipelineConfig) -> Self {
        Self {
            ledger,
            stages,
            config,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Validates the request, records the build as `Pending` and starts its
    /// pipeline. Returns as soon as the ledger entry exists.
    pub async fn submit(&self, request: BuildRequest) -> Result<Uuid, SubmitError> {
        validate_source_location(&request.source_location)?;
        require_field("build_command", &request.build_command)?;
        validate_build_output_dir(&request.build_output_dir)?;

        let build = self
            .ledger
            .create(NewBuild {
                id: Uuid::new_v4(),
                source_location: request.source_location.trim().to_string(),
                build_command: request.build_command,
                build_output_dir: request.build_output_dir.trim().to_string(),
            })
            .await?;

        let build_id = build.id;
        let token = CancellationToken::new();
        lock(&self.tasks).insert(build_id, token.clone());

        let registration = Registration {
            tasks: Arc::clone(&self.tasks),
            build_id,
        };

        let span = info_span!("pipeline", build_id = %build_id);
        let orchestrator = self.clone();

        self.tracker.spawn(
            async move {
                let _registration = registration;
                orchestrator.run(build, token).await;
            }
            .instrument(span),
        );

        info!(build_id = %build_id, "Build submitted");
        Ok(build_id)
    }

    /// Asks a running pipeline to stop. `Ok(false)` when the build already
    /// finished.
    pub async fn cancel(&self, build_id: Uuid) -> Result<bool, LedgerError> {
        let token = lock(&self.tasks).get(&build_id).cloned();

        if let Some(token) = token {
            info!(build_id = %build_id, "Cancelling build");
            token.cancel();
            return Ok(true);
        }

        self.ledger.get(build_id).await?;
        Ok(false)
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Cancels every running pipeline and waits for them to record their outcome.
    pub async fn shutdown(&self) {
        let tokens: Vec<CancellationToken> = lock(&self.tasks).values().cloned().collect();

        if !tokens.is_empty() {
            warn!(count = tokens.len(), "Cancelling in-flight builds");
        }

        for token in tokens {
            token.cancel();
        }

        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn run(&self, build: MBuild, token: CancellationToken) {
        let build_id = build.id;
        let mut progress = Progress::default();

        let outcome = tokio::select! {
            biased;
            result = time::timeout(self.config.pipeline_timeout, self.drive(&build, &mut progress)) => {
                match result {
                    Ok(result) => result,
                    Err(_) => Err(StageError::DeadlineExceeded(self.config.pipeline_timeout)),
                }
            }
            _ = token.cancelled() => Err(StageError::Cancelled),
        };

        match outcome {
            Ok(endpoint) => {
                info!(endpoint = %endpoint, "Build running");
                self.release_source(build_id, &mut progress).await;
            }
            Err(e) => {
                self.fail(build_id, &mut progress, e).await;
            }
        }
    }

    async fn drive(&self, build: &MBuild, progress: &mut Progress) -> Result<String, StageError> {
        let build_id = build.id;

        self.enter(build_id, Stage::Materialize).await?;
        progress.materializing = true;
        let source = self
            .bounded(
                Stage::Materialize,
                self.stages
                    .materializer
                    .materialize(build_id, &build.source_location),
            )
            .await?;

        self.enter(build_id, Stage::Build).await?;
        let request = ImageBuildRequest {
            build_id,
            source,
            build_output_dir: build.build_output_dir.clone(),
            build_command: build.build_command.clone(),
            tag: image_tag(build_id),
        };
        progress.building = true;
        let built = self
            .bounded(
                Stage::Build,
                self.stages.builder.build(&request, &mut progress.log),
            )
            .await;
        self.flush_log(build_id, progress).await?;
        let image_ref = built?;
        progress.image_ref = Some(image_ref.clone());
        self.ledger.record_image(build_id, &image_ref).await?;

        self.enter(build_id, Stage::Publish).await?;
        let published_ref = self
            .bounded(Stage::Publish, self.stages.publisher.publish(&image_ref))
            .await?;
        self.ledger
            .record_published(build_id, &published_ref)
            .await?;

        self.enter(build_id, Stage::Launch).await?;
        progress.launching = true;
        let endpoint = self
            .bounded(
                Stage::Launch,
                self.stages.launcher.launch(&published_ref, build_id),
            )
            .await?;

        self.ledger
            .update_state(build_id, BuildStatus::Running, Some(endpoint.clone()))
            .await?;

        Ok(endpoint)
    }

    async fn enter(&self, build_id: Uuid, stage: Stage) -> Result<(), StageError> {
        self.ledger
            .update_state(build_id, stage.status(), None)
            .await?;
        info!(status = %stage.status(), "Entering stage");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        stage: Stage,
        future: impl Future<Output = Result<T, StageError>>,
    ) -> Result<T, StageError> {
        match time::timeout(self.config.stage_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(stage.failure(format!(
                "timed out after {:?}",
                self.config.stage_timeout
            ))),
        }
    }

    async fn flush_log(&self, build_id: Uuid, progress: &mut Progress) -> Result<(), LedgerError> {
        if progress.log.is_empty() {
            return Ok(());
        }

        self.ledger.append_log(build_id, &progress.log).await?;
        progress.log.clear();
        Ok(())
    }

    async fn fail(&self, build_id: Uuid, progress: &mut Progress, error: StageError) {
        let detail = error.to_string();
        error!(error = %detail, "Build failed");

        // The pipeline may have committed its last transition before being stopped.
        match self.ledger.get(build_id).await {
            Ok(build) if build.status.is_terminal() => {
                warn!(status = %build.status, "Build already finished, keeping its state");
                self.release_source(build_id, progress).await;
                return;
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to load build"),
        }

        if let Err(e) = self.flush_log(build_id, progress).await {
            error!(error = %e, "Failed to persist build log");
        }

        if let Err(e) = self.ledger.append_log(build_id, &detail).await {
            error!(error = %e, "Failed to persist build error");
        }

        match self
            .ledger
            .update_state(build_id, BuildStatus::Failed, Some(detail))
            .await
        {
            Ok(_) => {}
            Err(LedgerError::InvalidTransition { from, .. }) if from.is_terminal() => {
                warn!(status = %from, "Build already finished, keeping its state");
                self.release_source(build_id, progress).await;
                return;
            }
            Err(e) => error!(error = %e, "Failed to record build failure"),
        }

        if progress.launching {
            self.stages.launcher.remove(build_id).await;
        }

        // A build cut short leaves no reference behind, only the tag it was writing.
        let image_ref = match progress.image_ref.take() {
            Some(image_ref) => Some(image_ref),
            None if progress.building => Some(image_tag(build_id)),
            None => None,
        };

        if let Some(image_ref) = image_ref {
            self.stages.builder.remove(&image_ref).await;
        }

        self.release_source(build_id, progress).await;
    }

    async fn release_source(&self, build_id: Uuid, progress: &mut Progress) {
        if std::mem::take(&mut progress.materializing) {
            self.stages.materializer.release(build_id).await;
        }
    }
}
