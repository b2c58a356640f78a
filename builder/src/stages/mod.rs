/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Capabilities the pipeline drives, one per stage. The orchestrator only talks
//! to these traits; the process-backed implementations shell out to `git` and
//! `docker`.

mod docker;
mod git;
mod process;

pub use docker::{DockerImageBuilder, DockerLauncher, DockerPublisher};
pub use git::GitMaterializer;

use async_trait::async_trait;
use entity::build::BuildStatus;
use shipyard_core::consts::{CONTAINER_PREFIX, IMAGE_REPOSITORY};
use shipyard_core::types::Cli;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Materialize,
    Build,
    Publish,
    Launch,
}

impl Stage {
    /// State recorded before the stage runs.
    pub fn status(self) -> BuildStatus {
        match self {
            Stage::Materialize => BuildStatus::Cloning,
            Stage::Build => BuildStatus::Building,
            Stage::Publish => BuildStatus::Publishing,
            Stage::Launch => BuildStatus::Deploying,
        }
    }

    pub fn failure(self, message: impl Into<String>) -> StageError {
        let message = message.into();
        match self {
            Stage::Materialize => StageError::SourceUnavailable(message),
            Stage::Build => StageError::BuildFailed(message),
            Stage::Publish => StageError::PublishFailed(message),
            Stage::Launch => StageError::LaunchFailed(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildRequest {
    pub build_id: Uuid,
    pub source: PathBuf,
    pub build_output_dir: String,
    pub build_command: String,
    pub tag: String,
}

impl ImageBuildRequest {
    pub fn context(&self) -> PathBuf {
        self.source.join(&self.build_output_dir)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceMaterializer: Send + Sync {
    /// Produces a fresh working copy scoped to `build_id`.
    async fn materialize(&self, build_id: Uuid, source_location: &str)
    -> Result<PathBuf, StageError>;

    /// Removes the working copy of `build_id`, if any.
    async fn release(&self, build_id: Uuid);
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Output is appended to `log` as it is produced, so whatever was captured
    /// is still there when the build fails or is interrupted.
    async fn build(
        &self,
        request: &ImageBuildRequest,
        log: &mut String,
    ) -> Result<String, StageError>;

    async fn remove(&self, image_ref: &str);
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryPublisher: Send + Sync {
    async fn publish(&self, image_ref: &str) -> Result<String, StageError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerLauncher: Send + Sync {
    /// Starts the container for `build_id` and returns its reachable endpoint.
    /// Leaves nothing behind on failure.
    async fn launch(&self, published_ref: &str, build_id: Uuid) -> Result<String, StageError>;

    async fn remove(&self, build_id: Uuid);
}

#[derive(Clone)]
pub struct Stages {
    pub materializer: Arc<dyn SourceMaterializer>,
    pub builder: Arc<dyn ImageBuilder>,
    pub publisher: Arc<dyn RegistryPublisher>,
    pub launcher: Arc<dyn ContainerLauncher>,
}

impl Stages {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            materializer: Arc::new(GitMaterializer::new(
                cli.binpath_git.clone(),
                PathBuf::from(&cli.work_dir),
            )),
            builder: Arc::new(DockerImageBuilder::new(
                cli.binpath_docker.clone(),
                cli.binpath_sh.clone(),
                cli.default_base_image.clone(),
            )),
            publisher: Arc::new(DockerPublisher::new(
                cli.binpath_docker.clone(),
                cli.registry.clone(),
            )),
            launcher: Arc::new(DockerLauncher::new(
                cli.binpath_docker.clone(),
                cli.public_host.clone(),
            )),
        }
    }
}

pub fn image_tag(build_id: Uuid) -> String {
    format!("{}/{}:latest", IMAGE_REPOSITORY, build_id)
}

pub fn container_name(build_id: Uuid) -> String {
    format!("{}-{}", CONTAINER_PREFIX, build_id)
}
