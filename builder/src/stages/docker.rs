/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use serde::Deserialize;
use shipyard_core::consts::CONTAINER_LABEL;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::process::{push_line, run_captured, run_logged};
use super::{
    ContainerLauncher, ImageBuildRequest, ImageBuilder, RegistryPublisher, container_name,
};
use crate::error::StageError;

pub(crate) fn default_dockerfile(base_image: &str) -> String {
    format!(
        "FROM {}\nCOPY . /usr/share/nginx/html\nEXPOSE 80\n",
        base_image
    )
}

/// Writes the default Dockerfile unless the context ships its own. Returns
/// whether one was written.
pub(crate) async fn ensure_dockerfile(context: &Path, base_image: &str) -> io::Result<bool> {
    let dockerfile = context.join("Dockerfile");

    if fs::try_exists(&dockerfile).await? {
        return Ok(false);
    }

    fs::write(&dockerfile, default_dockerfile(base_image)).await?;
    Ok(true)
}

#[derive(Debug, Clone)]
pub struct DockerImageBuilder {
    binpath_docker: String,
    binpath_sh: String,
    base_image: String,
}

impl DockerImageBuilder {
    pub fn new(binpath_docker: String, binpath_sh: String, base_image: String) -> Self {
        Self {
            binpath_docker,
            binpath_sh,
            base_image,
        }
    }
}

#[async_trait]
impl ImageBuilder for DockerImageBuilder {
    async fn build(
        &self,
        request: &ImageBuildRequest,
        log: &mut String,
    ) -> Result<String, StageError> {
        push_line(log, &format!("$ {}", request.build_command));

        let mut command = Command::new(&self.binpath_sh);
        command
            .arg("-c")
            .arg(&request.build_command)
            .current_dir(&request.source);

        run_logged(command, log)
            .await
            .map_err(StageError::BuildFailed)?;

        let context = request.context();

        if !fs::try_exists(&context).await.unwrap_or(false) {
            return Err(StageError::BuildFailed(format!(
                "build output directory `{}` does not exist",
                request.build_output_dir
            )));
        }

        let written = ensure_dockerfile(&context, &self.base_image)
            .await
            .map_err(|e| StageError::BuildFailed(format!("cannot write Dockerfile: {}", e)))?;

        if written {
            push_line(
                log,
                &format!("no Dockerfile found, serving directory with {}", self.base_image),
            );
        }

        push_line(log, &format!("$ docker build --tag {}", request.tag));

        let mut command = Command::new(&self.binpath_docker);
        command
            .arg("build")
            .arg("--tag")
            .arg(&request.tag)
            .arg("--label")
            .arg(format!("{}={}", CONTAINER_LABEL, request.build_id))
            .arg(&context);

        run_logged(command, log)
            .await
            .map_err(StageError::BuildFailed)?;

        Ok(request.tag.clone())
    }

    async fn remove(&self, image_ref: &str) {
        let mut command = Command::new(&self.binpath_docker);
        command.arg("image").arg("rm").arg("--force").arg(image_ref);

        if let Err(e) = run_captured(command).await {
            warn!(error = %e, image = %image_ref, "Failed to remove image");
        }
    }
}

pub(crate) fn published_ref(registry: &str, image_ref: &str) -> String {
    format!("{}/{}", registry.trim_end_matches('/'), image_ref)
}

/// Pushes to the configured registry. Without one the local image is what the
/// launcher runs.
#[derive(Debug, Clone)]
pub struct DockerPublisher {
    binpath_docker: String,
    registry: Option<String>,
}

impl DockerPublisher {
    pub fn new(binpath_docker: String, registry: Option<String>) -> Self {
        Self {
            binpath_docker,
            registry: registry.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[async_trait]
impl RegistryPublisher for DockerPublisher {
    async fn publish(&self, image_ref: &str) -> Result<String, StageError> {
        let Some(registry) = &self.registry else {
            debug!(image = %image_ref, "No registry configured, using local image");
            return Ok(image_ref.to_string());
        };

        let target = published_ref(registry, image_ref);

        let mut command = Command::new(&self.binpath_docker);
        command.arg("tag").arg(image_ref).arg(&target);
        run_captured(command)
            .await
            .map_err(StageError::PublishFailed)?;

        let mut command = Command::new(&self.binpath_docker);
        command.arg("push").arg(&target);
        run_captured(command)
            .await
            .map_err(StageError::PublishFailed)?;

        info!(image = %target, "Pushed image");
        Ok(target)
    }
}

#[derive(Debug, Deserialize)]
struct PortBinding {
    #[serde(rename = "HostPort", default)]
    host_port: String,
}

/// Picks the lowest container port with a host binding out of the JSON of
/// `.NetworkSettings.Ports`.
pub(crate) fn resolve_host_port(ports_json: &str) -> Result<u16, String> {
    let ports: Option<HashMap<String, Option<Vec<PortBinding>>>> =
        serde_json::from_str(ports_json).map_err(|e| format!("unreadable port mapping: {}", e))?;

    let mut bound: Vec<(u16, u16)> = ports
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(port, bindings)| {
            let container_port = port.split('/').next()?.parse::<u16>().ok()?;
            let host_port = bindings?
                .iter()
                .find_map(|b| b.host_port.parse::<u16>().ok().filter(|p| *p > 0))?;
            Some((container_port, host_port))
        })
        .collect();

    bound.sort_unstable();

    bound
        .first()
        .map(|(_, host_port)| *host_port)
        .ok_or_else(|| "container publishes no ports".to_string())
}

#[derive(Debug, Clone)]
pub struct DockerLauncher {
    binpath_docker: String,
    public_host: String,
}

impl DockerLauncher {
    pub fn new(binpath_docker: String, public_host: String) -> Self {
        Self {
            binpath_docker,
            public_host,
        }
    }

    async fn start_and_resolve(&self, name: &str) -> Result<String, String> {
        let mut command = Command::new(&self.binpath_docker);
        command.arg("start").arg(name);
        run_captured(command).await?;

        let mut command = Command::new(&self.binpath_docker);
        command
            .arg("inspect")
            .arg("--format")
            .arg("{{json .NetworkSettings.Ports}}")
            .arg(name);
        let ports = run_captured(command).await?;

        let host_port = resolve_host_port(&ports)?;
        Ok(format!("{}:{}", self.public_host, host_port))
    }
}

#[async_trait]
impl ContainerLauncher for DockerLauncher {
    async fn launch(&self, published_ref: &str, build_id: Uuid) -> Result<String, StageError> {
        let name = container_name(build_id);

        let mut command = Command::new(&self.binpath_docker);
        command
            .arg("create")
            .arg("--name")
            .arg(&name)
            .arg("--label")
            .arg(format!("{}={}", CONTAINER_LABEL, build_id))
            .arg("--publish-all")
            .arg(published_ref);

        if let Err(e) = run_captured(command).await {
            self.remove(build_id).await;
            return Err(StageError::LaunchFailed(format!(
                "could not create container: {}",
                e
            )));
        }

        match self.start_and_resolve(&name).await {
            Ok(endpoint) => {
                info!(container = %name, endpoint = %endpoint, "Container running");
                Ok(endpoint)
            }
            Err(e) => {
                self.remove(build_id).await;
                Err(StageError::LaunchFailed(e))
            }
        }
    }

    async fn remove(&self, build_id: Uuid) {
        let name = container_name(build_id);
        let mut command = Command::new(&self.binpath_docker);
        command.arg("rm").arg("--force").arg(&name);

        if let Err(e) = run_captured(command).await {
            debug!(error = %e, container = %name, "Container not removed");
        }
    }
}
