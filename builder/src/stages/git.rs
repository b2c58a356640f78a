/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use shipyard_core::input::validate_source_location;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use super::SourceMaterializer;
use super::process::run_captured;
use crate::error::StageError;

/// Shallow clones into `<work_dir>/<build_id>`.
#[derive(Debug, Clone)]
pub struct GitMaterializer {
    binpath_git: String,
    work_dir: PathBuf,
}

impl GitMaterializer {
    pub fn new(binpath_git: String, work_dir: PathBuf) -> Self {
        Self {
            binpath_git,
            work_dir,
        }
    }

    pub fn checkout_path(&self, build_id: Uuid) -> PathBuf {
        self.work_dir.join(build_id.to_string())
    }
}

async fn remove_dir(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(error = %e, path = %path.display(), "Failed to remove working copy");
        }
    }
}

#[async_trait]
impl SourceMaterializer for GitMaterializer {
    async fn materialize(
        &self,
        build_id: Uuid,
        source_location: &str,
    ) -> Result<PathBuf, StageError> {
        validate_source_location(source_location)
            .map_err(|e| StageError::SourceUnavailable(e.to_string()))?;

        fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            StageError::SourceUnavailable(format!(
                "cannot create work directory {}: {}",
                self.work_dir.display(),
                e
            ))
        })?;

        let path = self.checkout_path(build_id);
        remove_dir(&path).await;

        let mut command = Command::new(&self.binpath_git);
        command
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--")
            .arg(source_location.trim())
            .arg(&path)
            .env("GIT_TERMINAL_PROMPT", "0");

        debug!(path = %path.display(), "Cloning repository");

        if let Err(e) = run_captured(command).await {
            remove_dir(&path).await;
            return Err(StageError::SourceUnavailable(format!(
                "could not clone {}: {}",
                source_location, e
            )));
        }

        Ok(path)
    }

    async fn release(&self, build_id: Uuid) {
        remove_dir(&self.checkout_path(build_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materializer(binpath_git: &str) -> (GitMaterializer, PathBuf) {
        let work_dir = std::env::temp_dir().join(format!("shipyard-git-{}", Uuid::new_v4()));
        (
            GitMaterializer::new(binpath_git.to_string(), work_dir.clone()),
            work_dir,
        )
    }

    #[tokio::test]
    async fn test_rejects_local_file_urls() {
        let (git, _) = materializer("git");

        let error = git
            .materialize(Uuid::new_v4(), "file:///etc")
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "source unavailable: URLs pointing to local files are not allowed"
        );
    }

    #[tokio::test]
    async fn test_failed_clone_leaves_no_working_copy() {
        let (git, work_dir) = materializer("false");
        let build_id = Uuid::new_v4();

        let error = git
            .materialize(build_id, "https://example.com/repo.git")
            .await
            .unwrap_err();

        assert!(matches!(error, StageError::SourceUnavailable(_)));
        assert!(error.to_string().contains("could not clone https://example.com/repo.git"));
        assert!(!git.checkout_path(build_id).exists());

        std::fs::remove_dir_all(work_dir).ok();
    }

    #[tokio::test]
    async fn test_release_missing_path_is_quiet() {
        let (git, _) = materializer("git");
        git.release(Uuid::new_v4()).await;
    }
}
