/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::input::{greater_than_zero, port_in_range};
use super::ledger::Ledger;
use clap::Parser;
use entity::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "Shipyard", display_name = "Shipyard", bin_name = "shipyard-server", author = "Wavelens", version, about, long_about = None)]
pub struct Cli {
    #[arg(long, env = "SHIPYARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    #[arg(long, env = "SHIPYARD_LOG_JSON", default_value = "false")]
    pub log_json: bool,
    #[arg(long, env = "SHIPYARD_IP", default_value = "127.0.0.1")]
    pub ip: String,
    #[arg(long, env = "SHIPYARD_PORT", value_parser = port_in_range, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "SHIPYARD_DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long, env = "SHIPYARD_DATABASE_URL_FILE")]
    pub database_url_file: Option<String>,
    #[arg(long, env = "SHIPYARD_IN_MEMORY", default_value = "false")]
    pub in_memory: bool,
    #[arg(long, env = "SHIPYARD_WORK_DIR", default_value = "/tmp/shipyard")]
    pub work_dir: String,
    #[arg(long, env = "SHIPYARD_REGISTRY")]
    pub registry: Option<String>,
    #[arg(long, env = "SHIPYARD_PUBLIC_HOST", default_value = "127.0.0.1")]
    pub public_host: String,
    #[arg(long, env = "SHIPYARD_DEFAULT_BASE_IMAGE", default_value = "nginx:alpine")]
    pub default_base_image: String,
    #[arg(long, env = "SHIPYARD_STAGE_TIMEOUT", value_parser = greater_than_zero::<u64>, default_value = "120")]
    pub stage_timeout: u64,
    #[arg(long, env = "SHIPYARD_PIPELINE_TIMEOUT", value_parser = greater_than_zero::<u64>, default_value = "300")]
    pub pipeline_timeout: u64,
    #[arg(long, env = "SHIPYARD_BINPATH_GIT", default_value = "git")]
    pub binpath_git: String,
    #[arg(long, env = "SHIPYARD_BINPATH_DOCKER", default_value = "docker")]
    pub binpath_docker: String,
    #[arg(long, env = "SHIPYARD_BINPATH_SH", default_value = "sh")]
    pub binpath_sh: String,
    #[arg(long, env = "SHIPYARD_REPORT_ERRORS", default_value = "false")]
    pub report_errors: bool,
    #[arg(long, env = "SHIPYARD_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl Cli {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout)
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout)
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

pub struct ServerState {
    pub ledger: Arc<dyn Ledger>,
    pub cli: Cli,
}

impl fmt::Debug for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState")
            .field("cli", &self.cli)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BaseResponse<T> {
    pub error: bool,
    pub message: T,
}

/// Inputs of a build as accepted by the collect endpoint.
/// Missing fields deserialize as empty and are rejected by validation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BuildRequest {
    #[serde(rename = "project_github_url")]
    pub source_location: String,
    pub build_command: String,
    #[serde(rename = "build_out_dir")]
    pub build_output_dir: String,
}

pub type EBuild = build::Entity;
pub type EBuildEvent = build_event::Entity;

pub type MBuild = build::Model;
pub type MBuildEvent = build_event::Model;

pub type ABuild = build::ActiveModel;
pub type ABuildEvent = build_event::ActiveModel;

pub type CBuild = build::Column;
pub type CBuildEvent = build_event::Column;

pub type RBuild = build::Relation;
pub type RBuildEvent = build_event::Relation;
