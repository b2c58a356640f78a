/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod error;
pub mod orchestrator;
pub mod stages;

pub use orchestrator::{Orchestrator, PipelineConfig};

use shipyard_core::types::ServerState;
use stages::Stages;
use std::sync::Arc;
use tracing::info;

pub fn start_builder(state: Arc<ServerState>) -> Orchestrator {
    let config = PipelineConfig::from_cli(&state.cli);

    info!(
        work_dir = %state.cli.work_dir,
        registry = state.cli.registry.as_deref().unwrap_or("none"),
        stage_timeout = ?config.stage_timeout,
        pipeline_timeout = ?config.pipeline_timeout,
        "Starting builder"
    );

    Orchestrator::new(
        Arc::clone(&state.ledger),
        Stages::from_cli(&state.cli),
        config,
    )
}
