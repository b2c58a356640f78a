/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use clap::Parser;
use shipyard_core::init_state;
use shipyard_core::logging::init_logging;
use shipyard_core::types::Cli;
use std::sync::Arc;
use tracing::warn;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let _guard = match (cli.report_errors, cli.sentry_dsn.as_deref()) {
        (true, Some(dsn)) => Some(sentry::init(dsn)),
        (true, None) => {
            warn!("Error reporting enabled without a sentry DSN, skipping");
            None
        }
        _ => None,
    };

    let state = init_state(cli).await?;

    let orchestrator = builder::start_builder(Arc::clone(&state));
    web::serve_web(Arc::clone(&state), orchestrator).await?;

    Ok(())
}
