/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod consts;
pub mod database;
pub mod input;
pub mod ledger;
pub mod logging;
pub mod types;

use anyhow::{Context, Result};
use consts::RESTART_DETAIL;
use database::connect_db;
use ledger::{DatabaseLedger, Ledger, MemoryLedger};
use std::sync::Arc;
use tracing::{info, warn};
use types::*;

pub async fn init_state(cli: Cli) -> Result<Arc<ServerState>> {
    info!(ip = %cli.ip, port = cli.port, "Starting Shipyard Server");

    let ledger: Arc<dyn Ledger> = if cli.in_memory {
        warn!("Using in-memory ledger, builds are lost on restart");
        Arc::new(MemoryLedger::new())
    } else {
        let db = connect_db(&cli).await?;
        Arc::new(DatabaseLedger::new(db))
    };

    let interrupted = ledger
        .fail_in_flight(RESTART_DETAIL)
        .await
        .context("Failed to recover interrupted builds")?;

    if interrupted > 0 {
        warn!(count = interrupted, "Marked interrupted builds as failed");
    }

    Ok(Arc::new(ServerState { ledger, cli }))
}
