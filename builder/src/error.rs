/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use shipyard_core::consts::CANCELLED_DETAIL;
use shipyard_core::input::InputError;
use shipyard_core::ledger::LedgerError;
use std::time::Duration;
use thiserror::Error;

/// Reasons a pipeline run ends in `Failed`. The display text is what lands in
/// the build log and in the detail of the `Failed` event.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("build failed: {0}")]
    BuildFailed(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("pipeline deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("{}", CANCELLED_DETAIL)]
    Cancelled,
    #[error("store error: {0}")]
    Store(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InputError),
    #[error("store error: {0}")]
    Store(#[from] LedgerError),
}
