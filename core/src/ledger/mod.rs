/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Persistent record of every build: identity, inputs, lifecycle state, log and
//! the ordered sequence of state transition events.
//!
//! The ledger does not decide anything on its own. It rejects transitions that
//! would break the lifecycle order and otherwise stores what it is told.

mod database;
mod memory;

pub use database::DatabaseLedger;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use entity::build::BuildStatus;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{MBuild, MBuildEvent};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("build {0} not found")]
    NotFound(Uuid),
    #[error("build {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: BuildStatus,
        to: BuildStatus,
    },
    #[error("build {0} cannot be running without an endpoint")]
    MissingEndpoint(Uuid),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBuild {
    pub id: Uuid,
    pub source_location: String,
    pub build_command: String,
    pub build_output_dir: String,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Stores a build in `Pending` together with its first event.
    async fn create(&self, build: NewBuild) -> Result<MBuild, LedgerError>;

    /// Moves a build to `status` and records the matching event. For `Running`
    /// the detail is the endpoint.
    async fn update_state(
        &self,
        id: Uuid,
        status: BuildStatus,
        detail: Option<String>,
    ) -> Result<MBuild, LedgerError>;

    async fn append_log(&self, id: Uuid, text: &str) -> Result<(), LedgerError>;

    async fn record_image(&self, id: Uuid, image_ref: &str) -> Result<(), LedgerError>;

    async fn record_published(&self, id: Uuid, published_ref: &str) -> Result<(), LedgerError>;

    async fn get(&self, id: Uuid) -> Result<MBuild, LedgerError>;

    async fn list_events(&self, id: Uuid) -> Result<Vec<MBuildEvent>, LedgerError>;

    /// Fails every build that is not terminal. Returns how many were touched.
    async fn fail_in_flight(&self, detail: &str) -> Result<u64, LedgerError>;
}

pub(crate) fn check_transition(
    build: &MBuild,
    status: BuildStatus,
    detail: &Option<String>,
) -> Result<(), LedgerError> {
    if !build.status.can_transition_to(status) {
        return Err(LedgerError::InvalidTransition {
            id: build.id,
            from: build.status,
            to: status,
        });
    }

    if status == BuildStatus::Running && detail.as_deref().is_none_or(str::is_empty) {
        return Err(LedgerError::MissingEndpoint(build.id));
    }

    Ok(())
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Timestamps are stored with microsecond precision, so a transition landing in
/// the same microsecond as the previous write is pushed one microsecond ahead.
pub(crate) fn next_timestamp(previous: NaiveDateTime) -> NaiveDateTime {
    let now = now();

    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

pub(crate) fn append_line(log: &mut String, text: &str) {
    log.push_str(text);

    if !text.ends_with('\n') {
        log.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_timestamp_strictly_increases() {
        let future = now() + chrono::Duration::seconds(60);
        let next = next_timestamp(future);
        assert_eq!(next, future + chrono::Duration::microseconds(1));

        let past = now() - chrono::Duration::seconds(60);
        assert!(next_timestamp(past) > past);
    }

    #[test]
    fn test_append_line_terminates_entries() {
        let mut log = String::new();
        append_line(&mut log, "step 1");
        append_line(&mut log, "step 2\n");
        assert_eq!(log, "step 1\nstep 2\n");
    }
}
