/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use entity::build::BuildStatus;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::*;

#[derive(Debug)]
struct Record {
    build: MBuild,
    events: Vec<MBuildEvent>,
}

/// Process-local ledger. Every write holds the map lock for its whole duration,
/// which keeps state and event sequence consistent for concurrent writers.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<HashMap<Uuid, Record>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn event(build: &MBuild, sequence: usize, detail: Option<String>) -> MBuildEvent {
    MBuildEvent {
        id: Uuid::new_v4(),
        build: build.id,
        sequence: sequence as i64,
        status: build.status,
        detail,
        created_at: build.updated_at,
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create(&self, new: NewBuild) -> Result<MBuild, LedgerError> {
        let mut records = self.records.write().await;

        if records.contains_key(&new.id) {
            return Err(LedgerError::Database(sea_orm::DbErr::RecordNotInserted));
        }

        let created_at = now();
        let build = MBuild {
            id: new.id,
            source_location: new.source_location,
            build_command: new.build_command,
            build_output_dir: new.build_output_dir,
            status: BuildStatus::Pending,
            log: String::new(),
            image_ref: None,
            published_ref: None,
            endpoint: None,
            created_at,
            updated_at: created_at,
        };

        let events = vec![event(&build, 0, None)];
        records.insert(
            build.id,
            Record {
                build: build.clone(),
                events,
            },
        );

        Ok(build)
    }

    async fn update_state(
        &self,
        id: Uuid,
        status: BuildStatus,
        detail: Option<String>,
    ) -> Result<MBuild, LedgerError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;

        check_transition(&record.build, status, &detail)?;

        record.build.status = status;
        record.build.updated_at = next_timestamp(record.build.updated_at);
        if status == BuildStatus::Running {
            record.build.endpoint = detail.clone();
        }

        let sequence = record.events.len();
        record.events.push(event(&record.build, sequence, detail));

        Ok(record.build.clone())
    }

    async fn append_log(&self, id: Uuid, text: &str) -> Result<(), LedgerError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;

        append_line(&mut record.build.log, text);
        record.build.updated_at = next_timestamp(record.build.updated_at);
        Ok(())
    }

    async fn record_image(&self, id: Uuid, image_ref: &str) -> Result<(), LedgerError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;

        record.build.image_ref = Some(image_ref.to_string());
        record.build.updated_at = next_timestamp(record.build.updated_at);
        Ok(())
    }

    async fn record_published(&self, id: Uuid, published_ref: &str) -> Result<(), LedgerError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;

        record.build.published_ref = Some(published_ref.to_string());
        record.build.updated_at = next_timestamp(record.build.updated_at);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<MBuild, LedgerError> {
        let records = self.records.read().await;
        records
            .get(&id)
            .map(|r| r.build.clone())
            .ok_or(LedgerError::NotFound(id))
    }

    async fn list_events(&self, id: Uuid) -> Result<Vec<MBuildEvent>, LedgerError> {
        let records = self.records.read().await;
        records
            .get(&id)
            .map(|r| r.events.clone())
            .ok_or(LedgerError::NotFound(id))
    }

    async fn fail_in_flight(&self, detail: &str) -> Result<u64, LedgerError> {
        let mut records = self.records.write().await;
        let mut failed = 0;

        for record in records.values_mut() {
            if record.build.status.is_terminal() {
                continue;
            }

            append_line(&mut record.build.log, detail);
            record.build.status = BuildStatus::Failed;
            record.build.updated_at = next_timestamp(record.build.updated_at);

            let sequence = record.events.len();
            record
                .events
                .push(event(&record.build, sequence, Some(detail.to_string())));
            failed += 1;
        }

        Ok(failed)
    }
}
