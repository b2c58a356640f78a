/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use entity::build::BuildStatus;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::*;
use crate::types::{ABuild, ABuildEvent, CBuild, CBuildEvent, EBuild, EBuildEvent};

/// Ledger backed by the relational store. Each write runs in its own
/// transaction and locks the build row, so state and event sequence of one
/// build never diverge.
#[derive(Debug)]
pub struct DatabaseLedger {
    db: DatabaseConnection,
}

impl DatabaseLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn lock_build(txn: &DatabaseTransaction, id: Uuid) -> Result<MBuild, LedgerError> {
        EBuild::find_by_id(id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }

    async fn insert_event(
        txn: &DatabaseTransaction,
        build: &MBuild,
        detail: Option<String>,
    ) -> Result<(), LedgerError> {
        let sequence = EBuildEvent::find()
            .filter(CBuildEvent::Build.eq(build.id))
            .count(txn)
            .await?;

        let aevent = ABuildEvent {
            id: Set(Uuid::new_v4()),
            build: Set(build.id),
            sequence: Set(sequence as i64),
            status: Set(build.status),
            detail: Set(detail),
            created_at: Set(build.updated_at),
        };

        aevent.insert(txn).await?;
        Ok(())
    }

    async fn transition(
        txn: &DatabaseTransaction,
        build: MBuild,
        status: BuildStatus,
        detail: Option<String>,
    ) -> Result<MBuild, LedgerError> {
        let updated_at = next_timestamp(build.updated_at);
        let mut abuild: ABuild = build.into_active_model();
        abuild.status = Set(status);
        abuild.updated_at = Set(updated_at);

        if status == BuildStatus::Running {
            abuild.endpoint = Set(detail.clone());
        }

        let build = abuild.update(txn).await?;
        Self::insert_event(txn, &build, detail).await?;
        Ok(build)
    }

    async fn modify<F>(&self, id: Uuid, apply: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut ABuild, &MBuild) + Send,
    {
        let txn = self.db.begin().await?;
        let build = Self::lock_build(&txn, id).await?;
        let updated_at = next_timestamp(build.updated_at);

        let mut abuild: ABuild = build.clone().into_active_model();
        apply(&mut abuild, &build);
        abuild.updated_at = Set(updated_at);
        abuild.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for DatabaseLedger {
    async fn create(&self, new: NewBuild) -> Result<MBuild, LedgerError> {
        let txn = self.db.begin().await?;
        let created_at = now();

        let abuild = ABuild {
            id: Set(new.id),
            source_location: Set(new.source_location),
            build_command: Set(new.build_command),
            build_output_dir: Set(new.build_output_dir),
            status: Set(BuildStatus::Pending),
            log: Set(String::new()),
            image_ref: Set(None),
            published_ref: Set(None),
            endpoint: Set(None),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        };

        let build = abuild.insert(&txn).await?;
        Self::insert_event(&txn, &build, None).await?;
        txn.commit().await?;

        debug!(build_id = %build.id, "Created build record");
        Ok(build)
    }

    async fn update_state(
        &self,
        id: Uuid,
        status: BuildStatus,
        detail: Option<String>,
    ) -> Result<MBuild, LedgerError> {
        let txn = self.db.begin().await?;
        let build = Self::lock_build(&txn, id).await?;

        check_transition(&build, status, &detail)?;

        let build = Self::transition(&txn, build, status, detail).await?;
        txn.commit().await?;

        debug!(build_id = %id, status = %status, "Updated build status");
        Ok(build)
    }

    async fn append_log(&self, id: Uuid, text: &str) -> Result<(), LedgerError> {
        self.modify(id, |abuild, build| {
            let mut log = build.log.clone();
            append_line(&mut log, text);
            abuild.log = Set(log);
        })
        .await
    }

    async fn record_image(&self, id: Uuid, image_ref: &str) -> Result<(), LedgerError> {
        self.modify(id, |abuild, _| {
            abuild.image_ref = Set(Some(image_ref.to_string()));
        })
        .await
    }

    async fn record_published(&self, id: Uuid, published_ref: &str) -> Result<(), LedgerError> {
        self.modify(id, |abuild, _| {
            abuild.published_ref = Set(Some(published_ref.to_string()));
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<MBuild, LedgerError> {
        EBuild::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }

    async fn list_events(&self, id: Uuid) -> Result<Vec<MBuildEvent>, LedgerError> {
        let build = EBuild::find_by_id(id).one(&self.db).await?;

        if build.is_none() {
            return Err(LedgerError::NotFound(id));
        }

        Ok(EBuildEvent::find()
            .filter(CBuildEvent::Build.eq(id))
            .order_by_asc(CBuildEvent::Sequence)
            .all(&self.db)
            .await?)
    }

    async fn fail_in_flight(&self, detail: &str) -> Result<u64, LedgerError> {
        let builds = EBuild::find()
            .filter(CBuild::Status.is_not_in([BuildStatus::Running, BuildStatus::Failed]))
            .all(&self.db)
            .await?;

        let mut failed = 0;

        for build in builds {
            let txn = self.db.begin().await?;
            let build = Self::lock_build(&txn, build.id).await?;

            if build.status.is_terminal() {
                continue;
            }

            let mut log = build.log.clone();
            append_line(&mut log, detail);
            let mut abuild: ABuild = build.into_active_model();
            abuild.log = Set(log);
            let build = abuild.update(&txn).await?;

            Self::transition(&txn, build, BuildStatus::Failed, Some(detail.to_string())).await?;
            txn.commit().await?;
            failed += 1;
        }

        Ok(failed)
    }
}
