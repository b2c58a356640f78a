/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Build::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Build::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Build::SourceLocation).string().not_null())
                    .col(ColumnDef::new(Build::BuildCommand).string().not_null())
                    .col(ColumnDef::new(Build::BuildOutputDir).string().not_null())
                    .col(ColumnDef::new(Build::Status).small_integer().not_null())
                    .col(ColumnDef::new(Build::Log).text().not_null().default(""))
                    .col(ColumnDef::new(Build::ImageRef).string())
                    .col(ColumnDef::new(Build::PublishedRef).string())
                    .col(ColumnDef::new(Build::Endpoint).string())
                    .col(ColumnDef::new(Build::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Build::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-build-status")
                    .table(Build::Table)
                    .col(Build::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Build::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Build {
    Table,
    Id,
    SourceLocation,
    BuildCommand,
    BuildOutputDir,
    Status,
    Log,
    ImageRef,
    PublishedRef,
    Endpoint,
    CreatedAt,
    UpdatedAt,
}
