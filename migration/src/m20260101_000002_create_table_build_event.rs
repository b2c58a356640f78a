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
                    .table(BuildEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BuildEvent::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BuildEvent::Build).uuid().not_null())
                    .col(ColumnDef::new(BuildEvent::Sequence).big_integer().not_null())
                    .col(ColumnDef::new(BuildEvent::Status).small_integer().not_null())
                    .col(ColumnDef::new(BuildEvent::Detail).text())
                    .col(ColumnDef::new(BuildEvent::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-build_event-build")
                            .from(BuildEvent::Table, BuildEvent::Build)
                            .to(Build::Table, Build::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-build_event-build-sequence")
                    .table(BuildEvent::Table)
                    .col(BuildEvent::Build)
                    .col(BuildEvent::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BuildEvent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BuildEvent {
    Table,
    Id,
    Build,
    Sequence,
    Status,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Build {
    Table,
    Id,
}
