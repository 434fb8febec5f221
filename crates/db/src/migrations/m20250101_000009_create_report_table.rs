//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::ReporterId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Report::TargetUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Report::TargetPostId).string_len(32))
                    .col(ColumnDef::new(Report::Reason).string_len(256).not_null())
                    .col(ColumnDef::new(Report::Description).text())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Report::ReviewerId).string_len(32))
                    .col(ColumnDef::new(Report::ReviewedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reporter")
                            .from(Report::Table, Report::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_target_user")
                            .from(Report::Table, Report::TargetUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (reporter_id, target_user_id, created_at) - throttle window lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_report_reporter_target_created")
                    .table(Report::Table)
                    .col(Report::ReporterId)
                    .col(Report::TargetUserId)
                    .col(Report::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: status (moderation queue listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status")
                    .table(Report::Table)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    ReporterId,
    TargetUserId,
    TargetPostId,
    Reason,
    Description,
    Status,
    ReviewerId,
    ReviewedAt,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
