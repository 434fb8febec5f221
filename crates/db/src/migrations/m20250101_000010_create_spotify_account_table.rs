//! Create spotify_account table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpotifyAccount::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SpotifyAccount::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SpotifyAccount::SpotifyUserId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SpotifyAccount::DisplayName).string_len(256))
                    .col(ColumnDef::new(SpotifyAccount::AccessToken).text().not_null())
                    .col(
                        ColumnDef::new(SpotifyAccount::RefreshToken)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SpotifyAccount::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SpotifyAccount::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SpotifyAccount::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spotify_account_user")
                            .from(SpotifyAccount::Table, SpotifyAccount::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: spotify_user_id (reverse lookup on OAuth callback)
        manager
            .create_index(
                Index::create()
                    .name("idx_spotify_account_spotify_user_id")
                    .table(SpotifyAccount::Table)
                    .col(SpotifyAccount::SpotifyUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpotifyAccount::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SpotifyAccount {
    Table,
    UserId,
    SpotifyUserId,
    DisplayName,
    AccessToken,
    RefreshToken,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
