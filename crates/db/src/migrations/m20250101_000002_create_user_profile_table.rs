//! Create user profile table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProfile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfile::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserProfile::Password).string_len(256))
                    .col(ColumnDef::new(UserProfile::Email).string_len(512))
                    .col(
                        ColumnDef::new(UserProfile::ProfilePrivacy)
                            .string_len(16)
                            .not_null()
                            .default("public"),
                    )
                    .col(
                        ColumnDef::new(UserProfile::PostsPrivacy)
                            .string_len(16)
                            .not_null()
                            .default("public"),
                    )
                    .col(
                        ColumnDef::new(UserProfile::FriendsPrivacy)
                            .string_len(16)
                            .not_null()
                            .default("public"),
                    )
                    .col(ColumnDef::new(UserProfile::ResetToken).string_len(128))
                    .col(
                        ColumnDef::new(UserProfile::ResetTokenExpiresAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(UserProfile::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profile_user")
                            .from(UserProfile::Table, UserProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: reset_token (password recovery lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_profile_reset_token")
                    .table(UserProfile::Table)
                    .col(UserProfile::ResetToken)
                    .to_owned(),
            )
            .await?;

        // Index: email (login and recovery lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_profile_email")
                    .table(UserProfile::Table)
                    .col(UserProfile::Email)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProfile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserProfile {
    Table,
    UserId,
    Password,
    Email,
    ProfilePrivacy,
    PostsPrivacy,
    FriendsPrivacy,
    ResetToken,
    ResetTokenExpiresAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
