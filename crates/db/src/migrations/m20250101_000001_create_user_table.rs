//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Username).string_len(128).not_null())
                    .col(ColumnDef::new(User::UsernameLower).string_len(128).not_null())
                    .col(ColumnDef::new(User::Token).string_len(64))
                    .col(ColumnDef::new(User::Name).string_len(256))
                    .col(ColumnDef::new(User::Bio).text())
                    .col(ColumnDef::new(User::AvatarUrl).text())
                    .col(ColumnDef::new(User::GoogleId).string_len(128))
                    .col(
                        ColumnDef::new(User::FollowersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::FollowingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::PostsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(User::IsDeactivated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(User::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: username_lower - case-insensitive username lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_user_username_lower")
                    .table(User::Table)
                    .col(User::UsernameLower)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: token (for API authentication)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_token")
                    .table(User::Table)
                    .col(User::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: google_id (one account per Google identity)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_google_id")
                    .table(User::Table)
                    .col(User::GoogleId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Username,
    UsernameLower,
    Token,
    Name,
    Bio,
    AvatarUrl,
    GoogleId,
    FollowersCount,
    FollowingCount,
    PostsCount,
    IsAdmin,
    IsDeactivated,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
