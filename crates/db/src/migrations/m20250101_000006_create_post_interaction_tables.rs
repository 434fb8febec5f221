//! Create post_like and post_comment tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostLike::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(PostLike::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PostLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_like_post")
                            .from(PostLike::Table, PostLike::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_like_user")
                            .from(PostLike::Table, PostLike::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (post_id, user_id) - at most one like per user per post
        manager
            .create_index(
                Index::create()
                    .name("idx_post_like_post_user")
                    .table(PostLike::Table)
                    .col(PostLike::PostId)
                    .col(PostLike::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for a user's liked posts)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_like_user_id")
                    .table(PostLike::Table)
                    .col(PostLike::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostComment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostComment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostComment::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(PostComment::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(PostComment::Text).text().not_null())
                    .col(
                        ColumnDef::new(PostComment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_comment_post")
                            .from(PostComment::Table, PostComment::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_comment_user")
                            .from(PostComment::Table, PostComment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: post_id (for listing a post's comments)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_comment_post_id")
                    .table(PostComment::Table)
                    .col(PostComment::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostComment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostLike::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PostLike {
    Table,
    Id,
    PostId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum PostComment {
    Table,
    Id,
    PostId,
    UserId,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
