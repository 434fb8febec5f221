//! Create conversation and message tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversation::UserAId).string_len(32).not_null())
                    .col(ColumnDef::new(Conversation::UserBId).string_len(32).not_null())
                    .col(ColumnDef::new(Conversation::LastMessageText).text())
                    .col(ColumnDef::new(Conversation::LastMessageSenderId).string_len(32))
                    .col(ColumnDef::new(Conversation::LastMessageAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Conversation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_user_a")
                            .from(Conversation::Table, Conversation::UserAId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_user_b")
                            .from(Conversation::Table, Conversation::UserBId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_a_id, user_b_id) - participants stored in
        // canonical order, so one conversation per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_pair")
                    .table(Conversation::Table)
                    .col(Conversation::UserAId)
                    .col(Conversation::UserBId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user_b_id (inbox listing filters on either column)
        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_user_b_id")
                    .table(Conversation::Table)
                    .col(Conversation::UserBId)
                    .to_owned(),
            )
            .await?;

        // Index: last_message_at (inbox ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_last_message_at")
                    .table(Conversation::Table)
                    .col(Conversation::LastMessageAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Message::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Message::ConversationId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Message::SenderId).string_len(32).not_null())
                    .col(ColumnDef::new(Message::Text).text().not_null())
                    .col(
                        ColumnDef::new(Message::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_conversation")
                            .from(Message::Table, Message::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_sender")
                            .from(Message::Table, Message::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: conversation_id (message history pagination)
        manager
            .create_index(
                Index::create()
                    .name("idx_message_conversation_id")
                    .table(Message::Table)
                    .col(Message::ConversationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Conversation {
    Table,
    Id,
    UserAId,
    UserBId,
    LastMessageText,
    LastMessageSenderId,
    LastMessageAt,
    CreatedAt,
}

#[derive(Iden)]
enum Message {
    Table,
    Id,
    ConversationId,
    SenderId,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
