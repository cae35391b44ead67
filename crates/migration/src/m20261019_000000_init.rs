//! Initial schema migration.
//!
//! - `users`: accounts, keyed by username
//! - `ads`: items offered for exchange, owned by a user
//! - `exchange_proposals`: offers of one ad in exchange for another
//!
//! Foreign keys keep the default action: removing ads or users together with
//! the rows that reference them is done explicitly, inside one transaction.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Email,
    Password,
    FirstName,
    LastName,
    DateJoined,
}

#[derive(Iden)]
enum Ads {
    Table,
    Id,
    UserId,
    Title,
    Description,
    ImageUrl,
    Category,
    Condition,
    SearchText,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ExchangeProposals {
    Table,
    Id,
    AdSenderId,
    AdReceiverId,
    Comment,
    Status,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::FirstName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::LastName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::DateJoined).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Ads
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ads::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Ads::UserId).string().not_null())
                    .col(ColumnDef::new(Ads::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Ads::Description).text().not_null())
                    .col(ColumnDef::new(Ads::ImageUrl).string())
                    .col(ColumnDef::new(Ads::Category).string().not_null())
                    .col(ColumnDef::new(Ads::Condition).string().not_null())
                    // Lowercased title and description, written by the engine.
                    .col(ColumnDef::new(Ads::SearchText).text().not_null())
                    .col(ColumnDef::new(Ads::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Ads::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ads-user_id")
                            .from(Ads::Table, Ads::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ads-user_id")
                    .table(Ads::Table)
                    .col(Ads::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ads-category-condition")
                    .table(Ads::Table)
                    .col(Ads::Category)
                    .col(Ads::Condition)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ads-created_at")
                    .table(Ads::Table)
                    .col(Ads::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ads-title")
                    .table(Ads::Table)
                    .col(Ads::Title)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Exchange proposals
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExchangeProposals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeProposals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::AdSenderId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::AdReceiverId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::Comment)
                            .string_len(500)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeProposals::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-exchange_proposals-ad_sender_id")
                            .from(ExchangeProposals::Table, ExchangeProposals::AdSenderId)
                            .to(Ads::Table, Ads::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-exchange_proposals-ad_receiver_id")
                            .from(ExchangeProposals::Table, ExchangeProposals::AdReceiverId)
                            .to(Ads::Table, Ads::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One proposal per ordered (sender, receiver) pair, even under races.
        manager
            .create_index(
                Index::create()
                    .name("uidx-exchange_proposals-sender-receiver")
                    .table(ExchangeProposals::Table)
                    .col(ExchangeProposals::AdSenderId)
                    .col(ExchangeProposals::AdReceiverId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-exchange_proposals-ad_receiver_id-status")
                    .table(ExchangeProposals::Table)
                    .col(ExchangeProposals::AdReceiverId)
                    .col(ExchangeProposals::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-exchange_proposals-created_at")
                    .table(ExchangeProposals::Table)
                    .col(ExchangeProposals::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ExchangeProposals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
