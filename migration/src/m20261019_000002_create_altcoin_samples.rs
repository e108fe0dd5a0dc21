use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AltcoinSamples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AltcoinSamples::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AltcoinSamples::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(AltcoinSamples::AssetId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AltcoinSamples::Price)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AltcoinSamples::Volume)
                            .double()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_altcoin_samples_timestamp")
                    .table(AltcoinSamples::Table)
                    .col(AltcoinSamples::Timestamp)
                    .to_owned(),
            )
            .await?;

        // Per-asset lookups: (asset_id, timestamp)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_altcoin_samples_asset_time")
                    .table(AltcoinSamples::Table)
                    .col(AltcoinSamples::AssetId)
                    .col(AltcoinSamples::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AltcoinSamples::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AltcoinSamples {
    Table,
    Id,
    Timestamp,
    AssetId,
    Price,
    Volume,
}
