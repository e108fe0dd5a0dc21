use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BtcDominance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BtcDominance::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BtcDominance::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(BtcDominance::BtcDominance)
                            .double()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Window queries scan by time
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_btc_dominance_timestamp")
                    .table(BtcDominance::Table)
                    .col(BtcDominance::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BtcDominance::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BtcDominance {
    Table,
    Id,
    Timestamp,
    BtcDominance,
}
