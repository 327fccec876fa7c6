use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Codes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Codes::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Codes::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Codes::RedeemedBy).big_integer())
                    .col(ColumnDef::new(Codes::RedeemedAt).timestamp_with_time_zone())
                    // used <=> redeemed_by and redeemed_at are both present
                    .check(Expr::cust(
                        "(used = (redeemed_by IS NOT NULL)) AND (used = (redeemed_at IS NOT NULL))",
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Codes::Table, Codes::RedeemedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Codes::Table)
                    .col(Codes::Used)
                    .name("idx_codes_used")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Codes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Codes {
    Table,
    Code,
    Used,
    RedeemedBy,
    RedeemedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
