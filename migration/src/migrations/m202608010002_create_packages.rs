use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608010002_create_packages"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("packages"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("code")).string().not_null().unique_key())
                    .col(ColumnDef::new(Alias::new("recipient_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("address")).text().not_null())
                    .col(ColumnDef::new(Alias::new("phone")).string().not_null().default(""))
                    .col(ColumnDef::new(Alias::new("driver_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("status")).string().not_null())
                    .col(ColumnDef::new(Alias::new("pod_notes")).text().not_null().default(""))
                    .col(ColumnDef::new(Alias::new("non_delivery_reason")).string())
                    .col(ColumnDef::new(Alias::new("closed_at")).timestamp())
                    .col(ColumnDef::new(Alias::new("lat")).double())
                    .col(ColumnDef::new(Alias::new("lng")).double())
                    .col(ColumnDef::new(Alias::new("location_at")).timestamp())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_packages_driver_id")
                            .from(Alias::new("packages"), Alias::new("driver_id"))
                            .to(Alias::new("users"), Alias::new("id")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("packages")).to_owned())
            .await
    }
}
