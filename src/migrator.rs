use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_trays_table::Migration),
            Box::new(m20240601_000002_create_material_locations_table::Migration),
        ]
    }
}

mod m20240601_000001_create_trays_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_trays_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Trays::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Trays::Id)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Trays::Description).string().null())
                        .col(ColumnDef::new(Trays::Capacity).integer().not_null())
                        .col(
                            ColumnDef::new(Trays::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Trays::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Trays::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Trays {
        Table,
        Id,
        Description,
        Capacity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_material_locations_table {

    use super::m20240601_000001_create_trays_table::Trays;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_material_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaterialLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialLocations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MaterialLocations::TrayId)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialLocations::SlotIndex)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialLocations::ItemId).string().null())
                        .col(
                            ColumnDef::new(MaterialLocations::Status)
                                .string_len(20)
                                .not_null()
                                .default("empty"),
                        )
                        .col(
                            ColumnDef::new(MaterialLocations::ProcessInfo)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(MaterialLocations::TaskId).string().null())
                        .col(
                            ColumnDef::new(MaterialLocations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_material_locations_tray_id")
                                .from(MaterialLocations::Table, MaterialLocations::TrayId)
                                .to(Trays::Table, Trays::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One record per (tray, slot index)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("ux_material_locations_tray_slot")
                        .table(MaterialLocations::Table)
                        .col(MaterialLocations::TrayId)
                        .col(MaterialLocations::SlotIndex)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_locations_item_id")
                        .table(MaterialLocations::Table)
                        .col(MaterialLocations::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_locations_status")
                        .table(MaterialLocations::Table)
                        .col(MaterialLocations::Status)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MaterialLocations {
        Table,
        Id,
        TrayId,
        SlotIndex,
        ItemId,
        Status,
        ProcessInfo,
        TaskId,
        UpdatedAt,
    }
}
