pub use sea_orm_migration::prelude::*;

mod m20251018_000001_create_auth_tables;
mod m20251018_000002_create_generation_tables;
mod m20251018_000003_create_map_tables;
mod m20251018_000004_create_geography_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251018_000001_create_auth_tables::Migration),
            Box::new(m20251018_000002_create_generation_tables::Migration),
            Box::new(m20251018_000003_create_map_tables::Migration),
            Box::new(m20251018_000004_create_geography_catalog::Migration),
        ]
    }
}
