pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260815_000001_initial_schema;
mod m20260818_000001_withdrawal_allocations;
mod m20260820_000001_notification_outbox;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_initial_schema::Migration),
            Box::new(m20260818_000001_withdrawal_allocations::Migration),
            Box::new(m20260820_000001_notification_outbox::Migration),
        ]
    }
}
