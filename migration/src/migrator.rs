use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202509220001_create_teachers::Migration),
            Box::new(migrations::m202509220002_create_attendance_sessions::Migration),
            Box::new(migrations::m202509220003_create_admin_logs::Migration),
        ]
    }
}
