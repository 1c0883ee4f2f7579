use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

/// Fresh in-memory database with the full schema applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Fresh file-backed database with the full schema applied.
///
/// File-backed databases are what the dual-instance tests need: a second
/// connection to the same path behaves exactly like the other live process
/// during a rolling deploy.
pub async fn setup_file_db(path: &Path) -> DatabaseConnection {
    let db = connect_file_db(path).await;

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Additional connection to an existing file-backed database, without
/// touching the schema. Simulates the second deployment instance.
pub async fn connect_file_db(path: &Path) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    Database::connect(&url)
        .await
        .expect("Failed to connect to file db")
}
