pub mod repository;
pub mod snapshot;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::AppError;

pub use snapshot::LessonSnapshot;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn migrate(db: &SqlitePool) -> Result<(), AppError> {
    MIGRATOR.run(db).await?;
    Ok(())
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
