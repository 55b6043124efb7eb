use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::db::repository;
use crate::error::AppError;
use crate::lessons::CancellationLedger;
use crate::models::Course;

/// Unit of work for one lesson operation.
///
/// Every read made through a snapshot goes through the same transaction, so
/// the course row, the partnership schedule and the cancellations are seen
/// together. Dropping a snapshot without calling [`commit`](Self::commit)
/// rolls it back.
///
/// Operations that write open the snapshot with [`begin_write`](Self::begin_write):
/// SQLite then takes the write lock up front and concurrent writers wait on
/// the busy timeout instead of failing on a lock upgrade.
pub struct LessonSnapshot {
    tx: Transaction<'static, Sqlite>,
}

impl LessonSnapshot {
    pub async fn begin(db: &SqlitePool) -> Result<Self, AppError> {
        Ok(Self { tx: db.begin().await? })
    }

    pub async fn begin_write(db: &SqlitePool) -> Result<Self, AppError> {
        Ok(Self { tx: db.begin_with("BEGIN IMMEDIATE").await? })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Course aggregate, or `NotFound` for an unknown id.
    pub async fn course(&mut self, course_id: &str) -> Result<Course, AppError> {
        repository::load_course(&mut self.tx, course_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("course {} not found", course_id)))
    }

    pub async fn ledger(&mut self, course_id: &str) -> Result<CancellationLedger, AppError> {
        let records = repository::fetch_cancellations(&mut *self.tx, course_id).await?;
        Ok(CancellationLedger::from_records(records))
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Ends a read-only snapshot.
    pub async fn release(self) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
