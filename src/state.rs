use sqlx::SqlitePool;

use crate::services::LessonService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub lessons: LessonService,
}
