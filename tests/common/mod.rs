#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mentorship::clock::FixedClock;
use mentorship::db::{self, repository};
use mentorship::models::{NewCourseRequest, User};
use mentorship::services::LessonService;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Course start used across the tests: a Monday evening in January.
pub fn t() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 17, 0, 0).unwrap()
}

pub fn days(n: i64) -> DateTime<Utc> {
    t() + Duration::days(n)
}

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    db::migrate(&pool).await.expect("Failed to run migrations");
    seed_directory(&pool).await;
    pool
}

/// File-backed database shared by several connections. Returns the pool and
/// the path to remove once the test is done.
pub async fn setup_file_db(max_connections: u32) -> (SqlitePool, PathBuf) {
    let path = std::env::temp_dir().join(format!("mentorship-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = db::connect(&url, max_connections)
        .await
        .expect("Failed to create database");

    db::migrate(&pool).await.expect("Failed to run migrations");
    seed_directory(&pool).await;
    (pool, path)
}

pub async fn remove_file_db(pool: SqlitePool, path: PathBuf) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

async fn seed_directory(pool: &SqlitePool) {
    for (id, is_mentor) in [
        ("mia", true),
        ("leo", true),
        ("sam", false),
        ("kim", false),
        ("ada", false),
    ] {
        let user = User {
            id: id.to_string(),
            name: id.to_uppercase(),
            is_mentor,
        };
        repository::upsert_user(pool, &user).await.expect("Failed to insert user");
    }
}

pub fn service_at(pool: &SqlitePool, now: DateTime<Utc>) -> LessonService {
    LessonService::new(pool.clone(), Arc::new(FixedClock::new(now)))
}

pub fn course_request(course_type: &str, mentors: &[&str], students: &[&str]) -> NewCourseRequest {
    NewCourseRequest {
        id: None,
        course_type_id: Some(course_type.to_string()),
        mentors: mentors.iter().map(|s| s.to_string()).collect(),
        students: students.iter().map(|s| s.to_string()).collect(),
        start_date_time: Some(t()),
        partnership_split: None,
    }
}
