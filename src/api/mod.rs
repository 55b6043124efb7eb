use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::lessons::Participant;
use crate::models::*;
use crate::state::AppState;

#[derive(Deserialize)]
struct NextLessonParams {
    user_id: String,
    role: ParticipantRole,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(upsert_user))
        .route("/users/{id}", get(get_user))
        .route("/course-types", get(list_course_types))
        .route("/courses", post(add_course))
        .route("/courses/{id}", get(get_course))
        .route("/courses/{id}/end", get(get_course_end))
        .route("/courses/{id}/next-lesson", get(get_next_lesson))
        .route("/courses/{id}/cancellations", post(cancel_lesson))
        .route(
            "/courses/{id}/partnership-schedule",
            get(get_partnership_schedule).post(add_partnership_schedule),
        )
        .route("/courses/{id}/partnership-schedule/{index}", put(update_partnership_schedule_entry))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn upsert_user(
    State(state): State<AppState>,
    Json(user): Json<User>,
) -> Result<Json<User>, AppError> {
    repository::upsert_user(&state.db, &user).await?;
    Ok(Json(user))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = repository::find_user(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {} not found", id)))?;
    Ok(Json(user))
}

async fn list_course_types(State(state): State<AppState>) -> Result<Json<Vec<CourseType>>, AppError> {
    let types = repository::fetch_course_types(&state.db).await?;
    Ok(Json(types))
}

async fn add_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<CourseView>, AppError> {
    let course = state.lessons.add_course(req).await?;
    Ok(Json(CourseView::from(&course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseView>, AppError> {
    let course = state.lessons.fetch_course(&id).await?;
    Ok(Json(CourseView::from(&course)))
}

async fn get_course_end(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseEndResponse>, AppError> {
    let end_date_time = state.lessons.get_course_end_date_time(&id).await?;
    Ok(Json(CourseEndResponse { end_date_time }))
}

async fn get_next_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<NextLessonParams>,
) -> Result<Json<NextLessonResponse>, AppError> {
    let next_lesson_date_time = match Participant::new(params.role, &params.user_id) {
        Participant::Mentor(mentor_id) => {
            state.lessons.get_next_lesson_date_time_for_mentor(&id, mentor_id).await?
        }
        Participant::Student(student_id) => {
            state.lessons.get_next_lesson_date_time_for_student(&id, student_id).await?
        }
    };
    Ok(Json(NextLessonResponse { next_lesson_date_time }))
}

async fn cancel_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CancelLessonRequest>,
) -> Result<StatusCode, AppError> {
    state
        .lessons
        .cancel_next_lesson(&req.user_id, &id, req.lesson_date_time)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_partnership_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.lessons.add_mentor_partnership_schedule(&id).await?;
    Ok(StatusCode::CREATED)
}

async fn get_partnership_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PartnershipScheduleEntry>>, AppError> {
    let entries = state.lessons.get_mentor_partnership_schedule(&id).await?;
    Ok(Json(entries))
}

async fn update_partnership_schedule_entry(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, u32)>,
    Json(req): Json<UpdateScheduleEntryRequest>,
) -> Result<StatusCode, AppError> {
    let entry = PartnershipScheduleEntry {
        course_id: id,
        lesson_index: index,
        mentor_id: req.mentor_id,
    };
    state.lessons.update_mentor_partnership_schedule_entry(entry).await?;
    Ok(StatusCode::NO_CONTENT)
}
