use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{LessonSnapshot, repository};
use crate::error::AppError;
use crate::lessons::resolver::{self, Participant};
use crate::lessons::{lifecycle, partnership};
use crate::models::timestamp;
use crate::models::{
    CancellationRecord, Course, CourseRow, MentorConfig, NewCourseRequest, ParticipantRole,
    PartnershipScheduleEntry, UpcomingLesson,
};

/// Course and lesson operations. Reads run inside a [`LessonSnapshot`];
/// every write runs in its own short transaction.
#[derive(Clone)]
pub struct LessonService {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl LessonService {
    pub fn new(db: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn add_course(&self, req: NewCourseRequest) -> Result<Course, AppError> {
        validate_roster(&req)?;

        let mut uow = LessonSnapshot::begin_write(&self.db).await?;
        let conn = uow.conn();

        let course_type = match &req.course_type_id {
            Some(type_id) => Some(
                repository::find_course_type(&mut *conn, type_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("course type {} not found", type_id)))?,
            ),
            None => None,
        };
        if req.mentors.len() == 2 && course_type.as_ref().is_some_and(|t| !t.is_with_partner) {
            return Err(AppError::validation("course type does not allow a second mentor"));
        }
        for mentor_id in &req.mentors {
            check_directory_role(&mut *conn, mentor_id, ParticipantRole::Mentor).await?;
        }
        for student_id in &req.students {
            check_directory_role(&mut *conn, student_id, ParticipantRole::Student).await?;
        }

        let previous = match &req.id {
            Some(id) => Some(
                repository::load_course(&mut *conn, id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("course {} not found", id)))?,
            ),
            None => None,
        };
        let course_id = req.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

        let timeline_changed = previous.as_ref().is_some_and(|p| {
            p.start_date_time != req.start_date_time
                || p.course_type.as_ref().map(|t| &t.id) != req.course_type_id.as_ref()
        });
        let mentors_changed = previous.as_ref().is_none_or(|p| {
            p.mentors
                .as_ref()
                .map(|m| m.mentor_ids())
                .unwrap_or_default()
                != req.mentors.iter().map(String::as_str).collect::<Vec<_>>()
        });
        let partnership_split = match (req.partnership_split, &previous) {
            (Some(split), _) => Some(split),
            (None, Some(p)) if !timeline_changed => p.partnership_split,
            _ => None,
        };

        let row = CourseRow {
            id: course_id.clone(),
            course_type_id: req.course_type_id.clone(),
            start_date_time: req.start_date_time.as_ref().map(timestamp::to_storage),
            partnership_split: partnership_split.map(i64::from),
            updated_at: timestamp::to_storage(&self.now()),
        };
        repository::upsert_course_row(&mut *conn, &row).await?;
        repository::replace_mentors(&mut *conn, &course_id, &req.mentors).await?;
        repository::replace_students(&mut *conn, &course_id, &req.students).await?;

        if req.mentors.len() < 2 {
            repository::delete_schedule(&mut *conn, &course_id).await?;
        } else {
            let has_schedule = !repository::fetch_schedule(&mut *conn, &course_id).await?.is_empty();
            let explicit_split_changed = previous
                .as_ref()
                .is_some_and(|p| req.partnership_split.is_some() && p.partnership_split != req.partnership_split);
            if !has_schedule || mentors_changed || timeline_changed || explicit_split_changed {
                let course = uow.course(&course_id).await?;
                if course.course_type.is_some() && course.start_date_time.is_some() {
                    write_default_schedule(uow.conn(), &course).await?;
                } else {
                    debug!(course_id = %course_id, "partnership schedule deferred until type and start are set");
                }
            }
        }

        let course = uow.course(&course_id).await?;
        uow.commit().await?;

        info!(course_id = %course.id, created = previous.is_none(), "course saved");
        Ok(course)
    }

    pub async fn fetch_course(&self, course_id: &str) -> Result<Course, AppError> {
        let mut snapshot = LessonSnapshot::begin(&self.db).await?;
        let course = snapshot.course(course_id).await?;
        snapshot.release().await?;
        Ok(course)
    }

    pub async fn list_course_ids(&self) -> Result<Vec<String>, AppError> {
        Ok(repository::fetch_course_ids(&self.db).await?)
    }

    pub async fn get_next_lesson_date_time_for_mentor(
        &self,
        course_id: &str,
        mentor_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        self.next_lesson(course_id, Participant::Mentor(mentor_id), self.now())
            .await
    }

    pub async fn get_next_lesson_date_time_for_student(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        self.next_lesson(course_id, Participant::Student(student_id), self.now())
            .await
    }

    pub async fn next_lesson(
        &self,
        course_id: &str,
        participant: Participant<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let mut snapshot = LessonSnapshot::begin(&self.db).await?;
        let course = snapshot.course(course_id).await?;
        let ledger = snapshot.ledger(course_id).await?;
        let next = resolver::resolve(&course, &ledger, participant, now)?;
        snapshot.release().await?;

        debug!(
            course_id,
            user_id = participant.user_id(),
            next = ?next,
            "next lesson resolved"
        );
        Ok(next)
    }

    /// Next lesson of every mentor and student of a course, all read from a
    /// single snapshot. Participants with nothing left are omitted.
    pub async fn upcoming_lessons(
        &self,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<UpcomingLesson>, AppError> {
        let mut snapshot = LessonSnapshot::begin(&self.db).await?;
        let course = snapshot.course(course_id).await?;
        let ledger = snapshot.ledger(course_id).await?;
        snapshot.release().await?;

        let Some(mentors) = course.mentors.as_ref() else {
            return Ok(Vec::new());
        };
        let participants = mentors
            .mentor_ids()
            .into_iter()
            .map(|id| (ParticipantRole::Mentor, id))
            .chain(course.students.iter().map(|id| (ParticipantRole::Student, id.as_str())));

        let mut lessons = Vec::new();
        for (role, user_id) in participants {
            if let Some(date_time) = resolver::resolve(&course, &ledger, Participant::new(role, user_id), now)? {
                lessons.push(UpcomingLesson {
                    course_id: course.id.clone(),
                    user_id: user_id.to_string(),
                    role,
                    date_time,
                });
            }
        }
        Ok(lessons)
    }

    /// Upcoming lessons starting no later than `horizon` whose reminder has
    /// not been handed off yet.
    pub async fn unsent_reminders(
        &self,
        course_id: &str,
        now: DateTime<Utc>,
        horizon: DateTime<Utc>,
    ) -> Result<Vec<UpcomingLesson>, AppError> {
        let lessons = self.upcoming_lessons(course_id, now).await?;
        let sent: HashSet<(String, DateTime<Utc>)> = repository::fetch_sent_reminders(&self.db, course_id, &now)
            .await?
            .into_iter()
            .collect();

        Ok(lessons
            .into_iter()
            .filter(|l| l.date_time <= horizon && !sent.contains(&(l.user_id.clone(), l.date_time)))
            .collect())
    }

    pub async fn mark_reminded(&self, lesson: &UpcomingLesson) -> Result<bool, AppError> {
        Ok(repository::insert_reminder(&self.db, lesson, &self.now()).await?)
    }

    pub async fn cancel_next_lesson(
        &self,
        user_id: &str,
        course_id: &str,
        lesson_date_time: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut uow = LessonSnapshot::begin_write(&self.db).await?;
        let course = uow.course(course_id).await?;

        if !course.is_participant(user_id) {
            return Err(AppError::not_found(format!(
                "user {} does not take part in course {}",
                user_id, course_id
            )));
        }
        let start = lifecycle::course_start(&course)?;
        let end = lifecycle::course_end_date_time(&course)?;
        let Some(index) = lifecycle::occurrence_index_of(start, lesson_date_time) else {
            return Err(AppError::state(format!(
                "{} is not a lesson of course {}",
                timestamp::format_wire(&lesson_date_time),
                course_id
            )));
        };
        if lesson_date_time > end {
            return Err(AppError::state(format!(
                "lesson {} is after the end of course {}",
                index, course_id
            )));
        }

        let record = CancellationRecord {
            course_id: course_id.to_string(),
            user_id: user_id.to_string(),
            lesson_date_time,
        };
        let inserted = repository::insert_cancellation(uow.conn(), &record, &self.now()).await?;
        uow.commit().await?;

        info!(course_id, user_id, index, new = inserted, "lesson canceled");
        Ok(())
    }

    pub async fn add_mentor_partnership_schedule(&self, course_id: &str) -> Result<(), AppError> {
        let mut uow = LessonSnapshot::begin_write(&self.db).await?;
        let course = uow.course(course_id).await?;
        let split = write_default_schedule(uow.conn(), &course).await?;
        uow.commit().await?;

        info!(course_id, split, "partnership schedule built");
        Ok(())
    }

    pub async fn get_mentor_partnership_schedule(
        &self,
        course_id: &str,
    ) -> Result<Vec<PartnershipScheduleEntry>, AppError> {
        let course = self.fetch_course(course_id).await?;
        Ok(match &course.mentors {
            Some(MentorConfig::Partnership { schedule, .. }) => schedule.entries(course_id),
            _ => Vec::new(),
        })
    }

    pub async fn update_mentor_partnership_schedule_entry(
        &self,
        entry: PartnershipScheduleEntry,
    ) -> Result<(), AppError> {
        let mut uow = LessonSnapshot::begin_write(&self.db).await?;
        let course = uow.course(&entry.course_id).await?;
        partnership::check_reassignment(&course, &entry)?;

        if !repository::update_schedule_entry(uow.conn(), &entry).await? {
            return Err(AppError::not_found(format!(
                "no partnership schedule entry for lesson {} of course {}",
                entry.lesson_index, entry.course_id
            )));
        }
        uow.commit().await?;

        info!(
            course_id = %entry.course_id,
            lesson_index = entry.lesson_index,
            mentor_id = %entry.mentor_id,
            "partnership lesson reassigned"
        );
        Ok(())
    }

    pub async fn get_course_end_date_time(&self, course_id: &str) -> Result<DateTime<Utc>, AppError> {
        let course = self.fetch_course(course_id).await?;
        lifecycle::course_end_date_time(&course)
    }
}

/// Builds and stores the default schedule, persisting the split it used.
async fn write_default_schedule(conn: &mut SqliteConnection, course: &Course) -> Result<u32, AppError> {
    let schedule = partnership::build_default_schedule(course)?;
    repository::replace_schedule(&mut *conn, &course.id, &schedule.entries).await?;
    repository::set_partnership_split(&mut *conn, &course.id, Some(schedule.split)).await?;
    Ok(schedule.split)
}

fn validate_roster(req: &NewCourseRequest) -> Result<(), AppError> {
    if req.mentors.len() > 2 {
        return Err(AppError::validation("a course has at most two mentors"));
    }
    let mut seen = HashSet::new();
    for id in req.mentors.iter().chain(req.students.iter()) {
        if !seen.insert(id.as_str()) {
            return Err(AppError::validation(format!("user {} listed twice", id)));
        }
    }
    Ok(())
}

async fn check_directory_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role: ParticipantRole,
) -> Result<(), AppError> {
    let user = repository::find_user(&mut *conn, user_id).await?;
    match (user, role) {
        (Some(u), ParticipantRole::Mentor) if u.is_mentor => Ok(()),
        (Some(u), ParticipantRole::Student) if !u.is_mentor => Ok(()),
        (_, ParticipantRole::Mentor) => Err(AppError::not_found(format!("mentor {} not found", user_id))),
        (_, ParticipantRole::Student) => Err(AppError::not_found(format!("student {} not found", user_id))),
    }
}
