use chrono::{DateTime, Duration, Months, Utc};

use crate::error::AppError;
use crate::models::Course;

/// Days added to the nominal end of every course.
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// `start + duration_months + 3 days`. Month addition clamps to the last
/// day of the target month.
pub fn end_date_time(start: DateTime<Utc>, duration_months: u32) -> Result<DateTime<Utc>, AppError> {
    start
        .checked_add_months(Months::new(duration_months))
        .map(|end| end + Duration::days(GRACE_PERIOD_DAYS))
        .ok_or_else(|| AppError::validation(format!("course end out of range ({} months)", duration_months)))
}

pub fn course_start(course: &Course) -> Result<DateTime<Utc>, AppError> {
    course
        .start_date_time
        .ok_or_else(|| AppError::validation(format!("course {} has no start date", course.id)))
}

pub fn course_end_date_time(course: &Course) -> Result<DateTime<Utc>, AppError> {
    let course_type = course
        .course_type
        .as_ref()
        .ok_or_else(|| AppError::validation(format!("course {} has no course type", course.id)))?;
    end_date_time(course_start(course)?, course_type.duration_months)
}

/// Lesson `index` of a course starting at `start`. Lesson 1 is one week
/// after the start.
pub fn occurrence_date_time(start: DateTime<Utc>, index: u32) -> DateTime<Utc> {
    start + Duration::weeks(i64::from(index))
}

/// Largest index whose lesson still falls on or before `end`.
pub fn last_occurrence_index(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if end <= start {
        return 0;
    }
    u32::try_from((end - start).num_weeks()).unwrap_or(u32::MAX)
}

/// Index of the first lesson strictly after `now`, never below 1.
pub fn first_index_after(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    if now < start {
        return 1;
    }
    let elapsed = u32::try_from((now - start).num_weeks()).unwrap_or(u32::MAX);
    elapsed.saturating_add(1).max(1)
}

/// Inverse of [`occurrence_date_time`]: `Some(n)` when `at` is exactly a
/// whole number (≥ 1) of weeks after `start`.
pub fn occurrence_index_of(start: DateTime<Utc>, at: DateTime<Utc>) -> Option<u32> {
    let offset = at - start;
    let week = Duration::weeks(1);
    if offset < week {
        return None;
    }
    let weeks = offset.num_weeks();
    if start + Duration::weeks(weeks) != at {
        return None;
    }
    u32::try_from(weeks).ok()
}
