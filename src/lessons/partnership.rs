//! Lesson ownership for courses taught by two mentors.
//!
//! The default schedule gives the first contiguous block of lessons to the
//! primary mentor and the rest to the secondary. The block boundary (the
//! "split") is stored on the course the first time a schedule is built and
//! reused afterwards, so cancellations and reassignments never move it.

use tracing::warn;

use crate::error::AppError;
use crate::lessons::lifecycle;
use crate::models::{Course, MentorConfig, PartnershipScheduleEntry};

/// Course durations whose default split is known: half the lessons each,
/// the extra odd lesson going to the primary mentor.
pub const KNOWN_PARTNERSHIP_DURATIONS: [u32; 2] = [3, 6];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSchedule {
    pub split: u32,
    pub entries: Vec<PartnershipScheduleEntry>,
}

fn partners(course: &Course) -> Result<(&str, &str), AppError> {
    match &course.mentors {
        Some(MentorConfig::Partnership { primary, secondary, .. }) => Ok((primary, secondary)),
        _ => Err(AppError::validation(format!(
            "course {} does not have two mentors",
            course.id
        ))),
    }
}

/// Split to use when building the default schedule: the stored one if the
/// course has it, otherwise the default for a known duration.
pub fn resolve_split(course: &Course, last_index: u32) -> Result<u32, AppError> {
    if let Some(split) = course.partnership_split {
        if split > last_index {
            return Err(AppError::validation(format!(
                "partnership split {} exceeds the {} lessons of course {}",
                split, last_index, course.id
            )));
        }
        return Ok(split);
    }

    let months = course
        .course_type
        .as_ref()
        .map(|t| t.duration_months)
        .ok_or_else(|| AppError::validation(format!("course {} has no course type", course.id)))?;

    if !KNOWN_PARTNERSHIP_DURATIONS.contains(&months) {
        warn!(
            course_id = %course.id,
            duration_months = months,
            "no default partnership split for this duration; needs product clarification"
        );
        return Err(AppError::validation(format!(
            "course {} lasts {} months; an explicit partnership split is required",
            course.id, months
        )));
    }

    Ok(last_index.div_ceil(2))
}

pub fn build_default_schedule(course: &Course) -> Result<DefaultSchedule, AppError> {
    let (primary, secondary) = partners(course)?;
    let start = lifecycle::course_start(course)?;
    let end = lifecycle::course_end_date_time(course)?;
    let last_index = lifecycle::last_occurrence_index(start, end);
    let split = resolve_split(course, last_index)?;

    let entries = (1..=last_index)
        .map(|lesson_index| PartnershipScheduleEntry {
            course_id: course.id.clone(),
            lesson_index,
            mentor_id: (if lesson_index <= split { primary } else { secondary }).to_string(),
        })
        .collect();

    Ok(DefaultSchedule { split, entries })
}

/// Mentor responsible for lesson `lesson_index` of a partnership course.
pub fn owner_of(course: &Course, lesson_index: u32) -> Result<&str, AppError> {
    match &course.mentors {
        Some(MentorConfig::Partnership { schedule, .. }) => schedule.owner(lesson_index).ok_or_else(|| {
            AppError::not_found(format!(
                "no partnership schedule entry for lesson {} of course {}",
                lesson_index, course.id
            ))
        }),
        _ => Err(AppError::not_found(format!(
            "course {} is not a mentor partnership",
            course.id
        ))),
    }
}

/// Checks a reassignment before it is written: the course must be a
/// partnership, the mentor one of its two partners and the lesson scheduled.
pub fn check_reassignment(course: &Course, entry: &PartnershipScheduleEntry) -> Result<(), AppError> {
    let (primary, secondary) = match &course.mentors {
        Some(MentorConfig::Partnership { primary, secondary, .. }) => (primary, secondary),
        _ => {
            return Err(AppError::not_found(format!(
                "course {} is not a mentor partnership",
                course.id
            )));
        }
    };
    if entry.mentor_id != *primary && entry.mentor_id != *secondary {
        return Err(AppError::validation(format!(
            "mentor {} does not teach course {}",
            entry.mentor_id, course.id
        )));
    }
    owner_of(course, entry.lesson_index).map(|_| ())
}
