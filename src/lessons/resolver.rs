//! Next pending lesson for a mentor or a student.
//!
//! Lessons are walked week by week from the first one after `now` up to the
//! course end. Each lesson is classified against the participant asking and
//! the first pending one wins.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::AppError;
use crate::lessons::cancellations::CancellationLedger;
use crate::lessons::{lifecycle, partnership};
use crate::models::{Course, MentorConfig, ParticipantRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant<'a> {
    Mentor(&'a str),
    Student(&'a str),
}

impl<'a> Participant<'a> {
    pub fn new(role: ParticipantRole, user_id: &'a str) -> Self {
        match role {
            ParticipantRole::Mentor => Participant::Mentor(user_id),
            ParticipantRole::Student => Participant::Student(user_id),
        }
    }

    pub fn user_id(&self) -> &'a str {
        match *self {
            Participant::Mentor(id) | Participant::Student(id) => id,
        }
    }
}

/// How a single lesson looks to the participant asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceState {
    /// Partnership lesson taught by the other mentor.
    OwnedByOther,
    /// The responsible mentor canceled; nobody attends.
    CanceledByMentor,
    /// Every student canceled; the mentor is off too.
    CanceledByAllStudents,
    /// The asking student canceled this lesson for themselves only.
    CanceledByStudent,
    Pending,
}

/// Mentor owning lesson `index`: the only mentor, or the partnership
/// schedule's entry.
fn responsible_mentor(course: &Course, index: u32) -> Result<&str, AppError> {
    match &course.mentors {
        Some(MentorConfig::Single { mentor }) => Ok(mentor),
        Some(MentorConfig::Partnership { .. }) => partnership::owner_of(course, index),
        None => Err(AppError::validation(format!("course {} has no mentor", course.id))),
    }
}

pub fn classify(
    course: &Course,
    ledger: &CancellationLedger,
    participant: Participant<'_>,
    index: u32,
    lesson_date_time: DateTime<Utc>,
) -> Result<OccurrenceState, AppError> {
    let owner = responsible_mentor(course, index)?;

    if let Participant::Mentor(mentor_id) = participant {
        if mentor_id != owner {
            return Ok(OccurrenceState::OwnedByOther);
        }
    }
    if ledger.is_canceled_by(owner, lesson_date_time) {
        return Ok(OccurrenceState::CanceledByMentor);
    }
    if ledger.all_students_canceled(&course.students, lesson_date_time) {
        return Ok(OccurrenceState::CanceledByAllStudents);
    }
    if let Participant::Student(student_id) = participant {
        if ledger.is_canceled_by(student_id, lesson_date_time) {
            return Ok(OccurrenceState::CanceledByStudent);
        }
    }
    Ok(OccurrenceState::Pending)
}

fn check_participant(course: &Course, participant: Participant<'_>) -> Result<(), AppError> {
    if course.mentors.is_none() {
        return Err(AppError::validation(format!("course {} has no mentor", course.id)));
    }
    match participant {
        Participant::Mentor(id) if !course.is_mentor(id) => Err(AppError::not_found(format!(
            "mentor {} does not teach course {}",
            id, course.id
        ))),
        Participant::Student(id) if !course.is_student(id) => Err(AppError::not_found(format!(
            "student {} is not enrolled in course {}",
            id, course.id
        ))),
        _ => Ok(()),
    }
}

/// First lesson after `now` that is still pending for `participant`, or
/// `None` when the course ends before one comes up.
pub fn resolve(
    course: &Course,
    ledger: &CancellationLedger,
    participant: Participant<'_>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    check_participant(course, participant)?;

    let start = lifecycle::course_start(course)?;
    let end = lifecycle::course_end_date_time(course)?;

    let mut index = lifecycle::first_index_after(start, now);
    loop {
        let lesson_date_time = lifecycle::occurrence_date_time(start, index);
        if lesson_date_time > end {
            return Ok(None);
        }

        match classify(course, ledger, participant, index, lesson_date_time)? {
            OccurrenceState::Pending => return Ok(Some(lesson_date_time)),
            skipped => {
                trace!(course_id = %course.id, index, state = ?skipped, "lesson skipped");
            }
        }
        index += 1;
    }
}
