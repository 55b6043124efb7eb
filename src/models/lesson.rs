use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PartnershipScheduleEntry {
    pub course_id: String,
    #[sqlx(try_from = "i64")]
    pub lesson_index: u32,
    pub mentor_id: String,
}

/// Lesson index to responsible mentor, for one partnership course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnershipSchedule {
    owners: BTreeMap<u32, String>,
}

impl PartnershipSchedule {
    pub fn from_entries(entries: impl IntoIterator<Item = PartnershipScheduleEntry>) -> Self {
        Self {
            owners: entries
                .into_iter()
                .map(|e| (e.lesson_index, e.mentor_id))
                .collect(),
        }
    }

    pub fn owner(&self, lesson_index: u32) -> Option<&str> {
        self.owners.get(&lesson_index).map(String::as_str)
    }

    pub fn entries(&self, course_id: &str) -> Vec<PartnershipScheduleEntry> {
        self.owners
            .iter()
            .map(|(index, mentor)| PartnershipScheduleEntry {
                course_id: course_id.to_string(),
                lesson_index: *index,
                mentor_id: mentor.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub course_id: String,
    pub user_id: String,
    #[serde(with = "timestamp::wire")]
    pub lesson_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CancellationRow {
    pub course_id: String,
    pub user_id: String,
    pub lesson_date_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Mentor,
    Student,
}

/// Next lesson a participant still has ahead of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingLesson {
    pub course_id: String,
    pub user_id: String,
    pub role: ParticipantRole,
    #[serde(with = "timestamp::wire")]
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextLessonResponse {
    #[serde(with = "timestamp::wire_option")]
    pub next_lesson_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEndResponse {
    #[serde(with = "timestamp::wire")]
    pub end_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelLessonRequest {
    pub user_id: String,
    #[serde(with = "timestamp::wire")]
    pub lesson_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleEntryRequest {
    pub mentor_id: String,
}
