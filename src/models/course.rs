use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::lesson::PartnershipSchedule;
use super::timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseType {
    pub id: String,
    #[sqlx(try_from = "i64")]
    pub duration_months: u32,
    pub is_with_partner: bool,
}

/// Who teaches a course. A course either has one mentor owning every lesson
/// or two mentors splitting lessons through a persisted schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentorConfig {
    Single {
        mentor: String,
    },
    Partnership {
        primary: String,
        secondary: String,
        schedule: PartnershipSchedule,
    },
}

impl MentorConfig {
    pub fn mentor_ids(&self) -> Vec<&str> {
        match self {
            MentorConfig::Single { mentor } => vec![mentor.as_str()],
            MentorConfig::Partnership { primary, secondary, .. } => {
                vec![primary.as_str(), secondary.as_str()]
            }
        }
    }

    pub fn includes(&self, user_id: &str) -> bool {
        self.mentor_ids().contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub course_type: Option<CourseType>,
    pub mentors: Option<MentorConfig>,
    pub students: Vec<String>,
    pub start_date_time: Option<DateTime<Utc>>,
    /// Number of leading lessons owned by the primary mentor of a partnership.
    pub partnership_split: Option<u32>,
}

impl Course {
    pub fn is_student(&self, user_id: &str) -> bool {
        self.students.iter().any(|s| s == user_id)
    }

    pub fn is_mentor(&self, user_id: &str) -> bool {
        self.mentors.as_ref().is_some_and(|m| m.includes(user_id))
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.is_mentor(user_id) || self.is_student(user_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: String,
    pub course_type_id: Option<String>,
    pub start_date_time: Option<String>,
    pub partnership_split: Option<i64>,
    pub updated_at: String,
}

/// Create-or-update payload for the course aggregate. Without an `id` a new
/// course is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub course_type_id: Option<String>,
    #[serde(default)]
    pub mentors: Vec<String>,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default, with = "timestamp::wire_option")]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub partnership_split: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseView {
    pub id: String,
    pub course_type: Option<CourseType>,
    pub mentors: Vec<String>,
    pub students: Vec<String>,
    #[serde(with = "timestamp::wire_option")]
    pub start_date_time: Option<DateTime<Utc>>,
    pub partnership_split: Option<u32>,
}

impl From<&Course> for CourseView {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            course_type: course.course_type.clone(),
            mentors: course
                .mentors
                .as_ref()
                .map(|m| m.mentor_ids().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
            students: course.students.clone(),
            start_date_time: course.start_date_time,
            partnership_split: course.partnership_split,
        }
    }
}
