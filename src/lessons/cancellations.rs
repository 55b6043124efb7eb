use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::CancellationRecord;

/// Cancellation records of one course, as read inside a snapshot.
///
/// Records are append-only set members keyed by (user, lesson instant), so
/// loading the same record twice changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationLedger {
    records: HashSet<(String, DateTime<Utc>)>,
}

impl CancellationLedger {
    pub fn from_records(records: impl IntoIterator<Item = CancellationRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.user_id, r.lesson_date_time))
                .collect(),
        }
    }

    pub fn is_canceled_by(&self, user_id: &str, lesson_date_time: DateTime<Utc>) -> bool {
        self.records.contains(&(user_id.to_string(), lesson_date_time))
    }

    /// True when every enrolled student canceled the lesson. A course
    /// without students has nobody attending, so this holds vacuously.
    pub fn all_students_canceled(&self, students: &[String], lesson_date_time: DateTime<Utc>) -> bool {
        students
            .iter()
            .all(|student| self.is_canceled_by(student, lesson_date_time))
    }
}
