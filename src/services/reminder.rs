use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::UpcomingLesson;
use crate::models::timestamp;
use crate::services::lesson_service::LessonService;

/// One week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 3600;
/// One leap year.
pub const MAX_LOOKAHEAD_HOURS: i64 = 366 * 24;

/// Receives the lessons a reminder should go out for. Delivery (push,
/// email) lives behind this trait.
#[async_trait]
pub trait LessonNotifier: Send + Sync {
    async fn notify(&self, lesson: &UpcomingLesson) -> Result<(), AppError>;
}

pub struct TracingNotifier;

#[async_trait]
impl LessonNotifier for TracingNotifier {
    async fn notify(&self, lesson: &UpcomingLesson) -> Result<(), AppError> {
        info!(
            course_id = %lesson.course_id,
            user_id = %lesson.user_id,
            role = ?lesson.role,
            at = %timestamp::format_wire(&lesson.date_time),
            "upcoming lesson"
        );
        Ok(())
    }
}

/// Periodic reminder job: every tick, hands each participant's next lesson
/// to the notifier when it starts within the look-ahead window.
pub struct LessonReminderScheduler {
    lessons: LessonService,
    notifier: Arc<dyn LessonNotifier>,
    interval: Duration,
    lookahead: chrono::Duration,
}

impl LessonReminderScheduler {
    pub fn new(
        lessons: LessonService,
        notifier: Arc<dyn LessonNotifier>,
        interval_secs: u64,
        lookahead_hours: i64,
    ) -> Self {
        Self {
            lessons,
            notifier,
            interval: Duration::from_secs(interval_secs.clamp(1, MAX_INTERVAL_SECS)),
            lookahead: chrono::Duration::hours(lookahead_hours.clamp(1, MAX_LOOKAHEAD_HOURS)),
        }
    }

    pub async fn start(self) {
        info!("Starting lesson reminder scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            let now = self.lessons.now();
            match self.run_once(now).await {
                Ok(sent) => info!("Reminder tick completed - {} reminders", sent),
                Err(e) => warn!("Reminder tick failed: {:?}", e),
            }
        }
    }

    /// One pass over all courses. A failing course is logged and skipped.
    /// Returns how many reminders were handed to the notifier.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut sent = 0;
        for course_id in self.lessons.list_course_ids().await? {
            match self.remind_course(&course_id, now).await {
                Ok(n) => sent += n,
                Err(e) => warn!("Skipping reminders for course {}: {}", course_id, e),
            }
        }
        Ok(sent)
    }

    /// A lesson is handed to the notifier once; it is recorded only after
    /// the notifier accepted it, so a failed delivery is retried next tick.
    async fn remind_course(&self, course_id: &str, now: DateTime<Utc>) -> Result<usize, AppError> {
        let horizon = now + self.lookahead;
        let mut sent = 0;
        for lesson in self.lessons.unsent_reminders(course_id, now, horizon).await? {
            self.notifier.notify(&lesson).await?;
            self.lessons.mark_reminded(&lesson).await?;
            sent += 1;
        }
        Ok(sent)
    }
}
