pub mod lesson_service;
pub mod reminder;

pub use lesson_service::LessonService;
pub use reminder::{LessonNotifier, LessonReminderScheduler, TracingNotifier};
