pub mod course;
pub mod lesson;
pub mod timestamp;
pub mod user;

pub use course::{Course, CourseRow, CourseType, CourseView, MentorConfig, NewCourseRequest};
pub use lesson::{
    CancelLessonRequest, CancellationRecord, CancellationRow, CourseEndResponse, NextLessonResponse,
    ParticipantRole, PartnershipSchedule, PartnershipScheduleEntry, UpcomingLesson,
    UpdateScheduleEntryRequest,
};
pub use user::User;
