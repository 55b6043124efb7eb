mod common;

use chrono::Duration;
use common::{course_request, days, service_at, setup_test_db, t};
use mentorship::error::AppError;
use mentorship::models::{MentorConfig, PartnershipScheduleEntry};

#[tokio::test]
async fn test_next_lesson_without_cancellations() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam", "kim"]))
        .await
        .expect("Failed to add course");

    let next = service
        .get_next_lesson_date_time_for_mentor(&course.id, "mia")
        .await
        .expect("Failed to resolve");
    assert_eq!(next, Some(days(7)));
}

#[tokio::test]
async fn test_mentor_cancellation_moves_next_lesson() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    service
        .cancel_next_lesson("mia", &course.id, days(7))
        .await
        .expect("Failed to cancel");

    let mentor_next = service
        .get_next_lesson_date_time_for_mentor(&course.id, "mia")
        .await
        .expect("Failed to resolve");
    let student_next = service
        .get_next_lesson_date_time_for_student(&course.id, "sam")
        .await
        .expect("Failed to resolve");
    assert_eq!(mentor_next, Some(days(14)));
    assert_eq!(student_next, Some(days(14)));
}

#[tokio::test]
async fn test_consecutive_mentor_cancellations() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    for week in 1..=3 {
        service
            .cancel_next_lesson("mia", &course.id, days(7 * week))
            .await
            .expect("Failed to cancel");
    }

    let next = service
        .get_next_lesson_date_time_for_mentor(&course.id, "mia")
        .await
        .expect("Failed to resolve");
    assert_eq!(next, Some(days(28)));
}

#[tokio::test]
async fn test_all_students_canceling_skips_lesson_for_mentor() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam", "kim"]))
        .await
        .expect("Failed to add course");

    for student in ["sam", "kim"] {
        service
            .cancel_next_lesson(student, &course.id, days(7))
            .await
            .expect("Failed to cancel");
    }

    let next = service
        .get_next_lesson_date_time_for_mentor(&course.id, "mia")
        .await
        .expect("Failed to resolve");
    assert_eq!(next, Some(days(14)));
}

#[tokio::test]
async fn test_one_student_canceling_leaves_others_unaffected() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam", "kim", "ada"]))
        .await
        .expect("Failed to add course");

    service
        .cancel_next_lesson("sam", &course.id, days(7))
        .await
        .expect("Failed to cancel");

    let mentor = service.get_next_lesson_date_time_for_mentor(&course.id, "mia").await.unwrap();
    let other = service.get_next_lesson_date_time_for_student(&course.id, "kim").await.unwrap();
    let canceling = service.get_next_lesson_date_time_for_student(&course.id, "sam").await.unwrap();

    assert_eq!(mentor, Some(days(7)));
    assert_eq!(other, Some(days(7)));
    assert_eq!(canceling, Some(days(14)));
}

#[tokio::test]
async fn test_finished_course_has_no_next_lesson() {
    let pool = setup_test_db().await;
    let course = service_at(&pool, t())
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    let later = service_at(&pool, t() + Duration::weeks(13));
    assert_eq!(later.get_next_lesson_date_time_for_mentor(&course.id, "mia").await.unwrap(), None);
    assert_eq!(later.get_next_lesson_date_time_for_student(&course.id, "sam").await.unwrap(), None);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    service.cancel_next_lesson("mia", &course.id, days(7)).await.expect("first cancel");
    service.cancel_next_lesson("mia", &course.id, days(7)).await.expect("second cancel");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_cancellations")
        .fetch_one(&pool)
        .await
        .expect("Failed to count");
    assert_eq!(count, 1);
    assert_eq!(
        service.get_next_lesson_date_time_for_mentor(&course.id, "mia").await.unwrap(),
        Some(days(14))
    );
}

#[tokio::test]
async fn test_cancellation_is_stamped_with_service_clock() {
    let pool = setup_test_db().await;
    let course = service_at(&pool, t())
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    service_at(&pool, days(2))
        .cancel_next_lesson("sam", &course.id, days(7))
        .await
        .expect("Failed to cancel");

    let created_at: String = sqlx::query_scalar("SELECT created_at FROM lesson_cancellations")
        .fetch_one(&pool)
        .await
        .expect("Failed to read created_at");
    assert_eq!(created_at, "2026-01-07T17:00:00Z");
}

#[tokio::test]
async fn test_cancel_outside_course_range_is_state_error() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    let misaligned = service.cancel_next_lesson("sam", &course.id, days(8)).await;
    assert!(matches!(misaligned, Err(AppError::State(_))));

    let after_end = service.cancel_next_lesson("sam", &course.id, days(7 * 14)).await;
    assert!(matches!(after_end, Err(AppError::State(_))));

    let stranger = service.cancel_next_lesson("ada", &course.id, days(7)).await;
    assert!(matches!(stranger, Err(AppError::NotFound(_))));

    let unknown = service.cancel_next_lesson("sam", "no-such-course", days(7)).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_course_end_date_time() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-6m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    let end = service.get_course_end_date_time(&course.id).await.expect("Failed to compute end");
    assert_eq!(end, t().checked_add_months(chrono::Months::new(6)).unwrap() + Duration::days(3));
}

#[tokio::test]
async fn test_partnership_default_schedule() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("partner-3m", &["mia", "leo"], &["sam"]))
        .await
        .expect("Failed to add course");

    assert!(matches!(course.mentors, Some(MentorConfig::Partnership { .. })));
    assert_eq!(course.partnership_split, Some(7));

    let schedule = service
        .get_mentor_partnership_schedule(&course.id)
        .await
        .expect("Failed to fetch schedule");
    assert_eq!(schedule.len(), 13);
    assert!(schedule[..7].iter().all(|e| e.mentor_id == "mia"));
    assert!(schedule[7..].iter().all(|e| e.mentor_id == "leo"));

    let primary = service.get_next_lesson_date_time_for_mentor(&course.id, "mia").await.unwrap();
    let secondary = service.get_next_lesson_date_time_for_mentor(&course.id, "leo").await.unwrap();
    assert_eq!(primary, Some(days(7)));
    assert_eq!(secondary, Some(days(7 * 8)));
}

#[tokio::test]
async fn test_reassigning_one_lesson_changes_only_that_lesson() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("partner-3m", &["mia", "leo"], &["sam"]))
        .await
        .expect("Failed to add course");
    let before = service.get_mentor_partnership_schedule(&course.id).await.unwrap();

    service
        .update_mentor_partnership_schedule_entry(PartnershipScheduleEntry {
            course_id: course.id.clone(),
            lesson_index: 2,
            mentor_id: "leo".to_string(),
        })
        .await
        .expect("Failed to reassign");

    let after = service.get_mentor_partnership_schedule(&course.id).await.unwrap();
    for (old, new) in before.iter().zip(after.iter()) {
        if old.lesson_index == 2 {
            assert_eq!(new.mentor_id, "leo");
        } else {
            assert_eq!(old, new);
        }
    }
    assert_eq!(
        service.get_next_lesson_date_time_for_mentor(&course.id, "leo").await.unwrap(),
        Some(days(14))
    );

    // re-saving the same roster keeps the manual reassignment
    let mut resave = common::course_request("partner-3m", &["mia", "leo"], &["sam", "kim"]);
    resave.id = Some(course.id.clone());
    service.add_course(resave).await.expect("Failed to update course");
    let kept = service.get_mentor_partnership_schedule(&course.id).await.unwrap();
    assert_eq!(kept, after);
}

#[tokio::test]
async fn test_reassignment_errors() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let single = service
        .add_course(course_request("single-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");
    let partnered = service
        .add_course(course_request("partner-3m", &["mia", "leo"], &["sam"]))
        .await
        .expect("Failed to add course");

    let not_partnership = service
        .update_mentor_partnership_schedule_entry(PartnershipScheduleEntry {
            course_id: single.id.clone(),
            lesson_index: 1,
            mentor_id: "mia".to_string(),
        })
        .await;
    assert!(matches!(not_partnership, Err(AppError::NotFound(_))));

    let beyond_end = service
        .update_mentor_partnership_schedule_entry(PartnershipScheduleEntry {
            course_id: partnered.id.clone(),
            lesson_index: 14,
            mentor_id: "mia".to_string(),
        })
        .await;
    assert!(matches!(beyond_end, Err(AppError::NotFound(_))));

    let outsider = service
        .update_mentor_partnership_schedule_entry(PartnershipScheduleEntry {
            course_id: partnered.id.clone(),
            lesson_index: 1,
            mentor_id: "sam".to_string(),
        })
        .await;
    assert!(matches!(outsider, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_add_mentor_partnership_schedule_resets_reassignments() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("partner-6m", &["mia", "leo"], &["sam"]))
        .await
        .expect("Failed to add course");
    let default = service.get_mentor_partnership_schedule(&course.id).await.unwrap();

    service
        .update_mentor_partnership_schedule_entry(PartnershipScheduleEntry {
            course_id: course.id.clone(),
            lesson_index: 1,
            mentor_id: "leo".to_string(),
        })
        .await
        .expect("Failed to reassign");
    service
        .add_mentor_partnership_schedule(&course.id)
        .await
        .expect("Failed to rebuild schedule");

    let rebuilt = service.get_mentor_partnership_schedule(&course.id).await.unwrap();
    assert_eq!(rebuilt, default);
}

#[tokio::test]
async fn test_partnership_schedule_requires_two_mentors() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("partner-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    let result = service.add_mentor_partnership_schedule(&course.id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(service.get_mentor_partnership_schedule(&course.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_attaching_second_mentor_builds_schedule() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("partner-3m", &["mia"], &["sam"]))
        .await
        .expect("Failed to add course");

    let mut update = course_request("partner-3m", &["mia", "leo"], &["sam"]);
    update.id = Some(course.id.clone());
    service.add_course(update).await.expect("Failed to attach mentor");

    let schedule = service.get_mentor_partnership_schedule(&course.id).await.unwrap();
    assert_eq!(schedule.len(), 13);
    assert_eq!(schedule[0].mentor_id, "mia");
    assert_eq!(schedule[12].mentor_id, "leo");
}

#[tokio::test]
async fn test_explicit_split_is_used() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let mut req = course_request("partner-3m", &["mia", "leo"], &["sam"]);
    req.partnership_split = Some(3);
    let course = service.add_course(req).await.expect("Failed to add course");

    let secondary = service.get_next_lesson_date_time_for_mentor(&course.id, "leo").await.unwrap();
    assert_eq!(secondary, Some(days(28)));
}

#[tokio::test]
async fn test_add_course_validation() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());

    let three = service.add_course(course_request("partner-3m", &["mia", "leo", "sam"], &[])).await;
    assert!(matches!(three, Err(AppError::Validation(_))));

    let no_partner = service.add_course(course_request("single-3m", &["mia", "leo"], &["sam"])).await;
    assert!(matches!(no_partner, Err(AppError::Validation(_))));

    let student_as_mentor = service.add_course(course_request("single-3m", &["sam"], &[])).await;
    assert!(matches!(student_as_mentor, Err(AppError::NotFound(_))));

    let unknown_student = service.add_course(course_request("single-3m", &["mia"], &["nobody"])).await;
    assert!(matches!(unknown_student, Err(AppError::NotFound(_))));

    let unknown_type = service.add_course(course_request("weekly-forever", &["mia"], &["sam"])).await;
    assert!(matches!(unknown_type, Err(AppError::NotFound(_))));

    let mut unknown_id = course_request("single-3m", &["mia"], &["sam"]);
    unknown_id.id = Some("missing".to_string());
    assert!(matches!(service.add_course(unknown_id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_query_without_mentor_is_validation_error() {
    let pool = setup_test_db().await;
    let service = service_at(&pool, t());
    let course = service
        .add_course(course_request("single-3m", &[], &["sam"]))
        .await
        .expect("Failed to add course");

    let result = service.get_next_lesson_date_time_for_mentor(&course.id, "mia").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
