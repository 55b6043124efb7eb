use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::models::timestamp;
use crate::models::{
    CancellationRecord, CancellationRow, Course, CourseRow, CourseType, MentorConfig,
    PartnershipSchedule, PartnershipScheduleEntry, UpcomingLesson, User,
};

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    timestamp::from_storage(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub async fn find_user<'e, E>(db: E, id: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT id, name, is_mentor FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn upsert_user<'e, E>(db: E, user: &User) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO users (id, name, is_mentor) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, is_mentor = excluded.is_mentor",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(user.is_mentor)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_course_types<'e, E>(db: E) -> Result<Vec<CourseType>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CourseType>(
        "SELECT id, duration_months, is_with_partner FROM course_types ORDER BY duration_months, is_with_partner",
    )
    .fetch_all(db)
    .await
}

pub async fn find_course_type<'e, E>(db: E, id: &str) -> Result<Option<CourseType>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CourseType>(
        "SELECT id, duration_months, is_with_partner FROM course_types WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_course_ids<'e, E>(db: E) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>("SELECT id FROM courses ORDER BY updated_at DESC")
        .fetch_all(db)
        .await
}

pub async fn find_course_row<'e, E>(db: E, id: &str) -> Result<Option<CourseRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CourseRow>(
        "SELECT id, course_type_id, start_date_time, partnership_split, updated_at FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn upsert_course_row(conn: &mut SqliteConnection, course: &CourseRow) -> Result<(), sqlx::Error> {
    match find_course_row(&mut *conn, &course.id).await? {
        Some(_) => {
            sqlx::query(
                "UPDATE courses SET course_type_id = ?, start_date_time = ?, partnership_split = ?, updated_at = ? WHERE id = ?"
            )
            .bind(&course.course_type_id)
            .bind(&course.start_date_time)
            .bind(course.partnership_split)
            .bind(&course.updated_at)
            .bind(&course.id)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO courses (id, course_type_id, start_date_time, partnership_split, updated_at) VALUES (?, ?, ?, ?, ?)"
            )
            .bind(&course.id)
            .bind(&course.course_type_id)
            .bind(&course.start_date_time)
            .bind(course.partnership_split)
            .bind(&course.updated_at)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

pub async fn set_partnership_split<'e, E>(db: E, course_id: &str, split: Option<u32>) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE courses SET partnership_split = ? WHERE id = ?")
        .bind(split.map(i64::from))
        .bind(course_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn fetch_mentor_ids<'e, E>(db: E, course_id: &str) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>(
        "SELECT mentor_id FROM course_mentors WHERE course_id = ? ORDER BY position",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_student_ids<'e, E>(db: E, course_id: &str) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>(
        "SELECT student_id FROM course_students WHERE course_id = ? ORDER BY rowid",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// Replaces the mentor list; position 0 is the primary mentor.
pub async fn replace_mentors(
    conn: &mut SqliteConnection,
    course_id: &str,
    mentor_ids: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM course_mentors WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for (position, mentor_id) in mentor_ids.iter().enumerate() {
        sqlx::query("INSERT INTO course_mentors (course_id, mentor_id, position) VALUES (?, ?, ?)")
            .bind(course_id)
            .bind(mentor_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn replace_students(
    conn: &mut SqliteConnection,
    course_id: &str,
    student_ids: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM course_students WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for student_id in student_ids {
        sqlx::query("INSERT INTO course_students (course_id, student_id) VALUES (?, ?)")
            .bind(course_id)
            .bind(student_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn fetch_schedule<'e, E>(db: E, course_id: &str) -> Result<Vec<PartnershipScheduleEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PartnershipScheduleEntry>(
        "SELECT course_id, lesson_index, mentor_id FROM mentor_partnership_schedule WHERE course_id = ? ORDER BY lesson_index",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn delete_schedule<'e, E>(db: E, course_id: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM mentor_partnership_schedule WHERE course_id = ?")
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result)
}

pub async fn replace_schedule(
    conn: &mut SqliteConnection,
    course_id: &str,
    entries: &[PartnershipScheduleEntry],
) -> Result<(), sqlx::Error> {
    delete_schedule(&mut *conn, course_id).await?;

    for entry in entries {
        sqlx::query(
            "INSERT INTO mentor_partnership_schedule (course_id, lesson_index, mentor_id) VALUES (?, ?, ?)",
        )
        .bind(course_id)
        .bind(i64::from(entry.lesson_index))
        .bind(&entry.mentor_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Rewrites one schedule row. Returns false when no row exists for the index.
pub async fn update_schedule_entry<'e, E>(db: E, entry: &PartnershipScheduleEntry) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE mentor_partnership_schedule SET mentor_id = ? WHERE course_id = ? AND lesson_index = ?",
    )
    .bind(&entry.mentor_id)
    .bind(&entry.course_id)
    .bind(i64::from(entry.lesson_index))
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Records a cancellation. Returns false when the same record already existed.
pub async fn insert_cancellation<'e, E>(
    db: E,
    record: &CancellationRecord,
    created_at: &DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO lesson_cancellations (course_id, user_id, lesson_date_time, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(course_id, user_id, lesson_date_time) DO NOTHING",
    )
    .bind(&record.course_id)
    .bind(&record.user_id)
    .bind(timestamp::to_storage(&record.lesson_date_time))
    .bind(timestamp::to_storage(created_at))
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_cancellations<'e, E>(db: E, course_id: &str) -> Result<Vec<CancellationRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, CancellationRow>(
        "SELECT course_id, user_id, lesson_date_time FROM lesson_cancellations WHERE course_id = ? ORDER BY lesson_date_time",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(CancellationRecord {
                lesson_date_time: decode_timestamp(&row.lesson_date_time)?,
                course_id: row.course_id,
                user_id: row.user_id,
            })
        })
        .collect()
}

/// Reminders already handed off for lessons of a course after `after`,
/// as (user, lesson instant) pairs.
pub async fn fetch_sent_reminders<'e, E>(
    db: E,
    course_id: &str,
    after: &DateTime<Utc>,
) -> Result<Vec<(String, DateTime<Utc>)>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT user_id, lesson_date_time FROM lesson_reminders WHERE course_id = ? AND lesson_date_time > ?",
    )
    .bind(course_id)
    .bind(timestamp::to_storage(after))
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(user_id, raw)| Ok((user_id, decode_timestamp(&raw)?)))
        .collect()
}

/// Records a handed-off reminder. Returns false when it was already recorded.
pub async fn insert_reminder<'e, E>(
    db: E,
    lesson: &UpcomingLesson,
    sent_at: &DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO lesson_reminders (course_id, user_id, lesson_date_time, sent_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(course_id, user_id, lesson_date_time) DO NOTHING",
    )
    .bind(&lesson.course_id)
    .bind(&lesson.user_id)
    .bind(timestamp::to_storage(&lesson.date_time))
    .bind(timestamp::to_storage(sent_at))
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Loads the whole course aggregate: row, type, mentors (with the
/// partnership schedule when there are two) and students.
pub async fn load_course(conn: &mut SqliteConnection, id: &str) -> Result<Option<Course>, sqlx::Error> {
    let Some(row) = find_course_row(&mut *conn, id).await? else {
        return Ok(None);
    };

    let course_type = match &row.course_type_id {
        Some(type_id) => find_course_type(&mut *conn, type_id).await?,
        None => None,
    };

    let mentor_ids = fetch_mentor_ids(&mut *conn, id).await?;
    let mentors = match mentor_ids.as_slice() {
        [] => None,
        [mentor] => Some(MentorConfig::Single { mentor: mentor.clone() }),
        [primary, secondary, ..] => {
            let schedule = PartnershipSchedule::from_entries(fetch_schedule(&mut *conn, id).await?);
            Some(MentorConfig::Partnership {
                primary: primary.clone(),
                secondary: secondary.clone(),
                schedule,
            })
        }
    };

    let students = fetch_student_ids(&mut *conn, id).await?;
    let start_date_time = row
        .start_date_time
        .as_deref()
        .map(decode_timestamp)
        .transpose()?;

    Ok(Some(Course {
        id: row.id,
        course_type,
        mentors,
        students,
        start_date_time,
        partnership_split: row.partnership_split.and_then(|s| u32::try_from(s).ok()),
    }))
}
