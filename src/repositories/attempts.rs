use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{ClassroomAttemptRow, TestAttempt};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, total_questions, status, started_at, completed_at, \
    correct_answers, score, current_question_index, updated_at";

const JOINED_COLUMNS: &str = "\
    a.id, a.test_id, a.student_id, a.total_questions, a.status, a.started_at, a.completed_at, \
    a.correct_answers, a.score, a.current_question_index, a.updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) total_questions: i32,
    pub(crate) started_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!("SELECT {COLUMNS} FROM test_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the attempt for the rest of the transaction.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Share-locks the attempt: answer writes may proceed together but wait for completion.
pub(crate) async fn share_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    test_id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts \
         WHERE student_id = $1 AND test_id = $2 AND status = $3"
    ))
    .bind(student_id)
    .bind(test_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Serializes start requests for one (student, test) pair until the transaction ends.
pub(crate) async fn acquire_start_lock(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    test_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("test_attempt:{student_id}:{test_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

/// Returns false when the partial unique index already holds an in-progress row.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO test_attempts (
            id, test_id, student_id, total_questions, status, started_at,
            current_question_index, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,0,$6)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.test_id)
    .bind(attempt.student_id)
    .bind(attempt.total_questions)
    .bind(AttemptStatus::InProgress)
    .bind(attempt.started_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_index: i32,
    now: PrimitiveDateTime,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "UPDATE test_attempts
         SET current_question_index = $1, updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(question_index)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    correct_answers: i32,
    score: i32,
    completed_at: PrimitiveDateTime,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "UPDATE test_attempts
         SET status = $1, correct_answers = $2, score = $3, completed_at = $4, updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Submitted)
    .bind(correct_answers)
    .bind(score)
    .bind(completed_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Attempts on `test_id` by students enrolled in the classroom, newest first.
pub(crate) async fn list_for_classroom(
    executor: impl sqlx::PgExecutor<'_>,
    classroom_id: &str,
    test_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ClassroomAttemptRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {JOINED_COLUMNS}, s.display_name AS student_name
         FROM test_attempts a
         JOIN students s ON s.id = a.student_id
         JOIN enrollments e ON e.student_id = a.student_id AND e.classroom_id = "
    ));
    builder.push_bind(classroom_id);
    builder.push(" WHERE a.test_id = ");
    builder.push_bind(test_id);
    builder.push(" ORDER BY a.started_at DESC, a.id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ClassroomAttemptRow>().fetch_all(executor).await
}

pub(crate) async fn count_for_classroom(
    executor: impl sqlx::PgExecutor<'_>,
    classroom_id: &str,
    test_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM test_attempts a
         JOIN enrollments e ON e.student_id = a.student_id AND e.classroom_id = $1
         WHERE a.test_id = $2",
    )
    .bind(classroom_id)
    .bind(test_id)
    .fetch_one(executor)
    .await
}
