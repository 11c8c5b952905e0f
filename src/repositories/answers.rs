use time::PrimitiveDateTime;

use crate::db::models::Answer;

pub(crate) const COLUMNS: &str = "id, attempt_id, question_id, answer, is_correct, answered_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// Insert-or-overwrite keyed on (attempt, question). A write older than the
/// stored `answered_at` leaves the row alone and yields `None`.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    answer: UpsertAnswer<'_>,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (id, attempt_id, question_id, answer, is_correct, answered_at)
         VALUES ($1, $2, $3, $4, NULL, $5)
         ON CONFLICT (attempt_id, question_id) DO UPDATE
         SET answer = EXCLUDED.answer, answered_at = EXCLUDED.answered_at
         WHERE answers.answered_at <= EXCLUDED.answered_at
         RETURNING {COLUMNS}"
    ))
    .bind(answer.id)
    .bind(answer.attempt_id)
    .bind(answer.question_id)
    .bind(answer.answer)
    .bind(answer.answered_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_question(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 AND question_id = $2"
    ))
    .bind(attempt_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY answered_at, question_id"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Writes grading verdicts in one statement.
pub(crate) async fn set_correctness(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_ids: &[String],
    verdicts: &[bool],
) -> Result<(), sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE answers AS a
         SET is_correct = v.is_correct
         FROM UNNEST($2::varchar[], $3::bool[]) AS v(question_id, is_correct)
         WHERE a.attempt_id = $1 AND a.question_id = v.question_id",
    )
    .bind(attempt_id)
    .bind(question_ids)
    .bind(verdicts)
    .execute(executor)
    .await?;
    Ok(())
}
