use crate::db::models::{Question, Test};

const TEST_COLUMNS: &str = "id, sheet_id, title, variant_label, created_at";
const QUESTION_COLUMNS: &str =
    "id, test_id, order_index, question_type, prompt, correct_answer, options";

pub(crate) async fn find_test(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_questions(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = $1 ORDER BY order_index"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_question(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND test_id = $2"
    ))
    .bind(question_id)
    .bind(test_id)
    .fetch_optional(executor)
    .await
}
