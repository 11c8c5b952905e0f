//! Students, classrooms, enrollments and test assignments. Owned by the
//! roster subsystem; this service only reads them.

use crate::db::models::{Classroom, Student};

const STUDENT_COLUMNS: &str = "id, user_id, display_name, created_at";
const CLASSROOM_COLUMNS: &str = "id, teacher_id, name, created_at";

pub(crate) async fn find_student(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_classroom(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {CLASSROOM_COLUMNS} FROM classrooms WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// True when the student sits in at least one classroom the test was assigned to.
pub(crate) async fn is_test_assigned_to_student(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1
            FROM enrollments e
            JOIN test_assignments ta ON ta.classroom_id = e.classroom_id
            WHERE e.student_id = $1 AND ta.test_id = $2
        )",
    )
    .bind(student_id)
    .bind(test_id)
    .fetch_one(executor)
    .await
}

/// True when some classroom taught by `teacher_user_id` has the student enrolled
/// and the test assigned.
pub(crate) async fn teaches_student_for_test(
    executor: impl sqlx::PgExecutor<'_>,
    teacher_user_id: &str,
    student_id: &str,
    test_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1
            FROM classrooms c
            JOIN enrollments e ON e.classroom_id = c.id
            JOIN test_assignments ta ON ta.classroom_id = c.id
            WHERE c.teacher_id = $1 AND e.student_id = $2 AND ta.test_id = $3
        )",
    )
    .bind(teacher_user_id)
    .bind(student_id)
    .bind(test_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn is_test_assigned_to_classroom(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    classroom_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM test_assignments WHERE test_id = $1 AND classroom_id = $2)",
    )
    .bind(test_id)
    .bind(classroom_id)
    .fetch_one(executor)
    .await
}
