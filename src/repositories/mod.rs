pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod catalog;
pub(crate) mod health;
pub(crate) mod memory;
pub(crate) mod postgres;
pub(crate) mod rosters;
pub(crate) mod users;

use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{
    Answer, Classroom, ClassroomAttemptRow, Question, Student, Test, TestAttempt, User,
};
use crate::services::grading::GradeReport;

pub(crate) use memory::MemoryStore;
pub(crate) use postgres::PgStore;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// Grading hook run by the store while the attempt row is locked.
pub(crate) type Grader = fn(&TestAttempt, &[Answer], &[Question]) -> GradeReport;

#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) total_questions: i32,
    pub(crate) started_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct StartOutcome {
    pub(crate) attempt: TestAttempt,
    pub(crate) answers: Vec<Answer>,
    /// False when an in-progress attempt already existed and was returned.
    pub(crate) created: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AnswerWrite {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) answered_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Graded { attempt: TestAttempt, report: GradeReport },
    AlreadyTerminal(TestAttempt),
    Missing,
}

/// Persistence seam for the attempt lifecycle. Reference data (users, students,
/// classrooms, tests) is read-only from here.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError>;

    async fn find_test(&self, id: &str) -> Result<Option<Test>, StoreError>;

    /// Questions of a test ordered by `order_index`.
    async fn list_questions(&self, test_id: &str) -> Result<Vec<Question>, StoreError>;

    async fn find_question(
        &self,
        test_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, StoreError>;

    async fn find_classroom(&self, id: &str) -> Result<Option<Classroom>, StoreError>;

    async fn is_test_assigned_to_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError>;

    async fn teaches_student_for_test(
        &self,
        teacher_user_id: &str,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, StoreError>;

    async fn is_test_assigned_to_classroom(
        &self,
        test_id: &str,
        classroom_id: &str,
    ) -> Result<bool, StoreError>;

    /// Returns the single in-progress attempt for the pair, creating it when absent.
    /// Concurrent callers converge on the same row.
    async fn start_or_resume(&self, attempt: NewAttempt) -> Result<StartOutcome, StoreError>;

    async fn find_attempt(&self, id: &str) -> Result<Option<TestAttempt>, StoreError>;

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError>;

    /// `None` when the attempt is missing or no longer in progress.
    async fn update_progress(
        &self,
        id: &str,
        question_index: i32,
        now: PrimitiveDateTime,
    ) -> Result<Option<TestAttempt>, StoreError>;

    /// Last write by `answered_at` wins; a stale write returns the stored row.
    /// `None` when the attempt is missing or no longer in progress; the status
    /// check and the write are atomic with respect to `complete_attempt`.
    async fn upsert_answer(&self, answer: AnswerWrite) -> Result<Option<Answer>, StoreError>;

    async fn complete_attempt(
        &self,
        id: &str,
        completed_at: PrimitiveDateTime,
        grader: Grader,
    ) -> Result<Completion, StoreError>;

    async fn list_classroom_attempts(
        &self,
        classroom_id: &str,
        test_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<ClassroomAttemptRow>, i64), StoreError>;
}
