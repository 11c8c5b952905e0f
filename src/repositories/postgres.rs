use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use super::{
    answers, attempts, catalog, health, rosters, users, AnswerWrite, AttemptStore, Completion,
    Grader, NewAttempt, StartOutcome, StoreError,
};
use crate::db::models::{
    Answer, Classroom, ClassroomAttemptRow, Question, Student, Test, TestAttempt, User,
};
use crate::db::types::AttemptStatus;

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health::ping(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(users::find_by_id(&self.pool, id).await?)
    }

    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        Ok(rosters::find_student(&self.pool, id).await?)
    }

    async fn find_test(&self, id: &str) -> Result<Option<Test>, StoreError> {
        Ok(catalog::find_test(&self.pool, id).await?)
    }

    async fn list_questions(&self, test_id: &str) -> Result<Vec<Question>, StoreError> {
        Ok(catalog::list_questions(&self.pool, test_id).await?)
    }

    async fn find_question(
        &self,
        test_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, StoreError> {
        Ok(catalog::find_question(&self.pool, test_id, question_id).await?)
    }

    async fn find_classroom(&self, id: &str) -> Result<Option<Classroom>, StoreError> {
        Ok(rosters::find_classroom(&self.pool, id).await?)
    }

    async fn is_test_assigned_to_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(rosters::is_test_assigned_to_student(&self.pool, test_id, student_id).await?)
    }

    async fn teaches_student_for_test(
        &self,
        teacher_user_id: &str,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(rosters::teaches_student_for_test(&self.pool, teacher_user_id, student_id, test_id)
            .await?)
    }

    async fn is_test_assigned_to_classroom(
        &self,
        test_id: &str,
        classroom_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(rosters::is_test_assigned_to_classroom(&self.pool, test_id, classroom_id).await?)
    }

    async fn start_or_resume(&self, attempt: NewAttempt) -> Result<StartOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        attempts::acquire_start_lock(&mut *tx, &attempt.student_id, &attempt.test_id).await?;

        if let Some(existing) =
            attempts::find_in_progress(&mut *tx, &attempt.student_id, &attempt.test_id).await?
        {
            let answers = answers::list_by_attempt(&mut *tx, &existing.id).await?;
            tx.commit().await?;
            return Ok(StartOutcome { attempt: existing, answers, created: false });
        }

        let inserted = attempts::create(
            &mut *tx,
            attempts::CreateAttempt {
                id: &attempt.id,
                test_id: &attempt.test_id,
                student_id: &attempt.student_id,
                total_questions: attempt.total_questions,
                started_at: attempt.started_at,
            },
        )
        .await?;

        if !inserted {
            // The unique index caught a writer that bypassed the advisory lock.
            let existing =
                attempts::find_in_progress(&mut *tx, &attempt.student_id, &attempt.test_id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Invariant(format!(
                            "start for student {} on test {} conflicted with no in-progress row",
                            attempt.student_id, attempt.test_id
                        ))
                    })?;
            let answers = answers::list_by_attempt(&mut *tx, &existing.id).await?;
            tx.commit().await?;
            return Ok(StartOutcome { attempt: existing, answers, created: false });
        }

        let created = attempts::find_by_id(&mut *tx, &attempt.id).await?.ok_or_else(|| {
            StoreError::Invariant(format!("attempt {} vanished after insert", attempt.id))
        })?;
        tx.commit().await?;

        Ok(StartOutcome { attempt: created, answers: Vec::new(), created: true })
    }

    async fn find_attempt(&self, id: &str) -> Result<Option<TestAttempt>, StoreError> {
        Ok(attempts::find_by_id(&self.pool, id).await?)
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(answers::list_by_attempt(&self.pool, attempt_id).await?)
    }

    async fn update_progress(
        &self,
        id: &str,
        question_index: i32,
        now: PrimitiveDateTime,
    ) -> Result<Option<TestAttempt>, StoreError> {
        Ok(attempts::update_progress(&self.pool, id, question_index, now).await?)
    }

    async fn upsert_answer(&self, answer: AnswerWrite) -> Result<Option<Answer>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let in_progress = attempts::share_by_id(&mut *tx, &answer.attempt_id)
            .await?
            .is_some_and(|attempt| attempt.status == AttemptStatus::InProgress);
        if !in_progress {
            tx.rollback().await?;
            return Ok(None);
        }

        let written = answers::upsert(
            &mut *tx,
            answers::UpsertAnswer {
                id: &answer.id,
                attempt_id: &answer.attempt_id,
                question_id: &answer.question_id,
                answer: &answer.answer,
                answered_at: answer.answered_at,
            },
        )
        .await?;

        let stored = match written {
            Some(row) => row,
            None => answers::find_by_question(&mut *tx, &answer.attempt_id, &answer.question_id)
                .await?
                .ok_or_else(|| {
                    StoreError::Invariant(format!(
                        "answer for question {} in attempt {} skipped but not found",
                        answer.question_id, answer.attempt_id
                    ))
                })?,
        };
        tx.commit().await?;

        Ok(Some(stored))
    }

    async fn complete_attempt(
        &self,
        id: &str,
        completed_at: PrimitiveDateTime,
        grader: Grader,
    ) -> Result<Completion, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(attempt) = attempts::lock_by_id(&mut *tx, id).await? else {
            tx.rollback().await?;
            return Ok(Completion::Missing);
        };

        if attempt.status.is_terminal() {
            tx.commit().await?;
            return Ok(Completion::AlreadyTerminal(attempt));
        }

        let answers = answers::list_by_attempt(&mut *tx, id).await?;
        let questions = catalog::list_questions(&mut *tx, &attempt.test_id).await?;
        let report = grader(&attempt, &answers, &questions);

        let (question_ids, verdicts): (Vec<String>, Vec<bool>) = report
            .results
            .iter()
            .filter(|result| result.answered)
            .map(|result| (result.question_id.clone(), result.is_correct))
            .unzip();
        answers::set_correctness(&mut *tx, id, &question_ids, &verdicts).await?;

        let graded = attempts::mark_submitted(
            &mut *tx,
            id,
            report.correct_answers,
            report.score,
            completed_at,
        )
        .await?;
        tx.commit().await?;

        Ok(Completion::Graded { attempt: graded, report })
    }

    async fn list_classroom_attempts(
        &self,
        classroom_id: &str,
        test_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<ClassroomAttemptRow>, i64), StoreError> {
        let rows =
            attempts::list_for_classroom(&self.pool, classroom_id, test_id, skip, limit).await?;
        let total = attempts::count_for_classroom(&self.pool, classroom_id, test_id).await?;
        Ok((rows, total))
    }
}
