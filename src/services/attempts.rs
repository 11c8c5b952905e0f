//! Attempt lifecycle: start or resume, progress, answers, completion and review.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Answer, ClassroomAttemptRow, Question, TestAttempt, User};
use crate::repositories::{AnswerWrite, AttemptStore, Completion, NewAttempt, StoreError};
use crate::services::access::{attempt_access, AccessMode};
use crate::services::grading::grade_attempt;

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: TestAttempt,
    pub(crate) answers: Vec<Answer>,
    pub(crate) resumed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ReviewItem {
    pub(crate) question: Question,
    pub(crate) student_answer: Option<String>,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptReview {
    pub(crate) attempt: TestAttempt,
    pub(crate) items: Vec<ReviewItem>,
}

#[derive(Debug, Clone)]
pub(crate) struct AnswerInput {
    pub(crate) question_id: String,
    pub(crate) answer: String,
}

#[derive(Clone)]
pub(crate) struct AttemptService {
    store: Arc<dyn AttemptStore>,
}

impl AttemptService {
    pub(crate) fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    pub(crate) async fn start_or_resume(
        &self,
        caller: &User,
        test_id: &str,
        student_id: &str,
    ) -> Result<StartedAttempt, AttemptError> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or(AttemptError::Forbidden)?;
        if student.user_id != caller.id {
            return Err(AttemptError::Forbidden);
        }

        self.store.find_test(test_id).await?.ok_or(AttemptError::NotFound("Test not found"))?;

        if !self.store.is_test_assigned_to_student(test_id, student_id).await? {
            return Err(AttemptError::Forbidden);
        }

        let questions = self.store.list_questions(test_id).await?;
        if questions.is_empty() {
            return Err(AttemptError::Validation("Test has no questions".to_string()));
        }
        for question in questions.iter().filter(|q| !q.has_consistent_options()) {
            tracing::warn!(
                test_id,
                question_id = %question.id,
                "Correct answer is missing from the question options"
            );
        }

        let outcome = self
            .store
            .start_or_resume(NewAttempt {
                id: Uuid::new_v4().to_string(),
                test_id: test_id.to_string(),
                student_id: student_id.to_string(),
                total_questions: questions.len() as i32,
                started_at: primitive_now_utc(),
            })
            .await?;

        let resumed = !outcome.created;
        metrics::record_attempt_started(resumed);
        tracing::info!(
            attempt_id = %outcome.attempt.id,
            student_id,
            test_id,
            resumed,
            answers = outcome.answers.len(),
            "Attempt started"
        );

        Ok(StartedAttempt { attempt: outcome.attempt, answers: outcome.answers, resumed })
    }

    /// `student_id`, when given, must match the attempt's student.
    pub(crate) async fn get(
        &self,
        caller: &User,
        attempt_id: &str,
        student_id: Option<&str>,
    ) -> Result<(TestAttempt, Vec<Answer>), AttemptError> {
        let attempt = self.load(attempt_id).await?;
        if student_id.is_some_and(|expected| expected != attempt.student_id) {
            return Err(AttemptError::Forbidden);
        }
        self.authorize(caller, &attempt, AccessMode::Read).await?;

        let answers = self.store.list_answers(&attempt.id).await?;
        Ok((attempt, answers))
    }

    pub(crate) async fn update_progress(
        &self,
        caller: &User,
        attempt_id: &str,
        question_index: i32,
    ) -> Result<TestAttempt, AttemptError> {
        let attempt = self.load(attempt_id).await?;
        self.authorize(caller, &attempt, AccessMode::Mutate).await?;
        ensure_in_progress(&attempt)?;

        if question_index < 0 || question_index >= attempt.total_questions {
            return Err(AttemptError::Validation(format!(
                "Question index must be between 0 and {}",
                attempt.total_questions - 1
            )));
        }

        let updated = self
            .store
            .update_progress(&attempt.id, question_index, primitive_now_utc())
            .await?
            .ok_or(AttemptError::Conflict("Attempt already completed"))?;

        tracing::debug!(attempt_id = %updated.id, question_index, "Attempt progress saved");
        Ok(updated)
    }

    pub(crate) async fn submit_answer(
        &self,
        caller: &User,
        attempt_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<Answer, AttemptError> {
        let attempt = self.load(attempt_id).await?;
        self.authorize(caller, &attempt, AccessMode::Mutate).await?;
        ensure_in_progress(&attempt)?;
        self.ensure_question(&attempt, question_id).await?;

        let saved = self.write_answer(&attempt, question_id, answer).await?;
        tracing::debug!(attempt_id = %attempt.id, question_id, "Answer saved");
        Ok(saved)
    }

    pub(crate) async fn complete(
        &self,
        caller: &User,
        attempt_id: &str,
    ) -> Result<TestAttempt, AttemptError> {
        let attempt = self.load(attempt_id).await?;
        self.authorize(caller, &attempt, AccessMode::Mutate).await?;
        self.finish(&attempt.id).await
    }

    /// Writes every answer, then completes. A terminal attempt is returned as is.
    pub(crate) async fn submit_all(
        &self,
        caller: &User,
        attempt_id: &str,
        answers: &[AnswerInput],
    ) -> Result<TestAttempt, AttemptError> {
        let attempt = self.load(attempt_id).await?;
        self.authorize(caller, &attempt, AccessMode::Mutate).await?;
        if attempt.status.is_terminal() {
            return Ok(attempt);
        }

        for input in answers {
            self.ensure_question(&attempt, &input.question_id).await?;
        }
        for input in answers {
            self.write_answer(&attempt, &input.question_id, &input.answer).await?;
        }

        self.finish(&attempt.id).await
    }

    pub(crate) async fn review(
        &self,
        caller: &User,
        attempt_id: &str,
    ) -> Result<AttemptReview, AttemptError> {
        let attempt = self.load(attempt_id).await?;
        self.authorize(caller, &attempt, AccessMode::Read).await?;
        if !attempt.status.is_terminal() {
            return Err(AttemptError::Conflict("Attempt is still in progress"));
        }

        let questions = self.store.list_questions(&attempt.test_id).await?;
        let answers = self.store.list_answers(&attempt.id).await?;

        let items = questions
            .into_iter()
            .map(|question| {
                let answer = answers.iter().find(|answer| answer.question_id == question.id);
                let is_correct = answer
                    .map(|answer| {
                        answer.is_correct.unwrap_or_else(|| {
                            tracing::warn!(
                                attempt_id = %attempt.id,
                                question_id = %question.id,
                                "Answer on a completed attempt has no grading verdict"
                            );
                            false
                        })
                    })
                    .unwrap_or(false);
                ReviewItem {
                    student_answer: answer.map(|answer| answer.answer.clone()),
                    question,
                    is_correct,
                }
            })
            .collect();

        Ok(AttemptReview { attempt, items })
    }

    /// Attempts on a test by the students of a classroom; classroom teacher only.
    pub(crate) async fn classroom_attempts(
        &self,
        caller: &User,
        classroom_id: &str,
        test_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<ClassroomAttemptRow>, i64), AttemptError> {
        let classroom = self
            .store
            .find_classroom(classroom_id)
            .await?
            .ok_or(AttemptError::Forbidden)?;
        if classroom.teacher_id != caller.id {
            return Err(AttemptError::Forbidden);
        }
        if !self.store.is_test_assigned_to_classroom(test_id, classroom_id).await? {
            return Err(AttemptError::NotFound("Test is not assigned to this classroom"));
        }

        Ok(self.store.list_classroom_attempts(classroom_id, test_id, skip, limit).await?)
    }

    async fn load(&self, attempt_id: &str) -> Result<TestAttempt, AttemptError> {
        self.store
            .find_attempt(attempt_id)
            .await?
            .ok_or(AttemptError::NotFound("Attempt not found"))
    }

    async fn authorize(
        &self,
        caller: &User,
        attempt: &TestAttempt,
        mode: AccessMode,
    ) -> Result<(), AttemptError> {
        let access = attempt_access(self.store.as_ref(), caller, attempt, mode).await?;
        if access.is_granted() {
            Ok(())
        } else {
            tracing::info!(
                attempt_id = %attempt.id,
                user_id = %caller.id,
                ?mode,
                "Attempt access denied"
            );
            Err(AttemptError::Forbidden)
        }
    }

    async fn ensure_question(
        &self,
        attempt: &TestAttempt,
        question_id: &str,
    ) -> Result<(), AttemptError> {
        self.store
            .find_question(&attempt.test_id, question_id)
            .await?
            .map(|_| ())
            .ok_or(AttemptError::NotFound("Question not found in this test"))
    }

    async fn write_answer(
        &self,
        attempt: &TestAttempt,
        question_id: &str,
        answer: &str,
    ) -> Result<Answer, AttemptError> {
        let saved = self
            .store
            .upsert_answer(AnswerWrite {
                id: Uuid::new_v4().to_string(),
                attempt_id: attempt.id.clone(),
                question_id: question_id.to_string(),
                answer: answer.to_string(),
                answered_at: primitive_now_utc(),
            })
            .await?
            .ok_or(AttemptError::Conflict("Attempt already completed"))?;
        metrics::record_answer_saved();
        Ok(saved)
    }

    async fn finish(&self, attempt_id: &str) -> Result<TestAttempt, AttemptError> {
        match self.store.complete_attempt(attempt_id, primitive_now_utc(), grade_attempt).await? {
            Completion::Graded { attempt, report } => {
                metrics::record_attempt_completed(report.score);
                tracing::info!(
                    attempt_id = %attempt.id,
                    student_id = %attempt.student_id,
                    test_id = %attempt.test_id,
                    correct_answers = report.correct_answers,
                    total_questions = attempt.total_questions,
                    score = report.score,
                    "Attempt completed"
                );
                Ok(attempt)
            }
            Completion::AlreadyTerminal(attempt) => {
                tracing::debug!(attempt_id = %attempt.id, "Attempt already completed");
                Ok(attempt)
            }
            Completion::Missing => Err(AttemptError::NotFound("Attempt not found")),
        }
    }
}

fn ensure_in_progress(attempt: &TestAttempt) -> Result<(), AttemptError> {
    if attempt.status.is_terminal() {
        return Err(AttemptError::Conflict("Attempt already completed"));
    }
    Ok(())
}
