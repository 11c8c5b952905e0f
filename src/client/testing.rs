use std::sync::Mutex;

use async_trait::async_trait;

use super::api::AttemptApi;
use super::types::{
    Answer, AnswerDraft, Attempt, AttemptDetail, AttemptStatus, ClientError, Review,
    StartResponse,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Call {
    Answer { attempt_id: String, question_id: String, answer: String },
    Progress { attempt_id: String, index: i32 },
    Complete(String),
}

impl Call {
    pub(crate) fn answer(attempt_id: &str, question_id: &str, answer: &str) -> Self {
        Call::Answer {
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            answer: answer.to_string(),
        }
    }
}

pub(crate) fn attempt(id: &str) -> Attempt {
    Attempt {
        id: id.to_string(),
        test_id: "test-1".to_string(),
        student_id: "student-1".to_string(),
        total_questions: 4,
        status: AttemptStatus::InProgress,
        started_at: "2026-01-01T00:00:00".to_string(),
        completed_at: None,
        correct_answers: None,
        score: None,
        current_question_index: 0,
    }
}

pub(crate) fn answer(attempt_id: &str, question_id: &str, text: &str) -> Answer {
    Answer {
        id: format!("{attempt_id}-{question_id}"),
        attempt_id: attempt_id.to_string(),
        question_id: question_id.to_string(),
        answer: text.to_string(),
        is_correct: None,
        answered_at: "2026-01-01T00:00:00".to_string(),
    }
}

/// Records successful calls; `fail_next` makes the following calls fail.
#[derive(Default)]
pub(crate) struct FakeApi {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<usize>,
}

impl FakeApi {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn answers_sent(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Answer { question_id, answer, .. } => Some((question_id, answer)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn fail_next(&self, count: usize) {
        *self.failures.lock().unwrap() = count;
    }

    fn record(&self, call: Call) -> Result<(), ClientError> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ClientError::Api {
                status: 503,
                kind: "unavailable".to_string(),
                detail: "try again".to_string(),
            });
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl AttemptApi for FakeApi {
    async fn start(&self, _test_id: &str, _student_id: &str) -> Result<StartResponse, ClientError> {
        Ok(StartResponse { attempt: attempt("attempt-1"), answers: Vec::new(), resumed: false })
    }

    async fn get(&self, attempt_id: &str) -> Result<AttemptDetail, ClientError> {
        Ok(AttemptDetail { attempt: attempt(attempt_id), answers: Vec::new() })
    }

    async fn submit_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        text: &str,
    ) -> Result<Answer, ClientError> {
        self.record(Call::answer(attempt_id, question_id, text))?;
        Ok(answer(attempt_id, question_id, text))
    }

    async fn update_progress(
        &self,
        attempt_id: &str,
        question_index: i32,
    ) -> Result<(), ClientError> {
        self.record(Call::Progress { attempt_id: attempt_id.to_string(), index: question_index })
    }

    async fn complete(&self, attempt_id: &str) -> Result<Attempt, ClientError> {
        self.record(Call::Complete(attempt_id.to_string()))?;
        let mut completed = attempt(attempt_id);
        completed.status = AttemptStatus::Submitted;
        Ok(completed)
    }

    async fn submit_all(
        &self,
        attempt_id: &str,
        answers: &[AnswerDraft],
    ) -> Result<Attempt, ClientError> {
        for draft in answers {
            self.record(Call::answer(attempt_id, &draft.question_id, &draft.answer))?;
        }
        self.complete(attempt_id).await
    }

    async fn review(&self, attempt_id: &str) -> Result<Review, ClientError> {
        Ok(Review { attempt: attempt(attempt_id), questions: Vec::new() })
    }
}
