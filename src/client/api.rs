use async_trait::async_trait;

use super::types::{
    AnswerDraft, Attempt, AttemptDetail, Answer, ClientError, Review, StartResponse,
};

/// Operations of the attempt REST contract, as seen by a test-taking client.
#[async_trait]
pub trait AttemptApi: Send + Sync {
    async fn start(&self, test_id: &str, student_id: &str) -> Result<StartResponse, ClientError>;

    async fn get(&self, attempt_id: &str) -> Result<AttemptDetail, ClientError>;

    async fn submit_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<Answer, ClientError>;

    async fn update_progress(
        &self,
        attempt_id: &str,
        question_index: i32,
    ) -> Result<(), ClientError>;

    async fn complete(&self, attempt_id: &str) -> Result<Attempt, ClientError>;

    async fn submit_all(
        &self,
        attempt_id: &str,
        answers: &[AnswerDraft],
    ) -> Result<Attempt, ClientError>;

    async fn review(&self, attempt_id: &str) -> Result<Review, ClientError>;
}
