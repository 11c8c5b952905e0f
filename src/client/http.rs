use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::api::AttemptApi;
use super::types::{
    AnswerDraft, Answer, Attempt, AttemptDetail, ClientError, ErrorBody, Review, StartResponse,
};

#[derive(serde::Deserialize)]
struct AnswerEnvelope {
    answer: Answer,
}

#[derive(serde::Deserialize)]
struct AttemptEnvelope {
    attempt: Attempt,
}

/// [`AttemptApi`] over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpAttemptClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpAttemptClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/tests/attempts{path}", self.base_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(&self.token)
    }

    fn get_request(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await?;
    let (kind, detail) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => (error.kind, error.detail),
        Err(_) => ("unknown".to_string(), body),
    };
    tracing::debug!(status = status.as_u16(), %kind, %detail, "Attempt API request rejected");

    Err(ClientError::Api { status: status.as_u16(), kind, detail })
}

#[async_trait]
impl AttemptApi for HttpAttemptClient {
    async fn start(&self, test_id: &str, student_id: &str) -> Result<StartResponse, ClientError> {
        send(self.post("/start").json(&json!({ "testId": test_id, "studentId": student_id })))
            .await
    }

    async fn get(&self, attempt_id: &str) -> Result<AttemptDetail, ClientError> {
        send(self.get_request(&format!("/{attempt_id}"))).await
    }

    async fn submit_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<Answer, ClientError> {
        let request = self
            .post(&format!("/{attempt_id}/answer"))
            .json(&json!({ "questionId": question_id, "answer": answer }));
        let envelope: AnswerEnvelope = send(request).await?;
        Ok(envelope.answer)
    }

    async fn update_progress(
        &self,
        attempt_id: &str,
        question_index: i32,
    ) -> Result<(), ClientError> {
        let request = self
            .post(&format!("/{attempt_id}/progress"))
            .json(&json!({ "questionIndex": question_index }));
        let _: serde_json::Value = send(request).await?;
        Ok(())
    }

    async fn complete(&self, attempt_id: &str) -> Result<Attempt, ClientError> {
        let request = self.post(&format!("/{attempt_id}/complete"));
        let envelope: AttemptEnvelope = send(request).await?;
        Ok(envelope.attempt)
    }

    async fn submit_all(
        &self,
        attempt_id: &str,
        answers: &[AnswerDraft],
    ) -> Result<Attempt, ClientError> {
        let request =
            self.post(&format!("/{attempt_id}/submit")).json(&json!({ "answers": answers }));
        let envelope: AttemptEnvelope = send(request).await?;
        Ok(envelope.attempt)
    }

    async fn review(&self, attempt_id: &str) -> Result<Review, ClientError> {
        send(self.get_request(&format!("/{attempt_id}/review"))).await
    }
}
