use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub total_questions: i32,
    pub status: AttemptStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub correct_answers: Option<i32>,
    pub score: Option<i32>,
    pub current_question_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub answer: String,
    pub is_correct: Option<bool>,
    pub answered_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub attempt: Attempt,
    pub answers: Vec<Answer>,
    pub resumed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttemptDetail {
    pub attempt: Attempt,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuestion {
    pub question_id: String,
    pub order_index: i32,
    pub question_type: String,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub student_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub attempt: Attempt,
    pub questions: Vec<ReviewQuestion>,
}

/// One answer of a bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDraft {
    pub question_id: String,
    pub answer: String,
}

/// Error body returned by the service for every non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) kind: String,
    pub(crate) detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status} {kind}: {detail}")]
    Api { status: u16, kind: String, detail: String },
    #[error("{count} question(s) are unanswered; confirm to submit anyway")]
    Unanswered { count: usize },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            ClientError::Unanswered { .. } => None,
        }
    }

    /// True when the attempt was already completed elsewhere.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}
