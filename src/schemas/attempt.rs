use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, ClassroomAttemptRow, TestAttempt};
use crate::db::types::{AttemptStatus, QuestionType};
use crate::services::attempts::{AnswerInput, AttemptReview, ReviewItem};

const MAX_ID_LEN: u64 = 36;
const MAX_ANSWER_LEN: u64 = 2000;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartAttemptRequest {
    #[validate(length(min = 1, max = MAX_ID_LEN, message = "testId must not be empty"))]
    pub(crate) test_id: String,
    #[validate(length(min = 1, max = MAX_ID_LEN, message = "studentId must not be empty"))]
    pub(crate) student_id: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = MAX_ID_LEN, message = "questionId must not be empty"))]
    pub(crate) question_id: String,
    #[validate(length(max = MAX_ANSWER_LEN, message = "answer is too long"))]
    pub(crate) answer: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateProgressRequest {
    #[validate(range(min = 0, message = "questionIndex must be non-negative"))]
    pub(crate) question_index: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAllRequest {
    #[serde(default)]
    #[validate(length(max = 500, message = "too many answers"))]
    #[validate(nested)]
    pub(crate) answers: Vec<SubmitAnswerRequest>,
}

impl SubmitAllRequest {
    pub(crate) fn into_inputs(self) -> Vec<AnswerInput> {
        self.answers
            .into_iter()
            .map(|item| AnswerInput { question_id: item.question_id, answer: item.answer })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptQuery {
    #[serde(default)]
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassroomAttemptsQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) total_questions: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) score: Option<i32>,
    pub(crate) current_question_index: i32,
}

impl From<TestAttempt> for AttemptResponse {
    fn from(attempt: TestAttempt) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            student_id: attempt.student_id,
            total_questions: attempt.total_questions,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            completed_at: attempt.completed_at.map(format_primitive),
            correct_answers: attempt.correct_answers,
            score: attempt.score,
            current_question_index: attempt.current_question_index,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answered_at: String,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            answer: answer.answer,
            is_correct: answer.is_correct,
            answered_at: format_primitive(answer.answered_at),
        }
    }
}

pub(crate) fn answer_responses(answers: Vec<Answer>) -> Vec<AnswerResponse> {
    answers.into_iter().map(AnswerResponse::from).collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) answers: Vec<AnswerResponse>,
    pub(crate) resumed: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) answers: Vec<AnswerResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerEnvelope {
    pub(crate) answer: AnswerResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptEnvelope {
    pub(crate) attempt: AttemptResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewQuestionResponse {
    pub(crate) question_id: String,
    pub(crate) order_index: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) student_answer: Option<String>,
    pub(crate) correct_answer: String,
    pub(crate) is_correct: bool,
}

impl From<ReviewItem> for ReviewQuestionResponse {
    fn from(item: ReviewItem) -> Self {
        let options = item.question.options().to_vec();
        Self {
            question_id: item.question.id,
            order_index: item.question.order_index,
            question_type: item.question.question_type,
            prompt: item.question.prompt,
            options,
            student_answer: item.student_answer,
            correct_answer: item.question.correct_answer,
            is_correct: item.is_correct,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) questions: Vec<ReviewQuestionResponse>,
}

impl From<AttemptReview> for ReviewResponse {
    fn from(review: AttemptReview) -> Self {
        Self {
            attempt: review.attempt.into(),
            questions: review.items.into_iter().map(ReviewQuestionResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassroomAttemptResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) student_name: String,
}

impl From<ClassroomAttemptRow> for ClassroomAttemptResponse {
    fn from(row: ClassroomAttemptRow) -> Self {
        Self { attempt: row.attempt.into(), student_name: row.student_name }
    }
}
