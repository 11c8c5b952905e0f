use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentUser, ValidatedJson};
use crate::core::state::AppState;
use crate::schemas::attempt::{
    answer_responses, AnswerEnvelope, AttemptEnvelope, ProgressResponse, StartAttemptRequest,
    StartAttemptResponse, SubmitAllRequest, SubmitAnswerRequest, UpdateProgressRequest,
};

/// 201 when a new attempt was created, 200 when an in-progress one was resumed.
pub(super) async fn start_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<StartAttemptRequest>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    let started =
        state.attempts().start_or_resume(&user, &payload.test_id, &payload.student_id).await?;

    let status = if started.resumed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(StartAttemptResponse {
            attempt: started.attempt.into(),
            answers: answer_responses(started.answers),
            resumed: started.resumed,
        }),
    ))
}

pub(super) async fn submit_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubmitAnswerRequest>,
) -> Result<Json<AnswerEnvelope>, ApiError> {
    let answer = state
        .attempts()
        .submit_answer(&user, &attempt_id, &payload.question_id, &payload.answer)
        .await?;

    Ok(Json(AnswerEnvelope { answer: answer.into() }))
}

pub(super) async fn update_progress(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    state.attempts().update_progress(&user, &attempt_id, payload.question_index).await?;

    Ok(Json(ProgressResponse {}))
}

pub(super) async fn complete_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptEnvelope>, ApiError> {
    let attempt = state.attempts().complete(&user, &attempt_id).await?;
    Ok(Json(AttemptEnvelope { attempt: attempt.into() }))
}

pub(super) async fn submit_all(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubmitAllRequest>,
) -> Result<Json<AttemptEnvelope>, ApiError> {
    let attempt = state.attempts().submit_all(&user, &attempt_id, &payload.into_inputs()).await?;
    Ok(Json(AttemptEnvelope { attempt: attempt.into() }))
}
