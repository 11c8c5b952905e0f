use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::attempt::{
    answer_responses, AttemptDetailResponse, AttemptQuery, ReviewResponse,
};

pub(super) async fn get_attempt(
    Path(attempt_id): Path<String>,
    Query(query): Query<AttemptQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let (attempt, answers) =
        state.attempts().get(&user, &attempt_id, query.student_id.as_deref()).await?;

    Ok(Json(AttemptDetailResponse { attempt: attempt.into(), answers: answer_responses(answers) }))
}

pub(super) async fn review_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = state.attempts().review(&user, &attempt_id).await?;
    Ok(Json(review.into()))
}
