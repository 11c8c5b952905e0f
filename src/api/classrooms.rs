use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::schemas::attempt::{ClassroomAttemptResponse, ClassroomAttemptsQuery};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:classroom_id/tests/:test_id/attempts", get(list_test_attempts))
}

async fn list_test_attempts(
    Path((classroom_id, test_id)): Path<(String, String)>,
    Query(query): Query<ClassroomAttemptsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ClassroomAttemptResponse>>, ApiError> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, 1000);

    let (rows, total_count) = state
        .attempts()
        .classroom_attempts(&user, &classroom_id, &test_id, skip, limit)
        .await?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(ClassroomAttemptResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}
