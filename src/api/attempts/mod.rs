mod review;
mod student;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Owning student only
        .route("/start", post(student::start_attempt))
        .route("/:attempt_id/answer", post(student::submit_answer))
        .route("/:attempt_id/progress", post(student::update_progress))
        .route("/:attempt_id/complete", post(student::complete_attempt))
        .route("/:attempt_id/submit", post(student::submit_all))
        // Owning student or classroom teacher
        .route("/:attempt_id", get(review::get_attempt))
        .route("/:attempt_id/review", get(review::review_attempt))
}
