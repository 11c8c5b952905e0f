//! Test-taking client for the attempt API: REST transport, debounced
//! autosave and local resume state.

mod api;
mod autosave;
mod debounce;
mod http;
mod local;
#[cfg(test)]
mod testing;
mod types;

pub use api::AttemptApi;
pub use autosave::{AutosaveController, DEFAULT_ANSWER_DEBOUNCE, DEFAULT_PROGRESS_DEBOUNCE};
pub use debounce::Debouncer;
pub use http::HttpAttemptClient;
pub use local::{LocalAttemptState, SubmitCheck, SubmitConfirmation, RESUME_NOTICE};
pub use types::{
    Answer, AnswerDraft, Attempt, AttemptDetail, AttemptStatus, ClientError, Review,
    ReviewQuestion, StartResponse,
};
