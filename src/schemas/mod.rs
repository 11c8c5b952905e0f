use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod attempt;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
    pub(crate) autosave: AutosaveHints,
}

/// Debounce windows clients should use for background saves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutosaveHints {
    pub(crate) answer_debounce_ms: u64,
    pub(crate) progress_debounce_ms: u64,
}
