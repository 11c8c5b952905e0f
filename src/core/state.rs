use std::sync::Arc;

use crate::core::config::Settings;
use crate::repositories::AttemptStore;
use crate::services::attempts::AttemptService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn AttemptStore>,
    attempts: AttemptService,
}

impl AppState {
    pub(crate) fn new(settings: Settings, store: Arc<dyn AttemptStore>) -> Self {
        let attempts = AttemptService::new(store.clone());
        Self { inner: Arc::new(InnerState { settings, store, attempts }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.inner.store
    }

    pub(crate) fn attempts(&self) -> &AttemptService {
        &self.inner.attempts
    }
}
