use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::api::AttemptApi;
use super::debounce::Debouncer;
use super::local::{SubmitCheck, SubmitConfirmation};
use super::types::{Attempt, ClientError};

pub const DEFAULT_ANSWER_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PROGRESS_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Values typed or navigated to but not yet acknowledged by the server.
#[derive(Default)]
struct Drafts {
    answers: HashMap<String, String>,
    progress: Option<i32>,
}

/// Debounced writer for one in-progress attempt.
///
/// Answer edits are saved per question after the answer delay, navigation
/// after the progress delay. A failed background save keeps its draft so the
/// next [`flush`](Self::flush) retries it.
pub struct AutosaveController {
    api: Arc<dyn AttemptApi>,
    attempt_id: String,
    drafts: Arc<Mutex<Drafts>>,
    answers: Debouncer<String>,
    progress: Debouncer<()>,
}

impl AutosaveController {
    pub fn new(api: Arc<dyn AttemptApi>, attempt_id: impl Into<String>) -> Self {
        Self::with_delays(api, attempt_id, DEFAULT_ANSWER_DEBOUNCE, DEFAULT_PROGRESS_DEBOUNCE)
    }

    pub fn with_delays(
        api: Arc<dyn AttemptApi>,
        attempt_id: impl Into<String>,
        answer_delay: Duration,
        progress_delay: Duration,
    ) -> Self {
        Self {
            api,
            attempt_id: attempt_id.into(),
            drafts: Arc::new(Mutex::new(Drafts::default())),
            answers: Debouncer::new(answer_delay),
            progress: Debouncer::new(progress_delay),
        }
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn edit_answer(&self, question_id: &str, text: &str) {
        lock(&self.drafts).answers.insert(question_id.to_string(), text.to_string());

        let save = save_answer(
            Arc::clone(&self.api),
            Arc::clone(&self.drafts),
            self.attempt_id.clone(),
            question_id.to_string(),
        );
        self.answers.schedule(question_id.to_string(), save);
    }

    pub fn navigate(&self, question_index: i32) {
        lock(&self.drafts).progress = Some(question_index);

        let save = save_progress(
            Arc::clone(&self.api),
            Arc::clone(&self.drafts),
            self.attempt_id.clone(),
        );
        self.progress.schedule((), save);
    }

    /// Number of answers not yet acknowledged by the server.
    pub fn unsaved_answers(&self) -> usize {
        lock(&self.drafts).answers.len()
    }

    /// Sends every pending draft now, cancelling the timers.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.answers.cancel_all();
        self.progress.cancel_all();

        let (answers, progress) = {
            let drafts = lock(&self.drafts);
            let answers: Vec<(String, String)> =
                drafts.answers.iter().map(|(q, a)| (q.clone(), a.clone())).collect();
            (answers, drafts.progress)
        };

        for (question_id, text) in answers {
            self.api.submit_answer(&self.attempt_id, &question_id, &text).await?;
            acknowledge_answer(&self.drafts, &question_id, &text);
        }
        if let Some(index) = progress {
            self.api.update_progress(&self.attempt_id, index).await?;
            acknowledge_progress(&self.drafts, index);
        }

        Ok(())
    }

    /// Flushes and completes the attempt. Gaps need the confirmation from `check`.
    pub async fn submit(
        &self,
        check: &SubmitCheck,
        confirmation: Option<SubmitConfirmation>,
    ) -> Result<Attempt, ClientError> {
        check.authorize(confirmation)?;
        self.flush().await?;
        let attempt = self.api.complete(&self.attempt_id).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            score = ?attempt.score,
            "Attempt submitted"
        );
        Ok(attempt)
    }
}

impl Drop for AutosaveController {
    fn drop(&mut self) {
        let unsaved = self.unsaved_answers();
        if unsaved > 0 {
            tracing::warn!(
                attempt_id = %self.attempt_id,
                unsaved,
                "Autosave dropped with unsaved answers"
            );
        }
    }
}

async fn save_answer(
    api: Arc<dyn AttemptApi>,
    drafts: Arc<Mutex<Drafts>>,
    attempt_id: String,
    question_id: String,
) {
    let draft = lock(&drafts).answers.get(&question_id).cloned();
    let Some(text) = draft else {
        return;
    };

    match api.submit_answer(&attempt_id, &question_id, &text).await {
        Ok(_) => acknowledge_answer(&drafts, &question_id, &text),
        Err(err) => {
            tracing::warn!(
                attempt_id = %attempt_id,
                question_id = %question_id,
                error = %err,
                "Autosave of answer failed"
            );
        }
    }
}

async fn save_progress(api: Arc<dyn AttemptApi>, drafts: Arc<Mutex<Drafts>>, attempt_id: String) {
    let draft = lock(&drafts).progress;
    let Some(index) = draft else {
        return;
    };

    match api.update_progress(&attempt_id, index).await {
        Ok(()) => acknowledge_progress(&drafts, index),
        Err(err) => {
            tracing::warn!(attempt_id = %attempt_id, error = %err, "Autosave of progress failed");
        }
    }
}

// A newer edit made while the request was in flight stays pending.
fn acknowledge_answer(drafts: &Mutex<Drafts>, question_id: &str, sent: &str) {
    let mut drafts = lock(drafts);
    if drafts.answers.get(question_id).map(String::as_str) == Some(sent) {
        drafts.answers.remove(question_id);
    }
}

fn acknowledge_progress(drafts: &Mutex<Drafts>, sent: i32) {
    let mut drafts = lock(drafts);
    if drafts.progress == Some(sent) {
        drafts.progress = None;
    }
}

fn lock(drafts: &Mutex<Drafts>) -> MutexGuard<'_, Drafts> {
    drafts.lock().unwrap_or_else(PoisonError::into_inner)
}
