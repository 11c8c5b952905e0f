use std::collections::HashMap;

use super::types::{Attempt, ClientError, StartResponse};

pub const RESUME_NOTICE: &str = "Your answers were restored";

/// Client-side view of an attempt, rebuilt from a start/resume response.
#[derive(Debug, Clone)]
pub struct LocalAttemptState {
    attempt: Attempt,
    answers: HashMap<String, String>,
    current_index: i32,
    resumed: bool,
}

impl LocalAttemptState {
    /// Restores saved answers and jumps to the saved question.
    pub fn restore(response: StartResponse) -> Self {
        let answers = response
            .answers
            .into_iter()
            .map(|answer| (answer.question_id, answer.answer))
            .collect();
        let current_index = clamp_index(response.attempt.current_question_index, &response.attempt);

        Self { attempt: response.attempt, answers, current_index, resumed: response.resumed }
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn current_index(&self) -> i32 {
        self.current_index
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn set_answer(&mut self, question_id: &str, text: &str) {
        self.answers.insert(question_id.to_string(), text.to_string());
    }

    /// Moves to `index`, kept inside the test. Returns the index actually selected.
    pub fn go_to(&mut self, index: i32) -> i32 {
        self.current_index = clamp_index(index, &self.attempt);
        self.current_index
    }

    pub fn resume_notice(&self) -> Option<&'static str> {
        self.resumed.then_some(RESUME_NOTICE)
    }

    pub fn submit_check<I, S>(&self, question_ids: I) -> SubmitCheck
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SubmitCheck::new(question_ids, &self.answers)
    }
}

fn clamp_index(index: i32, attempt: &Attempt) -> i32 {
    index.clamp(0, (attempt.total_questions - 1).max(0))
}

/// Questions still unanswered before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCheck {
    unanswered: Vec<String>,
}

/// Proof that the student agreed to submit with the listed gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitConfirmation {
    gaps: usize,
}

impl SubmitCheck {
    /// Blank or whitespace-only answers count as unanswered.
    pub fn new<I, S>(question_ids: I, answers: &HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unanswered = question_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| answers.get(id).map_or(true, |answer| answer.trim().is_empty()))
            .collect();
        Self { unanswered }
    }

    pub fn unanswered(&self) -> &[String] {
        &self.unanswered
    }

    pub fn is_complete(&self) -> bool {
        self.unanswered.is_empty()
    }

    pub fn confirm(&self) -> SubmitConfirmation {
        SubmitConfirmation { gaps: self.unanswered.len() }
    }

    pub fn authorize(&self, confirmation: Option<SubmitConfirmation>) -> Result<(), ClientError> {
        if self.is_complete() {
            return Ok(());
        }
        match confirmation {
            Some(confirmation) if confirmation.gaps == self.unanswered.len() => Ok(()),
            _ => Err(ClientError::Unanswered { count: self.unanswered.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{answer, attempt};

    fn start_response(resumed: bool, index: i32) -> StartResponse {
        let mut attempt = attempt("attempt-1");
        attempt.current_question_index = index;
        StartResponse {
            attempt,
            answers: vec![answer("attempt-1", "q0", "cat"), answer("attempt-1", "q1", "dog")],
            resumed,
        }
    }

    #[test]
    fn restore_jumps_to_the_saved_question() {
        let state = LocalAttemptState::restore(start_response(true, 2));

        assert_eq!(state.current_index(), 2);
        assert_eq!(state.answer("q0"), Some("cat"));
        assert_eq!(state.answer("q1"), Some("dog"));
        assert_eq!(state.answer("q2"), None);
        assert_eq!(state.resume_notice(), Some("Your answers were restored"));
    }

    #[test]
    fn fresh_attempt_has_no_notice() {
        let state = LocalAttemptState::restore(start_response(false, 0));
        assert_eq!(state.resume_notice(), None);
    }

    #[test]
    fn navigation_stays_inside_the_test() {
        let mut state = LocalAttemptState::restore(start_response(false, 0));
        assert_eq!(state.go_to(-3), 0);
        assert_eq!(state.go_to(2), 2);
        assert_eq!(state.go_to(10), 3);
    }

    #[test]
    fn submit_check_lists_blank_answers_as_gaps() {
        let mut state = LocalAttemptState::restore(start_response(false, 0));
        state.set_answer("q2", "   ");

        let check = state.submit_check(["q0", "q1", "q2", "q3"]);
        assert!(!check.is_complete());
        assert_eq!(check.unanswered(), ["q2".to_string(), "q3".to_string()]);
        assert!(matches!(check.authorize(None), Err(ClientError::Unanswered { count: 2 })));
        assert!(check.authorize(Some(check.confirm())).is_ok());
    }

    #[test]
    fn confirmation_is_bound_to_the_gap_count() {
        let answers = HashMap::new();
        let wide = SubmitCheck::new(["q0", "q1"], &answers);
        let narrow = SubmitCheck::new(["q0"], &answers);

        assert!(narrow.authorize(Some(wide.confirm())).is_err());
        assert!(SubmitCheck::new(Vec::<String>::new(), &answers).authorize(None).is_ok());
    }
}
