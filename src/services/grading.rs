//! Answer comparison and score derivation.
//!
//! Everything here is a pure function of its inputs; completion relies on that
//! to stay idempotent.

use std::collections::HashMap;

use crate::db::models::{Answer, Question, TestAttempt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) answered: bool,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradeReport {
    pub(crate) correct_answers: i32,
    pub(crate) score: i32,
    pub(crate) results: Vec<QuestionResult>,
}

#[cfg(test)]
impl GradeReport {
    pub(crate) fn result_for(&self, question_id: &str) -> Option<&QuestionResult> {
        self.results.iter().find(|result| result.question_id == question_id)
    }
}

/// Case-insensitive comparison that ignores surrounding whitespace.
pub(crate) fn answers_match(submitted: &str, expected: &str) -> bool {
    normalize(submitted) == normalize(expected)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// `round(correct / total * 100)` with halves rounded up, in integer arithmetic.
/// A zero-question denominator scores 0.
pub(crate) fn score_percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }

    let total = i64::from(total);
    let correct = i64::from(correct).clamp(0, total);
    ((correct * 200 + total) / (2 * total)) as i32
}

/// Grades every question against the stored answers. Missing answers count as
/// incorrect and the denominator is always `total_questions`.
pub(crate) fn grade(
    total_questions: i32,
    answers: &[Answer],
    questions: &[Question],
) -> GradeReport {
    let by_question: HashMap<&str, &Answer> =
        answers.iter().map(|answer| (answer.question_id.as_str(), answer)).collect();

    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|question| question.order_index);

    let results: Vec<QuestionResult> = ordered
        .into_iter()
        .map(|question| {
            let submitted = by_question.get(question.id.as_str());
            QuestionResult {
                question_id: question.id.clone(),
                answered: submitted.is_some(),
                is_correct: submitted
                    .map(|answer| answers_match(&answer.answer, &question.correct_answer))
                    .unwrap_or(false),
            }
        })
        .collect();

    let correct = results.iter().filter(|result| result.is_correct).count() as i32;
    let correct_answers = if total_questions > 0 { correct.min(total_questions) } else { correct };

    GradeReport { correct_answers, score: score_percent(correct_answers, total_questions), results }
}

/// Grading entry point handed to the store so it can run inside the completion transaction.
pub(crate) fn grade_attempt(
    attempt: &TestAttempt,
    answers: &[Answer],
    questions: &[Question],
) -> GradeReport {
    grade(attempt.total_questions, answers, questions)
}
