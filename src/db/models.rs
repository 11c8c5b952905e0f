use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Student profile. `user_id` links it to the login identity; the two ids are
/// never interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) display_name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Classroom {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: String,
    pub(crate) sheet_id: String,
    pub(crate) title: String,
    pub(crate) variant_label: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) order_index: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) correct_answer: String,
    pub(crate) options: Option<Json<Vec<String>>>,
}

impl Question {
    pub(crate) fn options(&self) -> &[String] {
        self.options.as_ref().map(|options| options.0.as_slice()).unwrap_or(&[])
    }

    /// The correct answer must be one of the options whenever options exist.
    pub(crate) fn has_consistent_options(&self) -> bool {
        let options = self.options();
        options.is_empty() || options.iter().any(|option| option == &self.correct_answer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestAttempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) total_questions: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) score: Option<i32>,
    pub(crate) current_question_index: i32,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// Attempt joined with the student's display name for classroom result lists.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ClassroomAttemptRow {
    #[sqlx(flatten)]
    pub(crate) attempt: TestAttempt,
    pub(crate) student_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: Option<Vec<&str>>, correct: &str) -> Question {
        Question {
            id: "q1".to_string(),
            test_id: "t1".to_string(),
            order_index: 0,
            question_type: QuestionType::MultipleChoice,
            prompt: "Pick one".to_string(),
            correct_answer: correct.to_string(),
            options: options.map(|items| Json(items.into_iter().map(String::from).collect())),
        }
    }

    #[test]
    fn options_must_contain_correct_answer() {
        assert!(question(Some(vec!["cat", "dog"]), "dog").has_consistent_options());
        assert!(!question(Some(vec!["cat", "dog"]), "bird").has_consistent_options());
    }

    #[test]
    fn questions_without_options_are_consistent() {
        let q = question(None, "anything");
        assert!(q.options().is_empty());
        assert!(q.has_consistent_options());
    }
}
