//! Process-local store used by the test suite and by `STORE_BACKEND=memory`.
//!
//! One mutex guards all tables, so every operation is a single atomic step.
//! Reference data comes from a [`MemorySeed`] since nothing here writes it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::types::Json;
use time::PrimitiveDateTime;
use tokio::sync::Mutex;

use super::{
    AnswerWrite, AttemptStore, Completion, Grader, NewAttempt, StartOutcome, StoreError,
};
use crate::core::time::primitive_now_utc;
use crate::db::models::{
    Answer, Classroom, ClassroomAttemptRow, Question, Student, Test, TestAttempt, User,
};
use crate::db::types::{AttemptStatus, QuestionType};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct MemorySeed {
    pub(crate) users: Vec<SeedUser>,
    pub(crate) students: Vec<SeedStudent>,
    pub(crate) classrooms: Vec<SeedClassroom>,
    pub(crate) enrollments: Vec<SeedEnrollment>,
    pub(crate) tests: Vec<SeedTest>,
    pub(crate) questions: Vec<SeedQuestion>,
    pub(crate) assignments: Vec<SeedAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedUser {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedStudent {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedClassroom {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedEnrollment {
    pub(crate) classroom_id: String,
    pub(crate) student_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedTest {
    pub(crate) id: String,
    pub(crate) sheet_id: String,
    pub(crate) title: String,
    pub(crate) variant_label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedQuestion {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) order_index: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) correct_answer: String,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedAssignment {
    pub(crate) test_id: String,
    pub(crate) classroom_id: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    students: HashMap<String, Student>,
    classrooms: HashMap<String, Classroom>,
    /// (classroom_id, student_id)
    enrollments: HashSet<(String, String)>,
    tests: HashMap<String, Test>,
    questions: Vec<Question>,
    /// (test_id, classroom_id)
    assignments: HashSet<(String, String)>,
    attempts: HashMap<String, TestAttempt>,
    /// Keyed by (attempt_id, question_id).
    answers: HashMap<(String, String), Answer>,
}

impl Tables {
    fn questions_for(&self, test_id: &str) -> Vec<Question> {
        let mut questions: Vec<Question> =
            self.questions.iter().filter(|q| q.test_id == test_id).cloned().collect();
        questions.sort_by_key(|q| q.order_index);
        questions
    }

    fn answers_for(&self, attempt_id: &str) -> Vec<Answer> {
        let mut answers: Vec<Answer> =
            self.answers.values().filter(|a| a.attempt_id == attempt_id).cloned().collect();
        answers.sort_by(|a, b| {
            a.answered_at.cmp(&b.answered_at).then_with(|| a.question_id.cmp(&b.question_id))
        });
        answers
    }

    fn in_progress_for(&self, student_id: &str, test_id: &str) -> Option<&TestAttempt> {
        self.attempts.values().find(|attempt| {
            attempt.student_id == student_id
                && attempt.test_id == test_id
                && attempt.status == AttemptStatus::InProgress
        })
    }

    fn is_enrolled(&self, classroom_id: &str, student_id: &str) -> bool {
        self.enrollments.contains(&(classroom_id.to_string(), student_id.to_string()))
    }

    fn is_assigned(&self, test_id: &str, classroom_id: &str) -> bool {
        self.assignments.contains(&(test_id.to_string(), classroom_id.to_string()))
    }
}

pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub(crate) fn from_seed(seed: MemorySeed) -> Self {
        let now = primitive_now_utc();
        let mut tables = Tables::default();

        for user in seed.users {
            tables.users.insert(
                user.id.clone(),
                User {
                    id: user.id,
                    email: user.email,
                    full_name: user.full_name,
                    is_active: true,
                    created_at: now,
                },
            );
        }
        for student in seed.students {
            tables.students.insert(
                student.id.clone(),
                Student {
                    id: student.id,
                    user_id: student.user_id,
                    display_name: student.display_name,
                    created_at: now,
                },
            );
        }
        for classroom in seed.classrooms {
            tables.classrooms.insert(
                classroom.id.clone(),
                Classroom {
                    id: classroom.id,
                    teacher_id: classroom.teacher_id,
                    name: classroom.name,
                    created_at: now,
                },
            );
        }
        for enrollment in seed.enrollments {
            tables.enrollments.insert((enrollment.classroom_id, enrollment.student_id));
        }
        for test in seed.tests {
            tables.tests.insert(
                test.id.clone(),
                Test {
                    id: test.id,
                    sheet_id: test.sheet_id,
                    title: test.title,
                    variant_label: test.variant_label,
                    created_at: now,
                },
            );
        }
        for question in seed.questions {
            tables.questions.push(Question {
                id: question.id,
                test_id: question.test_id,
                order_index: question.order_index,
                question_type: question.question_type,
                prompt: question.prompt,
                correct_answer: question.correct_answer,
                options: question.options.map(Json),
            });
        }
        for assignment in seed.assignments {
            tables.assignments.insert((assignment.test_id, assignment.classroom_id));
        }

        Self { tables: Mutex::new(tables) }
    }

    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let seed: MemorySeed = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid seed JSON in {}", path.display()))?;
        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(id).cloned())
    }

    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        Ok(self.tables.lock().await.students.get(id).cloned())
    }

    async fn find_test(&self, id: &str) -> Result<Option<Test>, StoreError> {
        Ok(self.tables.lock().await.tests.get(id).cloned())
    }

    async fn list_questions(&self, test_id: &str) -> Result<Vec<Question>, StoreError> {
        Ok(self.tables.lock().await.questions_for(test_id))
    }

    async fn find_question(
        &self,
        test_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.iter().find(|q| q.id == question_id && q.test_id == test_id).cloned())
    }

    async fn find_classroom(&self, id: &str) -> Result<Option<Classroom>, StoreError> {
        Ok(self.tables.lock().await.classrooms.get(id).cloned())
    }

    async fn is_test_assigned_to_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.enrollments.iter().any(|(classroom_id, enrolled)| {
            enrolled == student_id && tables.is_assigned(test_id, classroom_id)
        }))
    }

    async fn teaches_student_for_test(
        &self,
        teacher_user_id: &str,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.classrooms.values().any(|classroom| {
            classroom.teacher_id == teacher_user_id
                && tables.is_enrolled(&classroom.id, student_id)
                && tables.is_assigned(test_id, &classroom.id)
        }))
    }

    async fn is_test_assigned_to_classroom(
        &self,
        test_id: &str,
        classroom_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.is_assigned(test_id, classroom_id))
    }

    async fn start_or_resume(&self, attempt: NewAttempt) -> Result<StartOutcome, StoreError> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.in_progress_for(&attempt.student_id, &attempt.test_id) {
            let existing = existing.clone();
            let answers = tables.answers_for(&existing.id);
            return Ok(StartOutcome { attempt: existing, answers, created: false });
        }

        let created = TestAttempt {
            id: attempt.id.clone(),
            test_id: attempt.test_id,
            student_id: attempt.student_id,
            total_questions: attempt.total_questions,
            status: AttemptStatus::InProgress,
            started_at: attempt.started_at,
            completed_at: None,
            correct_answers: None,
            score: None,
            current_question_index: 0,
            updated_at: attempt.started_at,
        };
        tables.attempts.insert(attempt.id, created.clone());

        Ok(StartOutcome { attempt: created, answers: Vec::new(), created: true })
    }

    async fn find_attempt(&self, id: &str) -> Result<Option<TestAttempt>, StoreError> {
        Ok(self.tables.lock().await.attempts.get(id).cloned())
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(self.tables.lock().await.answers_for(attempt_id))
    }

    async fn update_progress(
        &self,
        id: &str,
        question_index: i32,
        now: PrimitiveDateTime,
    ) -> Result<Option<TestAttempt>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(attempt) = tables.attempts.get_mut(id) else {
            return Ok(None);
        };
        if attempt.status != AttemptStatus::InProgress {
            return Ok(None);
        }

        attempt.current_question_index = question_index;
        attempt.updated_at = now;
        Ok(Some(attempt.clone()))
    }

    async fn upsert_answer(&self, answer: AnswerWrite) -> Result<Option<Answer>, StoreError> {
        let mut tables = self.tables.lock().await;
        let in_progress = tables
            .attempts
            .get(&answer.attempt_id)
            .is_some_and(|attempt| attempt.status == AttemptStatus::InProgress);
        if !in_progress {
            return Ok(None);
        }

        let key = (answer.attempt_id.clone(), answer.question_id.clone());

        if let Some(stored) = tables.answers.get_mut(&key) {
            if stored.answered_at <= answer.answered_at {
                stored.answer = answer.answer;
                stored.answered_at = answer.answered_at;
            }
            return Ok(Some(stored.clone()));
        }

        let inserted = Answer {
            id: answer.id,
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            answer: answer.answer,
            is_correct: None,
            answered_at: answer.answered_at,
        };
        tables.answers.insert(key, inserted.clone());
        Ok(Some(inserted))
    }

    async fn complete_attempt(
        &self,
        id: &str,
        completed_at: PrimitiveDateTime,
        grader: Grader,
    ) -> Result<Completion, StoreError> {
        let mut tables = self.tables.lock().await;

        let Some(attempt) = tables.attempts.get(id).cloned() else {
            return Ok(Completion::Missing);
        };
        if attempt.status.is_terminal() {
            return Ok(Completion::AlreadyTerminal(attempt));
        }

        let answers = tables.answers_for(id);
        let questions = tables.questions_for(&attempt.test_id);
        let report = grader(&attempt, &answers, &questions);

        for result in report.results.iter().filter(|result| result.answered) {
            let key = (id.to_string(), result.question_id.clone());
            if let Some(stored) = tables.answers.get_mut(&key) {
                stored.is_correct = Some(result.is_correct);
            }
        }

        let graded = tables
            .attempts
            .get_mut(id)
            .ok_or_else(|| StoreError::Invariant(format!("attempt {id} vanished under lock")))?;
        graded.status = AttemptStatus::Submitted;
        graded.correct_answers = Some(report.correct_answers);
        graded.score = Some(report.score);
        graded.completed_at = Some(completed_at);
        graded.updated_at = completed_at;

        Ok(Completion::Graded { attempt: graded.clone(), report })
    }

    async fn list_classroom_attempts(
        &self,
        classroom_id: &str,
        test_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<ClassroomAttemptRow>, i64), StoreError> {
        let tables = self.tables.lock().await;

        let mut matching: Vec<&TestAttempt> = tables
            .attempts
            .values()
            .filter(|attempt| {
                attempt.test_id == test_id && tables.is_enrolled(classroom_id, &attempt.student_id)
            })
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let rows = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.clamp(1, 1000) as usize)
            .map(|attempt| ClassroomAttemptRow {
                attempt: attempt.clone(),
                student_name: tables
                    .students
                    .get(&attempt.student_id)
                    .map(|student| student.display_name.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Ok((rows, total))
    }
}
