use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, security, state::AppState};
use crate::db::types::QuestionType;
use crate::repositories::memory::{
    MemorySeed, SeedAssignment, SeedClassroom, SeedEnrollment, SeedQuestion, SeedStudent,
    SeedTest, SeedUser,
};
use crate::repositories::MemoryStore;

const TEST_SECRET_KEY: &str = "test-secret";

/// Identifiers of the standard fixture.
///
/// Teacher T runs C1, teacher T2 runs C2. Student S sits in both classrooms,
/// student S2 only in C1. Every test except `TEST_UNASSIGNED` is assigned to C1.
pub(crate) mod ids {
    pub(crate) const USER_T: &str = "user-teacher-t";
    pub(crate) const USER_T2: &str = "user-teacher-t2";
    pub(crate) const USER_S: &str = "user-student-s";
    pub(crate) const USER_S2: &str = "user-student-s2";
    pub(crate) const STUDENT_S: &str = "student-s";
    pub(crate) const STUDENT_S2: &str = "student-s2";
    pub(crate) const CLASSROOM_C1: &str = "classroom-c1";
    pub(crate) const CLASSROOM_C2: &str = "classroom-c2";
    /// apple, banana, cherry (multiple choice), date
    pub(crate) const TEST_FOUR: &str = "test-four";
    /// hello
    pub(crate) const TEST_HELLO: &str = "test-hello";
    pub(crate) const TEST_EMPTY: &str = "test-empty";
    pub(crate) const TEST_UNASSIGNED: &str = "test-unassigned";

    pub(crate) fn question(test_id: &str, index: usize) -> String {
        format!("{test_id}-q{index}")
    }
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("WORDCHECK_ENV", "test");
    std::env::set_var("WORDCHECK_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("STORE_BACKEND", "memory");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("PROJECT_NAME");
    std::env::remove_var("AUTOSAVE_ANSWER_DEBOUNCE_MS");
    std::env::remove_var("AUTOSAVE_PROGRESS_DEBOUNCE_MS");
    std::env::remove_var("MEMORY_SEED_FILE");
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(|| {}).await
}

/// Like [`setup_test_context`], with `configure` run after the default test env is applied.
pub(crate) async fn setup_test_context_with(configure: impl FnOnce()) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    configure();

    let settings = Settings::load().expect("settings");
    let state = AppState::new(settings, Arc::new(standard_store()));
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

#[derive(Default)]
pub(crate) struct Fixture {
    seed: MemorySeed,
}

impl Fixture {
    pub(crate) fn user(mut self, id: &str, full_name: &str) -> Self {
        self.seed.users.push(SeedUser {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            full_name: full_name.to_string(),
        });
        self
    }

    pub(crate) fn student(mut self, id: &str, user_id: &str, display_name: &str) -> Self {
        self = self.user(user_id, display_name);
        self.seed.students.push(SeedStudent {
            id: id.to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    pub(crate) fn classroom(mut self, id: &str, teacher_id: &str) -> Self {
        self.seed.classrooms.push(SeedClassroom {
            id: id.to_string(),
            teacher_id: teacher_id.to_string(),
            name: format!("Classroom {id}"),
        });
        self
    }

    pub(crate) fn enroll(mut self, classroom_id: &str, student_id: &str) -> Self {
        self.seed.enrollments.push(SeedEnrollment {
            classroom_id: classroom_id.to_string(),
            student_id: student_id.to_string(),
        });
        self
    }

    /// Adds a test with one spelling question per word, ids from [`ids::question`].
    pub(crate) fn test(mut self, id: &str, words: &[&str]) -> Self {
        self.seed.tests.push(SeedTest {
            id: id.to_string(),
            sheet_id: format!("sheet-{id}"),
            title: format!("Test {id}"),
            variant_label: "A".to_string(),
        });
        for (index, word) in words.iter().enumerate() {
            self.seed.questions.push(SeedQuestion {
                id: ids::question(id, index),
                test_id: id.to_string(),
                order_index: index as i32,
                question_type: QuestionType::Spelling,
                prompt: format!("Spell word number {}", index + 1),
                correct_answer: word.to_string(),
                options: None,
            });
        }
        self
    }

    /// Turns an existing question into multiple choice.
    pub(crate) fn with_options(mut self, test_id: &str, index: usize, options: &[&str]) -> Self {
        let question_id = ids::question(test_id, index);
        if let Some(question) = self.seed.questions.iter_mut().find(|q| q.id == question_id) {
            question.question_type = QuestionType::MultipleChoice;
            question.options = Some(options.iter().map(|option| option.to_string()).collect());
        }
        self
    }

    pub(crate) fn assign(mut self, test_id: &str, classroom_id: &str) -> Self {
        self.seed.assignments.push(SeedAssignment {
            test_id: test_id.to_string(),
            classroom_id: classroom_id.to_string(),
        });
        self
    }

    pub(crate) fn build(self) -> MemoryStore {
        MemoryStore::from_seed(self.seed)
    }
}

pub(crate) fn standard_fixture() -> Fixture {
    Fixture::default()
        .user(ids::USER_T, "Teacher T")
        .user(ids::USER_T2, "Teacher T2")
        .student(ids::STUDENT_S, ids::USER_S, "Student S")
        .student(ids::STUDENT_S2, ids::USER_S2, "Student S2")
        .classroom(ids::CLASSROOM_C1, ids::USER_T)
        .classroom(ids::CLASSROOM_C2, ids::USER_T2)
        .enroll(ids::CLASSROOM_C1, ids::STUDENT_S)
        .enroll(ids::CLASSROOM_C2, ids::STUDENT_S)
        .enroll(ids::CLASSROOM_C1, ids::STUDENT_S2)
        .test(ids::TEST_FOUR, &["apple", "banana", "cherry", "date"])
        .with_options(ids::TEST_FOUR, 2, &["cherry", "cheery", "sherry"])
        .test(ids::TEST_HELLO, &["hello"])
        .test(ids::TEST_EMPTY, &[])
        .test(ids::TEST_UNASSIGNED, &["orphan"])
        .assign(ids::TEST_FOUR, ids::CLASSROOM_C1)
        .assign(ids::TEST_HELLO, ids::CLASSROOM_C1)
        .assign(ids::TEST_EMPTY, ids::CLASSROOM_C1)
}

pub(crate) fn standard_store() -> MemoryStore {
    standard_fixture().build()
}

pub(crate) fn bearer_token(user_id: &str, settings: &Settings) -> String {
    security::create_access_token(user_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
