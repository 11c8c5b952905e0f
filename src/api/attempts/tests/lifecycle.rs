use super::{answer, call, complete, get_attempt, progress, start, start_new, token};
use crate::test_support::{self, ids};
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn second_start_resumes_the_same_attempt() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let (status, first) = start(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::CREATED, "response: {first}");
    assert_eq!(first["resumed"], false);
    assert_eq!(first["attempt"]["status"], "IN_PROGRESS");
    assert_eq!(first["attempt"]["totalQuestions"], 4);
    assert_eq!(first["attempt"]["currentQuestionIndex"], 0);
    assert!(first["attempt"]["score"].is_null());

    let (status, second) = start(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::OK, "response: {second}");
    assert_eq!(second["resumed"], true);
    assert_eq!(second["attempt"]["id"], first["attempt"]["id"]);
}

#[tokio::test]
async fn concurrent_starts_share_one_attempt() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = ctx.app.clone();
        let request = test_support::json_request(
            Method::POST,
            "/api/v1/tests/attempts/start",
            Some(&student),
            Some(json!({ "testId": ids::TEST_FOUR, "studentId": ids::STUDENT_S })),
        );
        handles.push(tokio::spawn(async move {
            let response = app.oneshot(request).await.expect("response");
            let status = response.status();
            (status, test_support::read_json(response).await)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("join"));
    }

    let created = results.iter().filter(|(status, _)| *status == StatusCode::CREATED).count();
    assert_eq!(created, 1);
    let first_id = &results[0].1["attempt"]["id"];
    assert!(results.iter().all(|(_, body)| &body["attempt"]["id"] == first_id));
}

#[tokio::test]
async fn completed_attempt_allows_a_fresh_start() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let first = start_new(&ctx, &student, ids::TEST_HELLO, ids::STUDENT_S).await;
    let (status, _) = complete(&ctx, &student, &first).await;
    assert_eq!(status, StatusCode::OK);

    let second = start_new(&ctx, &student, ids::TEST_HELLO, ids::STUDENT_S).await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn resubmitting_an_answer_keeps_one_row() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);
    let attempt_id = start_new(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;
    let question_id = ids::question(ids::TEST_FOUR, 0);

    for text in ["aple", "apple"] {
        let (status, body) = answer(&ctx, &student, &attempt_id, &question_id, text).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["answer"]["answer"], text);
        assert!(body["answer"]["isCorrect"].is_null());
    }

    let (status, body) = get_attempt(&ctx, &student, &attempt_id).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let answers = body["answers"].as_array().expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0]["answer"], "apple");
    assert_eq!(answers[0]["questionId"], question_id);
}

#[tokio::test]
async fn resume_restores_answers_and_position() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);
    let attempt_id = start_new(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;

    answer(&ctx, &student, &attempt_id, &ids::question(ids::TEST_FOUR, 0), "apple").await;
    answer(&ctx, &student, &attempt_id, &ids::question(ids::TEST_FOUR, 1), "banana").await;
    let (status, body) = progress(&ctx, &student, &attempt_id, 2).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body, json!({}));

    let (status, resumed) = start(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::OK, "response: {resumed}");
    assert_eq!(resumed["resumed"], true);
    assert_eq!(resumed["attempt"]["id"], attempt_id.as_str());
    assert_eq!(resumed["attempt"]["currentQuestionIndex"], 2);

    let mut restored: Vec<(String, String)> = resumed["answers"]
        .as_array()
        .expect("answers")
        .iter()
        .map(|a| {
            let question_id = a["questionId"].as_str().expect("questionId").to_string();
            (question_id, a["answer"].as_str().expect("answer").to_string())
        })
        .collect();
    restored.sort();
    assert_eq!(
        restored,
        vec![
            (ids::question(ids::TEST_FOUR, 0), "apple".to_string()),
            (ids::question(ids::TEST_FOUR, 1), "banana".to_string()),
        ]
    );
}

#[tokio::test]
async fn progress_outside_the_test_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);
    let attempt_id = start_new(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;

    for index in [-1, 4, 99] {
        let (status, body) = progress(&ctx, &student, &attempt_id, index).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "index {index}: {body}");
        assert_eq!(body["kind"], "validation");
    }

    let (status, _) = progress(&ctx, &student, &attempt_id, 3).await;
    assert_eq!(status, StatusCode::OK);
    // Idempotent
    let (status, _) = progress(&ctx, &student, &attempt_id, 3).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn writes_after_completion_conflict() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);
    let attempt_id = start_new(&ctx, &student, ids::TEST_HELLO, ids::STUDENT_S).await;
    complete(&ctx, &student, &attempt_id).await;

    let (status, body) =
        answer(&ctx, &student, &attempt_id, &ids::question(ids::TEST_HELLO, 0), "hello").await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["detail"], "Attempt already completed");

    let (status, body) = progress(&ctx, &student, &attempt_id, 0).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
}

#[tokio::test]
async fn answer_for_question_outside_the_test_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);
    let attempt_id = start_new(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;

    let (status, body) =
        answer(&ctx, &student, &attempt_id, &ids::question(ids::TEST_HELLO, 0), "hello").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
}

#[tokio::test]
async fn start_edge_cases() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let (status, body) = start(&ctx, &student, ids::TEST_EMPTY, ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Test has no questions");

    let (status, body) = start(&ctx, &student, ids::TEST_UNASSIGNED, ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");

    let (status, body) = start(&ctx, &student, "missing-test", ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");

    let (status, body) = start(&ctx, &student, "", ids::STUDENT_S).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn unreadable_bodies_are_validation_errors() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let (status, body) = call(
        &ctx,
        Method::POST,
        "/api/v1/tests/attempts/start",
        Some(&student),
        Some(json!({ "testId": ids::TEST_FOUR })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["status"], 400);

    let attempt_id = start_new(&ctx, &student, ids::TEST_FOUR, ids::STUDENT_S).await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/tests/attempts/{attempt_id}/answer"))
        .header(axum::http::header::AUTHORIZATION, format!("Bearer {student}"))
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"questionId\": "))
        .expect("request");
    let response = ctx.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["kind"], "validation");

    let (status, body) = progress(&ctx, &student, &attempt_id, -1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;

    let (status, body) = call(
        &ctx,
        Method::POST,
        "/api/v1/tests/attempts/start",
        None,
        Some(json!({ "testId": ids::TEST_FOUR, "studentId": ids::STUDENT_S })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");

    let (status, _) = get_attempt(&ctx, "garbage", "whatever").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = token(&ctx, "user-nobody");
    let (status, _) = get_attempt(&ctx, &unknown, "whatever").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_attempt_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let student = token(&ctx, ids::USER_S);

    let (status, body) = get_attempt(&ctx, &student, "no-such-attempt").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["kind"], "not_found");
}
