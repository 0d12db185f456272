mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{offline_app, send, token, SECRET};
use seio_backend::{models::user::Role, utils::token::issue_token};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn health_is_public_and_reports_an_unreachable_database() {
    let app = offline_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn api_rejects_missing_token() {
    let app = offline_app();
    let (status, body) = send(&app, "GET", "/api/questionnaires", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "missing_authorization");
}

#[tokio::test]
async fn api_rejects_bad_and_expired_tokens() {
    let app = offline_app();
    let (status, body) = send(&app, "GET", "/api/indicators", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let expired = issue_token(SECRET, Uuid::new_v4(), Role::Teacher, Duration::hours(-2)).unwrap();
    let (status, _) = send(&app, "GET", "/api/indicators", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = issue_token("other-secret", Uuid::new_v4(), Role::Admin, Duration::hours(1)).unwrap();
    let (status, _) = send(&app, "GET", "/api/indicators", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_manage_grades() {
    let app = offline_app();
    let student = token(Uuid::new_v4(), Role::Student);

    let (status, body) = send(
        &app,
        "POST",
        "/api/recalculate-phase-averages/1",
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/students/1/grades",
        Some(&student),
        Some(json!({"phase2": 4.5})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/quiz-attempts/1",
        Some(&student),
        Some(json!({"score": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_staff_author_questionnaires_and_indicators() {
    let app = offline_app();
    let student = token(Uuid::new_v4(), Role::Student);
    let payload = json!({
        "title": "Fractions",
        "phase": 1,
        "grade": "4",
        "category": "math",
        "questions": []
    });
    let (status, _) = send(&app, "POST", "/api/questionnaires", Some(&student), Some(payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/api/indicators",
        Some(&student),
        Some(json!({"description": "Adds fractions", "subject": "math", "phase": 1, "grade": "4"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teachers_cannot_submit_quizzes() {
    let app = offline_app();
    let teacher = token(Uuid::new_v4(), Role::Teacher);
    let (status, _) = send(
        &app,
        "POST",
        "/api/quiz/submit",
        Some(&teacher),
        Some(json!({"student_id": 1, "questionnaire_id": 1, "answers": {"1": 2}})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_payloads_use_the_error_envelope() {
    let app = offline_app();
    let student = token(Uuid::new_v4(), Role::Student);

    let (status, body) = send(
        &app,
        "POST",
        "/api/quiz/submit",
        Some(&student),
        Some(json!({"student_id": 0, "questionnaire_id": 3, "answers": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");

    let admin = token(Uuid::new_v4(), Role::Admin);
    let (status, body) = send(&app, "POST", "/api/recalculate-phase-averages/0", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn role_checks_run_before_body_checks() {
    let app = offline_app();
    let student = token(Uuid::new_v4(), Role::Student);
    let (status, body) = send(
        &app,
        "PUT",
        "/api/students/1/grades",
        Some(&student),
        Some(json!({"phase1": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn malformed_requests_get_the_error_envelope() {
    let app = offline_app();
    let student = token(Uuid::new_v4(), Role::Student);

    let (status, body) = send(
        &app,
        "POST",
        "/api/quiz/submit",
        Some(&student),
        Some(json!({"questionnaire_id": 3, "answers": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("student_id"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/quiz/submit",
        Some(&student),
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, "GET", "/api/quiz/attempts/abc/1", Some(&student), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = send(&app, "GET", "/api/questionnaires?phase=first", Some(&student), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
