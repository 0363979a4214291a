#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use course_server::{
    config::Config,
    db,
    server::{Server, router},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::default();
    config.auth.jwt_secret = Some("integration-test-secret".to_string());
    configure(&mut config);
    let database = db::connect_in_memory().await.unwrap();
    let server = Server::new(config, database).unwrap();
    router(Arc::new(server))
}

pub async fn create_test_app() -> Router {
    create_test_app_with(|_| {}).await
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).to_string(),
        ))
    };
    (status, value)
}

/// Registers an account and returns (token, user id).
pub async fn register(app: &Router, username: &str, role: &str) -> (String, i64) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret-password",
            "firstName": "Test",
            "lastName": "User",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_i64().unwrap(),
    )
}

/// Course with two lessons and a two question quiz, owned by `token`.
pub async fn create_course_with_quiz(app: &Router, token: &str) -> (i64, Vec<Value>) {
    let (status, course) = send(
        app,
        Method::POST,
        "/courses/create",
        Some(token),
        Some(json!({
            "title": "Java Basics",
            "description": "A thorough introduction for complete beginners",
            "difficulty": "Beginner",
            "hours": 12,
            "price": "49.99",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    let course_id = course["id"].as_i64().unwrap();
    let mut lessons = Vec::new();
    for order in 1..=2 {
        let (status, lesson) = send(
            app,
            Method::POST,
            "/lessons/create",
            Some(token),
            Some(json!({
                "courseId": course_id,
                "title": format!("Lesson number {order}"),
                "chapters": ["Introduction", "Basic concepts", "Coding examples"],
                "order": order,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{lesson}");
        lessons.push(lesson);
    }
    let options = json!(["Option A", "Option B", "Option C", "Option D"]);
    let (status, quiz) = send(
        app,
        Method::POST,
        "/quiz/add",
        Some(token),
        Some(json!({
            "courseId": course_id,
            "questions": [
                {"question": "What is a class?", "options": options, "answer": "Option A"},
                {"question": "What is an object?", "options": options, "answer": "Option B"},
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{quiz}");
    (course_id, lessons)
}

pub async fn complete_lesson(
    app: &Router,
    token: &str,
    user_id: i64,
    course_id: i64,
    lesson: &Value,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!(
            "/lesson-progress/complete/{user_id}/{course_id}/{}",
            lesson["id"]
        ),
        Some(token),
        Some(json!({ "checkedChapters": lesson["chapters"] })),
    )
    .await
}
