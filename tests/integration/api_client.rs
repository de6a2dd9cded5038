//! Tests for the REST client against a stub backend.
//!
//! Spins up a small axum server speaking the backend's JSON dialect
//! (`_id`, camelCase keys, kebab-case statuses, `{"message"}` error
//! bodies) and checks that [`ApiClient`] encodes requests and decodes
//! responses correctly.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::json;

use tasklive::api::{ApiClient, ApiError};
use tasklive_proto::task::{Task, TaskFilter, TaskForm, TaskId, TaskPatch, TaskStatus, UserRef};
use tasklive_proto::user::LoginForm;

fn make_task(id: &str, title: &str, status: TaskStatus) -> Task {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap();
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        description: String::new(),
        status,
        created_by: UserRef {
            id: "u1".to_string(),
            username: "alice".to_string(),
        },
        tags: vec![],
        created_at: at,
        updated_at: at,
    }
}

fn board() -> Vec<Task> {
    vec![
        make_task("t1", "Buy milk", TaskStatus::Pending),
        make_task("t2", "Write report", TaskStatus::InProgress),
        make_task("t3", "Ship release", TaskStatus::Completed),
    ]
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn login(Json(form): Json<LoginForm>) -> impl IntoResponse {
    if form.password == "secret" {
        (
            StatusCode::OK,
            Json(json!({
                "token": "jwt-abc",
                "user": {
                    "id": "u1",
                    "username": "alice",
                    "email": form.email,
                    "avatar": ""
                }
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid credentials" })),
        )
    }
}

async fn users(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) != Some("jwt-abc") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "token expired" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!([
            {
                "_id": "u1",
                "username": "alice",
                "email": "alice@example.com",
                "isOnline": true,
                "createdAt": "2025-01-15T09:00:00Z",
                "updatedAt": "2025-01-15T09:00:00Z"
            }
        ])),
    )
}

async fn list_tasks(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let filter = TaskFilter {
        status: params
            .get("status")
            .map(|s| serde_json::from_value(json!(s)).expect("valid status")),
        search: params.get("search").cloned(),
    };
    let tasks: Vec<Task> = board().into_iter().filter(|t| filter.matches(t)).collect();
    Json(tasks)
}

async fn create_task(Json(form): Json<TaskForm>) -> impl IntoResponse {
    let at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).single().unwrap();
    Json(Task {
        id: TaskId::from("server-assigned"),
        title: form.title,
        description: form.description,
        status: form.status,
        created_by: UserRef {
            id: "u1".to_string(),
            username: "alice".to_string(),
        },
        tags: form.tags,
        created_at: at,
        updated_at: at,
    })
}

async fn update_task(Path(id): Path<String>, Json(patch): Json<TaskPatch>) -> impl IntoResponse {
    let Some(mut task) = board().into_iter().find(|t| t.id.as_str() == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "task not found" })),
        )
            .into_response();
    };
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    Json(task).into_response()
}

async fn delete_task(Path(id): Path<String>) -> impl IntoResponse {
    if board().iter().any(|t| t.id.as_str() == id) {
        (StatusCode::OK, Json(json!({ "message": "task deleted" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "task not found" })),
        )
    }
}

/// Starts the stub backend and returns a client pointed at it.
async fn client() -> ApiClient {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/users", get(users))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task));
    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    ApiClient::new(&format!("http://{addr}/api/v1"), Duration::from_secs(2)).expect("client")
}

#[tokio::test]
async fn login_decodes_auth_response() {
    let api = client().await;
    let auth = api
        .login(&LoginForm {
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(auth.token, "jwt-abc");
    assert_eq!(auth.user.username, "alice");
}

#[tokio::test]
async fn bad_credentials_surface_the_server_message() {
    let api = client().await;
    let err = api
        .login(&LoginForm {
            email: "alice@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("invalid credentials"));
}

#[tokio::test]
async fn bearer_token_is_attached_once_set() {
    let mut api = client().await;

    let err = api.users().await.unwrap_err();
    assert!(err.is_unauthorized());

    api.set_token(Some("jwt-abc".to_string()));
    let users = api.users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].is_online);
}

#[tokio::test]
async fn unfiltered_fetch_returns_full_board() {
    let api = client().await;
    let tasks = api.tasks(&TaskFilter::default()).await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].id.as_str(), "t1");
}

#[tokio::test]
async fn filter_travels_as_query_parameters() {
    let api = client().await;

    let tasks = api
        .tasks(&TaskFilter {
            status: Some(TaskStatus::InProgress),
            search: None,
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Write report");

    let tasks = api
        .tasks(&TaskFilter {
            status: None,
            search: Some("ship".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id.as_str(), "t3");
}

#[tokio::test]
async fn create_returns_server_canonical_record() {
    let api = client().await;
    let task = api
        .create_task(&TaskForm {
            title: "New task".to_string(),
            description: "details".to_string(),
            status: TaskStatus::Pending,
            tags: vec!["work".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(task.id.as_str(), "server-assigned");
    assert_eq!(task.title, "New task");
    assert_eq!(task.tags, vec!["work"]);
}

#[tokio::test]
async fn update_applies_patch_server_side() {
    let api = client().await;
    let task = api
        .update_task(&TaskId::from("t1"), &TaskPatch::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(task.id.as_str(), "t1");
    assert_eq!(task.status, TaskStatus::Completed);
    // The stub leaves unpatched fields alone.
    assert_eq!(task.title, "Buy milk");
}

#[tokio::test]
async fn update_unknown_task_is_not_found() {
    let api = client().await;
    let err = api
        .update_task(&TaskId::from("ghost"), &TaskPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert!(err.to_string().contains("task not found"));
}

#[tokio::test]
async fn delete_discards_confirmation_body() {
    let api = client().await;
    api.delete_task(&TaskId::from("t1")).await.unwrap();
}

#[tokio::test]
async fn delete_unknown_task_is_not_found() {
    let api = client().await;
    let err = api.delete_task(&TaskId::from("ghost")).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let api = ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_millis(200))
        .expect("client");
    let err = api.tasks(&TaskFilter::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert!(!err.is_unauthorized());
}
