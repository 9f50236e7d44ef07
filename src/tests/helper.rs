use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::ACCESS_CONTROL_REQUEST_HEADERS;
use axum::http::header::ACCESS_CONTROL_REQUEST_METHOD;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::ORIGIN;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tower::Service;

use crate::api::DEFAULT_EXPIRES_IN;
use crate::api::JwtKeys;
use crate::setup_storage;
use crate::storage::Memory;
use crate::users::InitialUser;

/// Test helper version of the user response
#[derive(Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Test helper version of the note response
#[derive(Debug, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub date: String,
    pub user_id: i64,
    pub message: String,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Setup the calendar app on memory storage
///
/// The administrative account is `admin` with password `verysecret`
pub async fn setup_test_app() -> Router {
    let initial_user = InitialUser {
        username: "admin".to_string(),
        password: "verysecret".to_string(),
    };

    setup_storage(
        Memory::new(),
        JwtKeys::new(b"verysecret", DEFAULT_EXPIRES_IN),
        &initial_user,
    )
    .await
    .unwrap()
}

/// Send a request and collect the status code and the JSON body
///
/// An empty body is returned as `Value::Null`
pub async fn send(
    app: &mut Router,
    method: Method,
    uri: &str,
    access_token: Option<&str>,
    payload: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(access_token) = access_token {
        builder = builder.header(AUTHORIZATION, access_token);
    }

    let request = if let Some(payload) = payload {
        builder
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, get_value(&body))
}

/// Send a raw body to an endpoint, with or without the JSON content type
pub async fn send_raw_body(
    app: &mut Router,
    uri: &str,
    access_token: &str,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Error>) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder
        .header(AUTHORIZATION, access_token)
        .body(Body::from(body.as_bytes()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::BAD_REQUEST {
            get_value(&body).as_object().map(value_to_error)
        } else {
            None
        },
    )
}

pub async fn maybe_login(
    app: &mut Router,
    username: &str,
    password: &str,
) -> (StatusCode, Option<String>, Option<String>) {
    let payload = json!({ "username": username, "password": password });

    let (status_code, body) = send(app, Method::POST, "/login", None, Some(payload)).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_access_token(&body))
        } else {
            None
        },
        get_error_message(status_code, &body),
    )
}

/// Login as the administrative account
pub async fn login(app: &mut Router) -> String {
    let (status_code, access_token, _) = maybe_login(app, "admin", "verysecret").await;

    assert_eq!(StatusCode::OK, status_code);

    access_token.unwrap()
}

pub async fn maybe_register(
    app: &mut Router,
    username: &str,
    password: &str,
) -> (StatusCode, Option<(i64, String)>, Option<String>) {
    let payload = json!({ "username": username, "password": password });

    let (status_code, body) = send(app, Method::POST, "/register", None, Some(payload)).await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some((body["user_id"].as_i64().unwrap(), get_access_token(&body)))
        } else {
            None
        },
        get_error_message(status_code, &body),
    )
}

/// Register a new account, returns its ID and access token
pub async fn register(app: &mut Router, username: &str) -> (i64, String) {
    let (status_code, registered, _) = maybe_register(app, username, "verysecret").await;

    assert_eq!(StatusCode::CREATED, status_code);

    registered.unwrap()
}

pub async fn current_user(app: &mut Router, access_token: &str) -> (StatusCode, Option<User>) {
    let (status_code, body) = send(app, Method::GET, "/users/me", Some(access_token), None).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            body.as_object().map(value_to_user)
        } else {
            None
        },
    )
}

pub async fn list_users(
    app: &mut Router,
    uri: &str,
    access_token: Option<&str>,
) -> (StatusCode, Option<Vec<User>>) {
    let (status_code, body) = send(app, Method::GET, uri, access_token, None).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_users(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_date(
    app: &mut Router,
    access_token: &str,
    payload: Value,
) -> (StatusCode, Value, Option<String>) {
    let (status_code, body) =
        send(app, Method::POST, "/date", Some(access_token), Some(payload)).await;
    let error = get_error_message(status_code, &body);

    (status_code, body, error)
}

pub async fn single_date(app: &mut Router, access_token: &str, date: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::GET,
        &format!("/date/{date}"),
        Some(access_token),
        None,
    )
    .await
}

pub async fn maybe_update_date(
    app: &mut Router,
    access_token: &str,
    date: &str,
    payload: Value,
) -> (StatusCode, Value, Option<String>) {
    let (status_code, body) = send(
        app,
        Method::PATCH,
        &format!("/date/{date}"),
        Some(access_token),
        Some(payload),
    )
    .await;
    let error = get_error_message(status_code, &body);

    (status_code, body, error)
}

pub async fn delete_date(app: &mut Router, access_token: &str, date: &str) -> StatusCode {
    let (status_code, _) = send(
        app,
        Method::DELETE,
        &format!("/date/{date}"),
        Some(access_token),
        None,
    )
    .await;

    status_code
}

pub async fn month(
    app: &mut Router,
    access_token: &str,
    year: &str,
    month: &str,
) -> (StatusCode, Value) {
    send(
        app,
        Method::GET,
        &format!("/month/{year}/{month}"),
        Some(access_token),
        None,
    )
    .await
}

pub async fn maybe_create_note(
    app: &mut Router,
    access_token: &str,
    date: &str,
    user_id: i64,
    message: &str,
) -> (StatusCode, Option<Note>, Option<String>) {
    let payload = json!({ "date": date, "user_id": user_id, "message": message });

    let (status_code, body) =
        send(app, Method::POST, "/notes", Some(access_token), Some(payload)).await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            body.as_object().map(value_to_note)
        } else {
            None
        },
        get_error_message(status_code, &body),
    )
}

pub async fn single_note(
    app: &mut Router,
    access_token: &str,
    note_id: &str,
) -> (StatusCode, Option<Note>, Option<String>) {
    let (status_code, body) = send(
        app,
        Method::GET,
        &format!("/note/{note_id}"),
        Some(access_token),
        None,
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            body.as_object().map(value_to_note)
        } else {
            None
        },
        get_error_message(status_code, &body),
    )
}

pub async fn maybe_update_note(
    app: &mut Router,
    access_token: &str,
    note_id: i64,
    message: &str,
) -> (StatusCode, Option<Note>, Option<String>) {
    let payload = json!({ "message": message });

    let (status_code, body) = send(
        app,
        Method::PATCH,
        &format!("/note/{note_id}"),
        Some(access_token),
        Some(payload),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            body.as_object().map(value_to_note)
        } else {
            None
        },
        get_error_message(status_code, &body),
    )
}

pub async fn delete_note(app: &mut Router, access_token: &str, note_id: i64) -> StatusCode {
    let (status_code, _) = send(
        app,
        Method::DELETE,
        &format!("/note/{note_id}"),
        Some(access_token),
        None,
    )
    .await;

    status_code
}

/// Send a CORS preflight request from a browser on another origin
pub async fn preflight(
    app: &mut Router,
    uri: &str,
    origin: &str,
    method: Method,
) -> (StatusCode, HeaderMap) {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header(ORIGIN, origin)
        .header(ACCESS_CONTROL_REQUEST_METHOD, method.as_str())
        .header(ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();

    (response.status(), response.headers().clone())
}

/// User IDs of the `users` field of a date response
pub fn user_ids(value: &Value) -> Vec<i64> {
    value["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["id"].as_i64().unwrap())
        .collect()
}

fn value_to_user(user: &Map<String, Value>) -> User {
    User {
        id: user["id"].as_i64().unwrap(),
        username: user["username"].as_str().map(ToString::to_string).unwrap(),
    }
}

fn get_users(body: &Value) -> Vec<User> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_user)
        .collect()
}

fn value_to_note(note: &Map<String, Value>) -> Note {
    Note {
        id: note["id"].as_i64().unwrap(),
        date: note["date"].as_str().map(ToString::to_string).unwrap(),
        user_id: note["user"]["id"].as_i64().unwrap(),
        message: note["message"].as_str().map(ToString::to_string).unwrap(),
    }
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    }
}

fn get_value(body: &Bytes) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&body[..]).unwrap()
    }
}

fn get_error_message(status_code: StatusCode, body: &Value) -> Option<String> {
    if status_code.is_client_error() {
        body["error"].as_str().map(ToString::to_string)
    } else {
        None
    }
}

fn get_access_token(body: &Value) -> String {
    assert_eq!(Some("Bearer"), body["token_type"].as_str());

    body["token"]
        .as_str()
        .map(|token| format!("Bearer {token}"))
        .unwrap()
}
