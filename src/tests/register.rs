use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_register() {
    let mut app = helper::setup_test_app().await;

    let (status_code, registered, error) =
        helper::maybe_register(&mut app, "matt", "verysecret").await;
    assert_eq!(StatusCode::CREATED, status_code);
    assert!(error.is_none());

    let (user_id, access_token) = registered.unwrap();
    assert_eq!(2, user_id);

    let (status_code, user) = helper::current_user(&mut app, &access_token).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        Some(helper::User {
            id: 2,
            username: "matt".to_string(),
        }),
        user
    );

    // the new account can login as well
    let (status_code, access_token, _) = helper::maybe_login(&mut app, "matt", "verysecret").await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(access_token.is_some());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let mut app = helper::setup_test_app().await;

    helper::register(&mut app, "matt").await;

    let (status_code, registered, error) =
        helper::maybe_register(&mut app, "matt", "othersecret").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert!(registered.is_none());
    assert_eq!(Some("Username already exists".to_string()), error);

    let (status_code, _, error) = helper::maybe_register(&mut app, "admin", "verysecret").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Username already exists".to_string()), error);
}

#[tokio::test]
async fn test_register_invalid_username() {
    let mut app = helper::setup_test_app().await;

    let (status_code, _, error) = helper::maybe_register(&mut app, "  ", "verysecret").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Username can not be empty".to_string()), error);

    let (status_code, _, error) =
        helper::maybe_register(&mut app, &"m".repeat(151), "verysecret").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Username is too long".to_string()), error);
}

#[tokio::test]
async fn test_register_invalid_password() {
    let mut app = helper::setup_test_app().await;

    let (status_code, registered, error) = helper::maybe_register(&mut app, "matt", "").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert!(registered.is_none());
    assert_eq!(Some("Password can not be empty".to_string()), error);

    let (status_code, _, error) =
        helper::maybe_register(&mut app, "matt", &"p".repeat(151)).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Password is too long".to_string()), error);

    // nothing was stored
    let (status_code, access_token, _) = helper::maybe_login(&mut app, "matt", "").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert!(access_token.is_none());

    let (status_code, _, _) = helper::maybe_register(&mut app, "matt", &"p".repeat(150)).await;
    assert_eq!(StatusCode::CREATED, status_code);
}

#[tokio::test]
async fn test_login_with_padded_username() {
    let mut app = helper::setup_test_app().await;

    let (status_code, registered, _) =
        helper::maybe_register(&mut app, " matt ", "verysecret").await;
    assert_eq!(StatusCode::CREATED, status_code);
    let (user_id, _) = registered.unwrap();

    let (status_code, access_token, error) =
        helper::maybe_login(&mut app, " matt ", "verysecret").await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(error.is_none());

    let (_, user) = helper::current_user(&mut app, &access_token.unwrap()).await;
    assert_eq!(
        Some(helper::User {
            id: user_id,
            username: "matt".to_string(),
        }),
        user
    );

    let (status_code, access_token, _) = helper::maybe_login(&mut app, "matt", "verysecret").await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(access_token.is_some());
}
