//! User API management

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password::hash;
use crate::password::verify;
use crate::storage;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::Role;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::JwtKeys;
use super::Success;
use super::current_user::Token;
use super::current_user::generate_token;
use super::request::parse_email;
use super::request::parse_password;
use super::request::parse_username;

/// The user response information
///
/// A subset of all the information, ready to be serialized for the outside world
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// The user ID
    pub id: i64,

    /// The username
    pub username: String,

    /// The email address, can be empty
    pub email: String,
}

impl UserResponse {
    /// Create a user response from a [`User`](User)
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    /// Create a user response from multiple [`User`](User)s
    pub fn from_user_multiple<'a, I>(users: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a User>,
    {
        users.into_iter().map(Self::from_user).collect()
    }
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username of the user
    username: String,
    /// Password of the user
    password: String,
}

/// Get a token for a user
///
/// The token can then be used to access the rest of the API routes by using it in the
/// `Authorization` header
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "username": "admin", "password": "verysecret" }' \
///     http://localhost:6000/login
/// ```
///
/// Response
/// ```json
/// { "token": "some token", "token_type": "Bearer", "expires_in": 3600, "user_id": 1 }
/// ```
pub async fn login<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Form(form): Form<LoginForm>,
) -> Result<Success<Token>, Error> {
    // usernames are stored trimmed
    let user = storage
        .find_single_user_by_username(form.username.trim())
        .await?;

    match user {
        Some(user) if verify(&user.hashed_password, &form.password) => {
            tracing::debug!("User {} logged in", user.id);

            Ok(Success::ok(generate_token(&jwt_keys, &user)?))
        }
        _ => Err(Error::bad_request("Invalid credentials")),
    }
}

/// Register form
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// Username of the new account
    username: String,
    /// Password of the new account
    password: String,
    /// Optional email address of the new account
    #[serde(default)]
    email: String,
}

/// Create an account and get a token for it
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "username": "matt", "password": "verysecret", "email": "matt@example.com" }' \
///     http://localhost:6000/register
/// ```
///
/// Response
/// ```json
/// { "token": "some token", "token_type": "Bearer", "expires_in": 3600, "user_id": 2 }
/// ```
pub async fn register<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Form(form): Form<RegisterForm>,
) -> Result<Success<Token>, Error> {
    let username = parse_username(&form.username)?;
    let password = parse_password(&form.password)?;
    let email = parse_email(&form.email)?;

    if storage
        .find_single_user_by_username(username)
        .await?
        .is_some()
    {
        return Err(Error::bad_request("Username already exists"));
    }

    let hashed_password = hash(password).map_err(Error::internal_server_error)?;

    let values = CreateUserValues {
        session_id: &Uuid::new_v4(),
        role: Role::Member,
        username,
        email,
        hashed_password: &hashed_password,
    };

    let user = match storage.create_user(&values).await {
        Ok(user) => user,
        // lost the race against another registration
        Err(storage::Error::Duplicate(_)) => {
            return Err(Error::bad_request("Username already exists"));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok(Success::created(generate_token(&jwt_keys, &user)?))
}

/// List all users, except the administrative account
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/users
/// ```
///
/// Response:
/// ```json
/// [ { "id": 2, "username": "matt", "email": "matt@example.com" } ]
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
) -> Result<Success<Vec<UserResponse>>, Error> {
    let users = storage.find_all_users().await?;

    Ok(Success::ok(UserResponse::from_user_multiple(
        users.iter().filter(|user| !user.is_admin()),
    )))
}

/// List users, everyone when requested by the administrative account
///
/// No token is needed, without one the administrative account is left out
pub async fn list_all<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: Option<CurrentUser<S>>,
) -> Result<Success<Vec<UserResponse>>, Error> {
    let users = storage.find_all_users().await?;

    let is_admin = current_user.is_some_and(|current_user| current_user.is_admin());

    Ok(Success::ok(UserResponse::from_user_multiple(
        users.iter().filter(|user| is_admin || !user.is_admin()),
    )))
}

/// Get the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/users/me
/// ```
pub async fn me<S: Storage>(current_user: CurrentUser<S>) -> Success<UserResponse> {
    Success::ok(UserResponse::from_user(&current_user))
}
