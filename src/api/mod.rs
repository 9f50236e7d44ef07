//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;

pub use current_user::CurrentUser;
pub use current_user::DEFAULT_EXPIRES_IN;
pub use current_user::JwtKeys;
pub use request::Form;
pub use request::PathParameters;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod current_user;
mod dates;
mod notes;
mod request;
mod response;
mod users;
mod utils;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    Router::new()
        .route("/login", post(users::login::<S>))
        .route("/register", post(users::register::<S>))
        .route("/users", get(users::list::<S>))
        .route("/users/all", get(users::list_all::<S>))
        .route("/users/me", get(users::me::<S>))
        .route("/date", post(dates::create::<S>))
        .route("/date/{date}", get(dates::single::<S>))
        .route("/date/{date}", patch(dates::update::<S>))
        .route("/date/{date}", delete(dates::delete::<S>))
        .route("/month/{year}/{month}", get(dates::month::<S>))
        .route("/notes", post(notes::create::<S>))
        .route("/note/{note}", get(notes::single::<S>))
        .route("/note/{note}", patch(notes::update::<S>))
        .route("/note/{note}", delete(notes::delete::<S>))
}
