#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use axum::Extension;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::AllowHeaders;
use tower_http::cors::AllowMethods;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::DEFAULT_EXPIRES_IN;
use crate::api::JwtKeys;
use crate::api::router;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;
use crate::users::InitialUser;
use crate::users::ensure_initial_user;
use crate::utils::env_var;
use crate::utils::env_var_or_else;

mod api;
mod dates;
mod graceful_shutdown;
mod notes;
mod password;
mod storage;
#[cfg(test)]
mod tests;
mod users;
mod utils;

const DEFAULT_RUST_LOG: &str = "cottage=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";
const MAX_EXPIRES_IN: i64 = 365 * 24 * 60 * 60;

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app().await?;

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Storage connection or migrations
/// - Initial user setup
/// - Token configuration
///
/// Postgres is used when `DATABASE_URL` is set, memory storage otherwise
pub async fn setup_app() -> Result<Router> {
    let jwt_keys = setup_jwt_keys()?;
    let initial_user = InitialUser::from_env();

    if let Some(database_url) = env_var("DATABASE_URL") {
        tracing::info!("Using Postgres storage");

        let storage = Postgres::new(&database_url).await?;

        setup_storage(storage, jwt_keys, &initial_user).await
    } else {
        tracing::info!("`DATABASE_URL` not set, using memory storage");

        setup_storage(Memory::new(), jwt_keys, &initial_user).await
    }
}

/// Prepare the storage and create the router on top of it
pub async fn setup_storage<S: Storage>(
    storage: S,
    jwt_keys: JwtKeys,
    initial_user: &InitialUser,
) -> Result<Router> {
    ensure_initial_user(&storage, initial_user).await?;

    Ok(create_router(storage, jwt_keys))
}

/// Create the router for the calendar
fn create_router<S: Storage>(storage: S, jwt_keys: JwtKeys) -> Router {
    router::<S>()
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(jwt_keys))
}

/// Browser clients on any origin may call the API, credentials included
///
/// Origins are mirrored since a wildcard is not allowed together with credentials
fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(env_var_or_else("RUST_LOG", || {
            DEFAULT_RUST_LOG.into()
        })))
        .with(fmt::layer())
        .init();
}

fn setup_jwt_keys() -> Result<JwtKeys> {
    use crate::password::generate;

    let jwt_secret = env_var_or_else("JWT_SECRET", || {
        let jwt_secret = generate();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    let expires_in = match env_var("TOKEN_EXPIRES_IN") {
        Some(expires_in) => parse_expires_in(&expires_in)?,
        None => DEFAULT_EXPIRES_IN,
    };

    Ok(JwtKeys::new(jwt_secret.as_bytes(), expires_in))
}

/// Parse the token lifetime in seconds, at least a second and at most a year
fn parse_expires_in(value: &str) -> Result<i64> {
    let expires_in = value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("`TOKEN_EXPIRES_IN` is not a number: {value}"))?;

    if !(1..=MAX_EXPIRES_IN).contains(&expires_in) {
        bail!(
            "`TOKEN_EXPIRES_IN` must be between 1 and {MAX_EXPIRES_IN} seconds, got {expires_in}"
        );
    }

    Ok(expires_in)
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        address.set_port(port.parse::<u16>()?);
    }

    Ok(address)
}
