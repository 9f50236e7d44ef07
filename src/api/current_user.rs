//! Current user service
//!
//! Get the current user from the request based on the Authorization header

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::extract::OptionalFromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::api::Error;
use crate::storage::Storage;
use crate::users::User;

/// Seconds a token is valid when not configured otherwise
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

/// The keys used for encoding/decoding JWT tokens
#[derive(Clone)]
pub struct JwtKeys {
    /// The encoding key
    encoding: EncodingKey,

    /// The decoding key
    decoding: DecodingKey,

    /// In how many seconds new tokens expire
    expires_in: i64,
}

impl JwtKeys {
    /// Create new encoding/decoding keys, derived from a secret
    pub fn new(secret: &[u8], expires_in: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expires_in,
        }
    }
}

/// The JWT claims to identifies a user
#[derive(Clone, Debug, Deserialize, Serialize)]
struct Claims {
    /// The user ID
    sub: String,

    /// When the token expires, as a UNIX timestamp
    exp: i64,

    /// The session ID of the account, tokens of an older session are rejected
    jti: Uuid,
}

/// Token information served to the user
#[derive(Debug, Serialize)]
pub struct Token {
    /// The token to provide to follow up requests in the Authorization header
    token: String,

    /// Type of the token: Bearer
    token_type: &'static str,

    /// In how many seconds does the token expire
    expires_in: i64,

    /// The user the token belongs to
    user_id: i64,
}

/// Generate a token for the outside world for a given user
///
/// Every token of a user shares the session ID of the account
pub fn generate_token(jwt_keys: &JwtKeys, user: &User) -> Result<Token, Error> {
    use jsonwebtoken::Header;
    use jsonwebtoken::encode;

    let exp = chrono::Utc::now()
        .timestamp()
        .checked_add(jwt_keys.expires_in)
        .ok_or_else(|| Error::internal_server_error("Token expiry out of range"))?;

    let claims = Claims {
        sub: user.id.to_string(),
        exp,
        jti: user.session_id,
    };

    let token = encode(&Header::default(), &claims, &jwt_keys.encoding)
        .map_err(Error::internal_server_error)?;

    Ok(Token {
        token,
        token_type: "Bearer",
        expires_in: jwt_keys.expires_in,
        user_id: user.id,
    })
}

/// Current user service
pub struct CurrentUser<S: Storage> {
    /// The actual user
    user: Arc<User>,

    /// The storage the user was found in
    storage: PhantomData<S>,
}

impl<S: Storage> CurrentUser<S> {
    /// Create the current user from a user
    fn new(user: User) -> Self {
        Self {
            user: Arc::new(user),
            storage: PhantomData,
        }
    }
}

impl<S: Storage> Deref for CurrentUser<S> {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<B, S> FromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        use jsonwebtoken::Validation;
        use jsonwebtoken::decode;

        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) =
            <TypedHeader<Authorization<Bearer>> as FromRequestParts<B>>::from_request_parts(
                parts, state,
            )
            .await
            .map_err(|_| Error::unauthorized("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get JWT keys"))?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get storage"))?;

        // Decode the user data
        let token_data =
            decode::<Claims>(bearer.token(), &jwt_keys.decoding, &Validation::default())
                .map_err(|err| Error::unauthorized(format!("Invalid token: {err}")))?;

        let claims = token_data.claims;

        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| Error::unauthorized("Invalid token: unknown subject"))?;

        let user = storage
            .find_single_user_by_id(id)
            .await
            .map_err(|_| Error::unauthorized("Could not find user"))?;

        if let Some(user) = user {
            // mechanism to invalidate JWT tokens
            if claims.jti != user.session_id {
                return Err(Error::unauthorized("Token expired"));
            }

            Ok(CurrentUser::new(user))
        } else {
            Err(Error::unauthorized("Could not find user"))
        }
    }
}

/// Anonymous requests are allowed, a token that is given must be valid
impl<B, S> OptionalFromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &B,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }

        <Self as FromRequestParts<B>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}
