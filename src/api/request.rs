//! API request helpers

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::dates::is_valid_identifier;
use crate::notes::MAX_MESSAGE_LENGTH;

use super::Error;

/// Longest username accepted on registration, in characters
const MAX_USERNAME_LENGTH: usize = 150;

/// Longest password accepted on registration, in characters
const MAX_PASSWORD_LENGTH: usize = 150;

/// Longest email address accepted on registration, in characters
const MAX_EMAIL_LENGTH: usize = 254;

/// Parse and validate a date identifier
///
/// ```rust
/// let date = "2022-02-25";
/// assert_eq!(parse_date(date).unwrap(), "2022-02-25".to_string())
/// ```
pub fn parse_date(date: &str) -> Result<String, Error> {
    if is_valid_identifier(date) {
        Ok(date.to_string())
    } else {
        Err(Error::bad_request("Date must be YYYY-MM-DD, after 2020")
            .with_description(format!("Invalid date: {date}")))
    }
}

/// Validate the message of a note
pub fn parse_message(message: &str) -> Result<&str, Error> {
    let length = message.chars().count();

    if length > MAX_MESSAGE_LENGTH {
        return Err(
            Error::bad_request("Message is too long").with_description(format!(
                "Message has {length} characters, at most {MAX_MESSAGE_LENGTH} are allowed"
            )),
        );
    }

    Ok(message)
}

/// Validate a username for a new account
pub fn parse_username(username: &str) -> Result<&str, Error> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::bad_request("Username can not be empty"));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(Error::bad_request("Username is too long"));
    }

    Ok(username)
}

/// Validate the password of a new account
///
/// Passwords are taken as given, surrounding whitespace included
pub fn parse_password(password: &str) -> Result<&str, Error> {
    if password.trim().is_empty() {
        return Err(Error::bad_request("Password can not be empty"));
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(Error::bad_request("Password is too long"));
    }

    Ok(password)
}

/// Validate an email address
///
/// An empty address is allowed, accounts do not need one
pub fn parse_email(email: &str) -> Result<&str, Error> {
    let email = email.trim();

    if email.is_empty() {
        return Ok(email);
    }

    let valid = email.chars().count() <= MAX_EMAIL_LENGTH
        && !email.chars().any(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        });

    if valid {
        Ok(email)
    } else {
        Err(Error::bad_request("Enter a valid email address"))
    }
}

fn parse_json<J>(json: Result<Json<J>, JsonRejection>) -> Result<J, Error> {
    match json {
        Ok(Json(json)) => Ok(json),
        Err(err) => match err {
            JsonRejection::JsonDataError(err) => Err(Error::bad_request("Data error")
                .with_description(std::error::Error::source(&err).map_or_else(
                    || err.body_text(),
                    ToString::to_string,
                ))),
            JsonRejection::JsonSyntaxError(err) => Err(Error::bad_request("JSON syntax error")
                .with_description(std::error::Error::source(&err).map_or_else(
                    || err.body_text(),
                    ToString::to_string,
                ))),
            JsonRejection::MissingJsonContentType(_err) => Err(Error::bad_request(
                "Missing `application/json` content type",
            )),
            JsonRejection::BytesRejection(err) => {
                Err(Error::bad_request("Invalid characters in JSON").with_description(err))
            }
            err => Err(Error::bad_request("Unknown JSON error").with_description(err)),
        },
    }
}

/// Wrapper for the JSON extractor
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    F: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = Json::<F>::from_request(req, state).await;

        parse_json(json).map(Form)
    }
}

fn parse_path<P>(path: Result<Path<P>, PathRejection>) -> Result<P, Error> {
    match path {
        Ok(Path(path)) => Ok(path),
        Err(err) => match err {
            PathRejection::FailedToDeserializePathParams(err) => {
                Err(Error::bad_request("Invalid path parameter").with_description(err))
            }
            PathRejection::MissingPathParams(err) => {
                Err(Error::bad_request("Missing path parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown path error").with_description(err)),
        },
    }
}

/// Wrapper for the path extractor
pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    P: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = Path::<P>::from_request_parts(parts, state).await;

        parse_path(path).map(PathParameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2022-02-25").unwrap(), "2022-02-25".to_string());
        assert!(parse_date("2019-02-25").is_err());
        assert!(parse_date("2022-02-30").is_err());
    }

    #[test]
    fn test_parse_message() {
        let longest = "a".repeat(MAX_MESSAGE_LENGTH);
        assert!(parse_message(&longest).is_ok());

        let too_long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(parse_message(&too_long).is_err());

        // characters are counted, not bytes
        let emoji = "🏡".repeat(MAX_MESSAGE_LENGTH);
        assert!(parse_message(&emoji).is_ok());
    }

    #[test]
    fn test_parse_username() {
        assert_eq!(parse_username(" matt ").unwrap(), "matt");
        assert!(parse_username("   ").is_err());
        assert!(parse_username(&"m".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_parse_password() {
        assert_eq!(parse_password(" very secret ").unwrap(), " very secret ");
        assert!(parse_password("").is_err());
        assert!(parse_password("   ").is_err());
        assert!(parse_password(&"p".repeat(MAX_PASSWORD_LENGTH)).is_ok());
        assert!(parse_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_parse_email() {
        assert_eq!(parse_email("").unwrap(), "");
        assert_eq!(
            parse_email("email@email.com").unwrap(),
            "email@email.com"
        );
        assert!(parse_email("email").is_err());
        assert!(parse_email("@email.com").is_err());
        assert!(parse_email("email@").is_err());
        assert!(parse_email("em ail@email.com").is_err());
        assert!(parse_email("a@b@c").is_err());
        assert!(parse_email(&format!("{}@email.com", "e".repeat(MAX_EMAIL_LENGTH))).is_err());
    }
}
