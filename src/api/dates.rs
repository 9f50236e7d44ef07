//! Date API management

use std::collections::HashMap;

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;

use crate::dates::Attendee;
use crate::dates::Date;
use crate::dates::month_prefix;
use crate::storage;
use crate::storage::CreateDateNoteValues;
use crate::storage::CreateDateValues;
use crate::storage::Storage;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;
use super::notes::NoteResponse;
use super::request::parse_date;
use super::request::parse_message;
use super::users::UserResponse;
use super::utils::fetch_date;
use super::utils::fetch_existing_users;

/// A date with its attendees and notes
#[derive(Debug, Serialize)]
pub struct DateResponse {
    /// The `YYYY-MM-DD` identifier
    pub date: String,

    /// Attending users
    pub users: Vec<UserResponse>,

    /// Notes on the date
    pub notes: Vec<NoteResponse>,
}

/// A date in a month overview, notes are left out
#[derive(Debug, Serialize)]
pub struct DateMonthResponse {
    /// The `YYYY-MM-DD` identifier
    pub date: String,

    /// Attending users
    pub users: Vec<UserResponse>,
}

/// Sorted and deduplicated user IDs
fn unique_user_ids<I>(user_ids: I) -> Vec<i64>
where
    I: IntoIterator<Item = i64>,
{
    let mut user_ids = user_ids.into_iter().collect::<Vec<_>>();
    user_ids.sort_unstable();
    user_ids.dedup();
    user_ids
}

/// Users by ID, for building responses
async fn users_by_id<S: Storage>(
    storage: &S,
    user_ids: &[i64],
) -> Result<HashMap<i64, User>, Error> {
    Ok(storage
        .find_users_by_ids(user_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

/// The attending users of a single date
fn attendee_responses(
    date: &str,
    attendees: &[Attendee],
    users: &HashMap<i64, User>,
) -> Vec<UserResponse> {
    UserResponse::from_user_multiple(
        attendees
            .iter()
            .filter(|attendee| attendee.date == date)
            .filter_map(|attendee| users.get(&attendee.user_id)),
    )
}

/// Build the full response of a date
async fn date_response<S: Storage>(storage: &S, date: Date) -> Result<DateResponse, Error> {
    let attendees = storage
        .find_attendees_by_dates(std::slice::from_ref(&date))
        .await?;
    let notes = storage.find_all_notes_by_date(&date).await?;

    let user_ids = unique_user_ids(
        attendees
            .iter()
            .map(|attendee| attendee.user_id)
            .chain(notes.iter().map(|note| note.user_id)),
    );
    let users = users_by_id(storage, &user_ids).await?;

    Ok(DateResponse {
        users: attendee_responses(&date.date, &attendees, &users),
        notes: NoteResponse::from_note_multiple(notes, &users)?,
        date: date.date,
    })
}

/// Get a single date with its attendees and notes
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/date/2022-02-25
/// ```
///
/// Response:
/// ```json
/// { "date": "2022-02-25", "users": [], "notes": [] }
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(date): PathParameters<String>,
) -> Result<Success<DateResponse>, Error> {
    let date = fetch_date(&storage, &date).await?;

    Ok(Success::ok(date_response(&storage, date).await?))
}

/// List all dates of a month
///
/// The year and month are matched as given against the start of the identifier, use
/// `/month/2022/02` and not `/month/2022/2`
pub async fn month<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters((year, month)): PathParameters<(String, String)>,
) -> Result<Success<Vec<DateMonthResponse>>, Error> {
    let dates = storage
        .find_dates_by_prefix(&month_prefix(&year, &month))
        .await?;
    let attendees = storage.find_attendees_by_dates(&dates).await?;

    let user_ids = unique_user_ids(attendees.iter().map(|attendee| attendee.user_id));
    let users = users_by_id(&storage, &user_ids).await?;

    let response = dates
        .into_iter()
        .map(|date| DateMonthResponse {
            users: attendee_responses(&date.date, &attendees, &users),
            date: date.date,
        })
        .collect();

    Ok(Success::ok(response))
}

/// Note created together with a date
#[derive(Debug, Deserialize)]
pub struct CreateDateNoteForm {
    user_id: i64,
    message: String,
}

/// Create date form
#[derive(Debug, Deserialize)]
pub struct CreateDateForm {
    /// The `YYYY-MM-DD` identifier, 2020 or later
    date: String,
    /// Attending users
    #[serde(default)]
    user_ids: Vec<i64>,
    /// Initial notes
    #[serde(default)]
    notes: Vec<CreateDateNoteForm>,
}

/// Create a date, with optional attendees and notes
///
/// Everything is validated before anything is stored, the date, attendees and notes are
/// stored together
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "date": "2022-02-25", "user_ids": [2], "notes": [{ "user_id": 2, "message": "Sauna" }] }' \
///     http://localhost:6000/date
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    Form(form): Form<CreateDateForm>,
) -> Result<Success<DateResponse>, Error> {
    let date = parse_date(&form.date)?;

    if storage.find_single_date(&date).await?.is_some() {
        return Err(Error::bad_request("Date already exists"));
    }

    let notes = form
        .notes
        .iter()
        .map(|note| {
            parse_message(&note.message).map(|message| CreateDateNoteValues {
                user_id: note.user_id,
                message,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let user_ids = unique_user_ids(form.user_ids.iter().copied());

    fetch_existing_users(
        &storage,
        &unique_user_ids(
            user_ids
                .iter()
                .copied()
                .chain(notes.iter().map(|note| note.user_id)),
        ),
    )
    .await?;

    let values = CreateDateValues {
        date: &date,
        user_ids: &user_ids,
        notes: &notes,
    };

    let date = match storage.create_date(&values).await {
        Ok(date) => date,
        Err(storage::Error::Duplicate(_)) => {
            return Err(Error::bad_request("Date already exists"));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::debug!("Created date {}", date.date);

    Ok(Success::created(date_response(&storage, date).await?))
}

/// Update date form
///
/// Notes are not touched through a date, use the note endpoints for them
#[derive(Debug, Deserialize)]
pub struct UpdateDateForm {
    /// New attendees, replacing the current ones
    user_ids: Option<Vec<i64>>,
}

/// Update the attendees of a date
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(date): PathParameters<String>,
    Form(form): Form<UpdateDateForm>,
) -> Result<Success<DateResponse>, Error> {
    let date = fetch_date(&storage, &date).await?;

    if let Some(user_ids) = form.user_ids {
        let user_ids = unique_user_ids(user_ids);

        fetch_existing_users(&storage, &user_ids).await?;

        storage.set_attendees(&date, &user_ids).await?;

        tracing::debug!("Updated attendees of {}", date.date);
    }

    Ok(Success::ok(date_response(&storage, date).await?))
}

/// Delete a date and all of its notes
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/date/2022-02-25
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(date): PathParameters<String>,
) -> Result<Success<&'static str>, Error> {
    let date = fetch_date(&storage, &date).await?;

    storage.delete_date(&date).await?;

    tracing::debug!("Deleted date {} and its notes", date.date);

    Ok(Success::<&'static str>::no_content())
}
