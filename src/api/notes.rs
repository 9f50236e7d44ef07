use std::collections::HashMap;

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;

use crate::notes::Note;
use crate::storage::CreateNoteValues;
use crate::storage::Storage;
use crate::storage::UpdateNoteValues;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;
use super::request::parse_message;
use super::users::UserResponse;
use super::utils::fetch_existing_users;
use super::utils::fetch_note;

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: i64,
    pub date: String,
    pub user: UserResponse,
    pub message: String,
}

impl NoteResponse {
    fn from_note(note: Note, user: &User) -> Self {
        Self {
            id: note.id,
            date: note.date,
            user: UserResponse::from_user(user),
            message: note.message,
        }
    }

    /// Create note responses, looking up the authors in the given users
    pub fn from_note_multiple(
        notes: Vec<Note>,
        users: &HashMap<i64, User>,
    ) -> Result<Vec<Self>, Error> {
        notes
            .into_iter()
            .map(|note| {
                users.get(&note.user_id).map_or_else(
                    || Err(Error::internal_server_error("Author of note not found")),
                    |user| Ok(Self::from_note(note, user)),
                )
            })
            .collect()
    }
}

/// Build the response of a single note, with its author
async fn note_response<S: Storage>(storage: &S, note: Note) -> Result<NoteResponse, Error> {
    let users = fetch_existing_users(storage, &[note.user_id])
        .await
        .map_err(|_| Error::internal_server_error("Author of note not found"))?;

    NoteResponse::from_note_multiple(vec![note], &users)?
        .pop()
        .ok_or_else(|| Error::internal_server_error("Could not build note"))
}

pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<NoteResponse>, Error> {
    let note = fetch_note(&storage, note_id).await?;

    Ok(Success::ok(note_response(&storage, note).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteForm {
    date: String,
    user_id: i64,
    message: String,
}

/// Create a note on an existing date
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "date": "2022-02-25", "user_id": 2, "message": "Bring firewood" }' \
///     http://localhost:6000/notes
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    Form(form): Form<CreateNoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let message = parse_message(&form.message)?;

    // the date is part of the payload, a missing one is a client error
    let date = storage.find_single_date(&form.date).await?.ok_or_else(|| {
        Error::bad_request("Date not found")
            .with_description(format!("Invalid date \"{}\", date does not exist", form.date))
    })?;

    let user = storage
        .find_single_user_by_id(form.user_id)
        .await?
        .ok_or_else(|| {
            Error::bad_request("User not found").with_description(format!(
                "Invalid user ID \"{}\", user does not exist",
                form.user_id
            ))
        })?;

    let values = CreateNoteValues {
        user: &user,
        message,
    };

    let note = storage.create_note(&date, &values).await?;

    tracing::debug!("Created note {} on {}", note.id, note.date);

    Ok(Success::created(NoteResponse::from_note(note, &user)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteForm {
    message: Option<String>,
}

/// Update the message of a note
///
/// Only the message can change, the date and author stay
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
    Form(form): Form<UpdateNoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let note = fetch_note(&storage, note_id).await?;

    let message = form.message.as_deref().map(parse_message).transpose()?;

    let values = UpdateNoteValues { message };

    let note = storage.update_note(&note, &values).await?;

    Ok(Success::ok(note_response(&storage, note).await?))
}

pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<&'static str>, Error> {
    let note = fetch_note(&storage, note_id).await?;

    storage.delete_note(&note).await?;

    tracing::debug!("Deleted note {}", note.id);

    Ok(Success::<&'static str>::no_content())
}
