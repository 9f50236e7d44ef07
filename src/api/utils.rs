//! Utility functions for the API

use std::collections::HashMap;

use crate::api::Error;
use crate::dates::Date;
use crate::notes::Note;
use crate::storage::Storage;
use crate::users::User;

/// Fetch date from storage
pub async fn fetch_date<S: Storage>(storage: &S, date: &str) -> Result<Date, Error> {
    storage
        .find_single_date(date)
        .await?
        .map_or_else(|| Err(Error::not_found("Date not found")), Ok)
}

/// Fetch note from storage
pub async fn fetch_note<S: Storage>(storage: &S, note_id: i64) -> Result<Note, Error> {
    storage
        .find_single_note_by_id(note_id)
        .await?
        .map_or_else(|| Err(Error::not_found("Note not found")), Ok)
}

/// Fetch users by ID, every ID must exist
///
/// Referring to unknown users is a client error
pub async fn fetch_existing_users<S: Storage>(
    storage: &S,
    user_ids: &[i64],
) -> Result<HashMap<i64, User>, Error> {
    let users = storage
        .find_users_by_ids(user_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect::<HashMap<_, _>>();

    if let Some(missing) = user_ids.iter().find(|user_id| !users.contains_key(*user_id)) {
        return Err(Error::bad_request("User not found")
            .with_description(format!("Invalid user ID \"{missing}\", user does not exist")));
    }

    Ok(users)
}
