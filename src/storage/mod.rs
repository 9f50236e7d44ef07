//! All things related to the storage of users, dates and notes

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::dates::Attendee;
use crate::dates::Date;
use crate::notes::Note;
use crate::users::Role;
use crate::users::User;

pub use memory::Memory;
pub use postgres::Postgres;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// Migrations could not be applied
    #[error("Migration error: {0}")]
    Migration(String),

    /// A unique value is already taken
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// A row written to or referred to is gone
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The initial session ID for the user
    pub session_id: &'a Uuid,

    /// The role of the user
    pub role: Role,

    /// The username, unique
    pub username: &'a str,

    /// The email address, can be empty
    pub email: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values for a note created together with its date
pub struct CreateDateNoteValues<'a> {
    /// Author of the note
    pub user_id: i64,

    /// Message of the note
    pub message: &'a str,
}

/// Values to create a Date
pub struct CreateDateValues<'a> {
    /// Validated `YYYY-MM-DD` identifier
    pub date: &'a str,

    /// Users attending the date, all must exist
    pub user_ids: &'a [i64],

    /// Initial notes of the date
    pub notes: &'a [CreateDateNoteValues<'a>],
}

/// Values to create a Note
pub struct CreateNoteValues<'a> {
    /// User writing the note
    pub user: &'a User,

    /// Message of the note
    pub message: &'a str,
}

/// Values to update a Note
pub struct UpdateNoteValues<'a> {
    /// New message of the note
    pub message: Option<&'a str>,
}

/// Storage with all supported operations
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find any user with the admin role
    fn find_any_admin_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds all users, ordered by ID
    fn find_all_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Finds all users with the given IDs, ordered by ID
    ///
    /// Unknown IDs are skipped
    fn find_users_by_ids(&self, ids: &[i64]) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Finds a single user by its username
    fn find_single_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its ID
    fn find_single_user_by_id(&self, id: i64)
    -> impl Future<Output = Result<Option<User>>> + Send;

    /// Create a single user
    ///
    /// Fails with [`Error::Duplicate`](Error::Duplicate) when the username is taken
    fn create_user(&self, values: &CreateUserValues)
    -> impl Future<Output = Result<User>> + Send;

    /// Find a single date by its identifier
    fn find_single_date(&self, date: &str) -> impl Future<Output = Result<Option<Date>>> + Send;

    /// Find all dates with an identifier starting with the prefix, ordered by identifier
    fn find_dates_by_prefix(&self, prefix: &str)
    -> impl Future<Output = Result<Vec<Date>>> + Send;

    /// Find the attendees of all given dates, ordered by date and user ID
    fn find_attendees_by_dates(
        &self,
        dates: &[Date],
    ) -> impl Future<Output = Result<Vec<Attendee>>> + Send;

    /// Create a date with its attendees and notes in one go
    ///
    /// Fails with [`Error::Duplicate`](Error::Duplicate) when the date already exists
    fn create_date(&self, values: &CreateDateValues) -> impl Future<Output = Result<Date>> + Send;

    /// Replace the attendees of a date
    ///
    /// Fails with [`Error::NotFound`](Error::NotFound) when the date is gone
    fn set_attendees(
        &self,
        date: &Date,
        user_ids: &[i64],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a date, its attendees and all of its notes
    fn delete_date(&self, date: &Date) -> impl Future<Output = Result<()>> + Send;

    /// Find all notes of a date, ordered by ID
    fn find_all_notes_by_date(&self, date: &Date)
    -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Find a single note by its ID
    fn find_single_note_by_id(&self, id: i64)
    -> impl Future<Output = Result<Option<Note>>> + Send;

    /// Create a note on a date
    ///
    /// Fails with [`Error::NotFound`](Error::NotFound) when the date or user is gone
    fn create_note(
        &self,
        date: &Date,
        values: &CreateNoteValues,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Update a note
    ///
    /// Fails with [`Error::NotFound`](Error::NotFound) when the note is gone
    fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Delete a note
    fn delete_note(&self, note: &Note) -> impl Future<Output = Result<()>> + Send;
}
