//! Postgres storage

use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::FromRow;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::dates::Attendee;
use crate::dates::Date;
use crate::notes::Note;
use crate::users::Role;
use crate::users::User;

use super::CreateDateValues;
use super::CreateNoteValues;
use super::CreateUserValues;
use super::Error;
use super::Result;
use super::Storage;
use super::UpdateNoteValues;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns of the users table, in the order of [`SqlxUser`](SqlxUser)
const USER_COLUMNS: &str = r"
    id,
    session_id,
    username,
    email,
    hashed_password,
    role,
    created_at,
    updated_at
";

/// Postgres type for user role
#[derive(PartialEq, Debug, sqlx::Type)]
#[sqlx(type_name = "user_role_type")]
#[sqlx(rename_all = "kebab-case")]
enum UserRoleType {
    /// Admin
    Admin,

    /// Member
    Member,
}

impl UserRoleType {
    /// Create user role type from role
    fn from_role(role: Role) -> Self {
        match role {
            Role::Admin => UserRoleType::Admin,
            Role::Member => UserRoleType::Member,
        }
    }

    /// Create role from user role type
    fn to_role(&self) -> Role {
        match self {
            UserRoleType::Admin => Role::Admin,
            UserRoleType::Member => Role::Member,
        }
    }
}

/// Postgres version of user
#[derive(FromRow)]
struct SqlxUser {
    /// User ID
    id: i64,

    /// Sessions ID
    session_id: Uuid,

    /// Username
    username: String,

    /// Email address
    email: String,

    /// Hashed password
    hashed_password: String,

    /// User role
    role: UserRoleType,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,
}

impl User {
    /// Create user from postgres version
    fn from_sqlx_user(user: SqlxUser) -> Self {
        Self {
            id: user.id,
            session_id: user.session_id,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            role: user.role.to_role(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    /// Maybe create user from postgres version
    fn from_sqlx_user_optional(user: Option<SqlxUser>) -> Option<Self> {
        user.map(Self::from_sqlx_user)
    }

    /// Create multiple user from postgres version
    fn from_sqlx_user_multiple(users: Vec<SqlxUser>) -> Vec<Self> {
        users.into_iter().map(Self::from_sqlx_user).collect()
    }
}

/// Postgres version of date
#[derive(FromRow)]
struct SqlxDate {
    /// Date identifier
    date: String,

    /// Creation date
    created_at: NaiveDateTime,
}

impl From<SqlxDate> for Date {
    fn from(date: SqlxDate) -> Self {
        Self {
            date: date.date,
            created_at: date.created_at,
        }
    }
}

/// Postgres version of a row in the join table
#[derive(FromRow)]
struct SqlxAttendee {
    /// Date identifier
    date: String,

    /// Attending user
    user_id: i64,
}

impl From<SqlxAttendee> for Attendee {
    fn from(attendee: SqlxAttendee) -> Self {
        Self {
            date: attendee.date,
            user_id: attendee.user_id,
        }
    }
}

/// Postgres version of note
#[derive(FromRow)]
struct SqlxNote {
    /// Note ID
    id: i64,

    /// Author
    user_id: i64,

    /// Date identifier
    date: String,

    /// The message
    message: String,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,
}

impl From<SqlxNote> for Note {
    fn from(note: SqlxNote) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            date: note.date,
            message: note.message,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Migrations will be run
    pub async fn new(database_connection_string: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_connection_string)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Migration(err.to_string()))?;

        Ok(Self { connection_pool })
    }
}

impl Storage for Postgres {
    async fn find_any_admin_user(&self) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, SqlxUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY id LIMIT 1"
        ))
        .bind(UserRoleType::from_role(Role::Admin))
        .fetch_optional(&self.connection_pool)
        .await
        .map(User::from_sqlx_user_optional)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn find_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, SqlxUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.connection_pool)
        .await
        .map(User::from_sqlx_user_multiple)
        .map_err(connection_error)?;

        Ok(users)
    }

    async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, SqlxUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.connection_pool)
        .await
        .map(User::from_sqlx_user_multiple)
        .map_err(connection_error)?;

        Ok(users)
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, SqlxUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
        .map(User::from_sqlx_user_optional)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn find_single_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, SqlxUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(User::from_sqlx_user_optional)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = sqlx::query_as::<_, SqlxUser>(&format!(
            r"
            INSERT INTO users (session_id, username, email, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(values.session_id)
        .bind(values.username)
        .bind(values.email)
        .bind(values.hashed_password)
        .bind(UserRoleType::from_role(values.role))
        .fetch_one(&self.connection_pool)
        .await
        .map(User::from_sqlx_user)
        .map_err(write_error)?;

        Ok(user)
    }

    async fn find_single_date(&self, date: &str) -> Result<Option<Date>> {
        let date = sqlx::query_as::<_, SqlxDate>(
            r"
            SELECT date, created_at
            FROM dates
            WHERE date = $1
            LIMIT 1
            ",
        )
        .bind(date)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(date.map(Date::from))
    }

    async fn find_dates_by_prefix(&self, prefix: &str) -> Result<Vec<Date>> {
        // no LIKE, the prefix comes straight from the path and may hold wildcards
        let dates = sqlx::query_as::<_, SqlxDate>(
            r"
            SELECT date, created_at
            FROM dates
            WHERE LEFT(date, LENGTH($1)) = $1
            ORDER BY date
            ",
        )
        .bind(prefix)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(dates.into_iter().map(Date::from).collect())
    }

    async fn find_attendees_by_dates(&self, dates: &[Date]) -> Result<Vec<Attendee>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let attendees = sqlx::query_as::<_, SqlxAttendee>(
            r"
            SELECT date, user_id
            FROM date_users
            WHERE date = ANY($1)
            ORDER BY date, user_id
            ",
        )
        .bind(dates.iter().map(|d| d.date.clone()).collect::<Vec<String>>())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(attendees.into_iter().map(Attendee::from).collect())
    }

    async fn create_date(&self, values: &CreateDateValues<'_>) -> Result<Date> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let date = sqlx::query_as::<_, SqlxDate>(
            r"
            INSERT INTO dates (date)
            VALUES ($1)
            RETURNING date, created_at
            ",
        )
        .bind(values.date)
        .fetch_one(&mut *transaction)
        .await
        .map_err(write_error)?;

        sqlx::query(
            r"
            INSERT INTO date_users (date, user_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(values.date)
        .bind(values.user_ids)
        .execute(&mut *transaction)
        .await
        .map_err(write_error)?;

        for note in values.notes {
            sqlx::query(
                r"
                INSERT INTO notes (user_id, date, message)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(note.user_id)
            .bind(values.date)
            .bind(note.message)
            .execute(&mut *transaction)
            .await
            .map_err(write_error)?;
        }

        transaction.commit().await.map_err(connection_error)?;

        Ok(date.into())
    }

    async fn set_attendees(&self, date: &Date, user_ids: &[i64]) -> Result<()> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        // holds off a concurrent delete until the attendees are replaced
        sqlx::query("SELECT date FROM dates WHERE date = $1 FOR UPDATE")
            .bind(&date.date)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(connection_error)?
            .ok_or_else(|| Error::NotFound(format!("date {}", date.date)))?;

        sqlx::query("DELETE FROM date_users WHERE date = $1")
            .bind(&date.date)
            .execute(&mut *transaction)
            .await
            .map_err(connection_error)?;

        sqlx::query(
            r"
            INSERT INTO date_users (date, user_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(&date.date)
        .bind(user_ids)
        .execute(&mut *transaction)
        .await
        .map_err(write_error)?;

        transaction.commit().await.map_err(connection_error)?;

        Ok(())
    }

    async fn delete_date(&self, date: &Date) -> Result<()> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        // the schema cascades as well, be explicit about what goes
        for statement in [
            "DELETE FROM notes WHERE date = $1",
            "DELETE FROM date_users WHERE date = $1",
            "DELETE FROM dates WHERE date = $1",
        ] {
            sqlx::query(statement)
                .bind(&date.date)
                .execute(&mut *transaction)
                .await
                .map_err(connection_error)?;
        }

        transaction.commit().await.map_err(connection_error)?;

        Ok(())
    }

    async fn find_all_notes_by_date(&self, date: &Date) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE date = $1
            ORDER BY id
            ",
        )
        .bind(&date.date)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(notes.into_iter().map(Note::from).collect())
    }

    async fn find_single_note_by_id(&self, id: i64) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, SqlxNote>(
            r"
            SELECT *
            FROM notes
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(note.map(Note::from))
    }

    async fn create_note(&self, date: &Date, values: &CreateNoteValues<'_>) -> Result<Note> {
        let note = sqlx::query_as::<_, SqlxNote>(
            r"
            INSERT INTO notes (user_id, date, message)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(values.user.id)
        .bind(&date.date)
        .bind(values.message)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(write_error)?;

        Ok(note.into())
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        let updated_note = sqlx::query_as::<_, SqlxNote>(
            r"
            UPDATE notes
            SET message = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *
            ",
        )
        .bind(values.message.unwrap_or(&note.message))
        .bind(note.id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(write_error)?;

        Ok(updated_note.into())
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note.id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}

/// Convert `SQLx` to storage error of a write
///
/// Unique violations become [`Error::Duplicate`](Error::Duplicate), missing rows and broken
/// references become [`Error::NotFound`](Error::NotFound)
fn write_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(database_error) = &err {
        if database_error.is_unique_violation() {
            return Error::Duplicate(database_error.message().to_string());
        }

        if database_error.is_foreign_key_violation() {
            return Error::NotFound(database_error.message().to_string());
        }
    }

    if let sqlx::Error::RowNotFound = err {
        return Error::NotFound(err.to_string());
    }

    connection_error(err)
}
