//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

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

/// All tables, guarded by a single lock so multi-table writes are atomic
#[derive(Debug, Default)]
struct Tables {
    /// Users by ID
    users: BTreeMap<i64, User>,

    /// Dates by identifier
    dates: BTreeMap<String, Date>,

    /// Join table of dates and their attending users
    date_users: BTreeSet<(String, i64)>,

    /// Notes by ID
    notes: BTreeMap<i64, Note>,

    /// Last handed out user ID
    last_user_id: i64,

    /// Last handed out note ID
    last_note_id: i64,
}

impl Tables {
    /// Insert a note, handing out the next ID
    fn insert_note(&mut self, date: &str, user_id: i64, message: &str) -> Note {
        self.last_note_id += 1;

        let note = Note {
            id: self.last_note_id,
            user_id,
            date: date.to_string(),
            message: message.to_string(),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        self.notes.insert(note.id, note.clone());

        note
    }

    /// Replace the attendees of a date
    fn replace_attendees(&mut self, date: &str, user_ids: &[i64]) {
        self.date_users.retain(|(date_, _)| date_ != date);

        for user_id in user_ids {
            self.date_users.insert((date.to_string(), *user_id));
        }
    }
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All tables in storage
    tables: Arc<Mutex<Tables>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for Memory {
    async fn find_any_admin_user(&self) -> Result<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|user| user.role == Role::Admin)
            .cloned())
    }

    async fn find_all_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_single_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let mut tables = self.tables.lock().await;

        if tables
            .users
            .values()
            .any(|user| user.username == values.username)
        {
            return Err(Error::Duplicate(format!(
                "username {} already exists",
                values.username
            )));
        }

        tables.last_user_id += 1;

        let user = User {
            id: tables.last_user_id,
            session_id: *values.session_id,
            username: values.username.to_string(),
            email: values.email.to_string(),
            hashed_password: values.hashed_password.to_string(),
            role: values.role,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_single_date(&self, date: &str) -> Result<Option<Date>> {
        Ok(self.tables.lock().await.dates.get(date).cloned())
    }

    async fn find_dates_by_prefix(&self, prefix: &str) -> Result<Vec<Date>> {
        Ok(self
            .tables
            .lock()
            .await
            .dates
            .values()
            .filter(|date| date.date.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn find_attendees_by_dates(&self, dates: &[Date]) -> Result<Vec<Attendee>> {
        Ok(self
            .tables
            .lock()
            .await
            .date_users
            .iter()
            .filter(|(date, _)| dates.iter().any(|date_| &date_.date == date))
            .map(|(date, user_id)| Attendee {
                date: date.clone(),
                user_id: *user_id,
            })
            .collect())
    }

    async fn create_date(&self, values: &CreateDateValues<'_>) -> Result<Date> {
        let mut tables = self.tables.lock().await;

        if tables.dates.contains_key(values.date) {
            return Err(Error::Duplicate(format!(
                "date {} already exists",
                values.date
            )));
        }

        let date = Date {
            date: values.date.to_string(),
            created_at: Utc::now().naive_utc(),
        };

        tables.dates.insert(date.date.clone(), date.clone());
        tables.replace_attendees(&date.date, values.user_ids);

        for note in values.notes {
            tables.insert_note(&date.date, note.user_id, note.message);
        }

        Ok(date)
    }

    async fn set_attendees(&self, date: &Date, user_ids: &[i64]) -> Result<()> {
        let mut tables = self.tables.lock().await;

        if !tables.dates.contains_key(&date.date) {
            return Err(Error::NotFound(format!("date {}", date.date)));
        }

        if let Some(user_id) = user_ids
            .iter()
            .find(|user_id| !tables.users.contains_key(*user_id))
        {
            return Err(Error::NotFound(format!("user {user_id}")));
        }

        tables.replace_attendees(&date.date, user_ids);

        Ok(())
    }

    async fn delete_date(&self, date: &Date) -> Result<()> {
        let mut tables = self.tables.lock().await;

        tables.notes.retain(|_, note| note.date != date.date);
        tables.date_users.retain(|(date_, _)| date_ != &date.date);
        tables.dates.remove(&date.date);

        Ok(())
    }

    async fn find_all_notes_by_date(&self, date: &Date) -> Result<Vec<Note>> {
        Ok(self
            .tables
            .lock()
            .await
            .notes
            .values()
            .filter(|note| note.date == date.date)
            .cloned()
            .collect())
    }

    async fn find_single_note_by_id(&self, id: i64) -> Result<Option<Note>> {
        Ok(self.tables.lock().await.notes.get(&id).cloned())
    }

    async fn create_note(&self, date: &Date, values: &CreateNoteValues<'_>) -> Result<Note> {
        let mut tables = self.tables.lock().await;

        if !tables.dates.contains_key(&date.date) {
            return Err(Error::NotFound(format!("date {}", date.date)));
        }

        Ok(tables.insert_note(&date.date, values.user.id, values.message))
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        self.tables
            .lock()
            .await
            .notes
            .get_mut(&note.id)
            .map(|note| {
                if let Some(message) = values.message {
                    note.message = message.to_string();
                    note.updated_at = Utc::now().naive_utc();
                }

                note.clone()
            })
            .ok_or_else(|| Error::NotFound(format!("note {}", note.id)))
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        self.tables.lock().await.notes.remove(&note.id);

        Ok(())
    }
}
