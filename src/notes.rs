use chrono::naive::NaiveDateTime;

/// Longest message a note can hold, in characters
pub const MAX_MESSAGE_LENGTH: usize = 256;

#[derive(Clone, Debug)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
