use serde::{Deserialize, Serialize};

/// A persisted transcript line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub is_user: bool,
    /// `Some(true)` = like, `Some(false)` = dislike.
    pub feedback: Option<bool>,
    pub created_at: u64,
}
