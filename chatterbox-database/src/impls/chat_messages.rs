use anyhow::Context as _;

use crate::cache::{HISTORY_CACHE_TTL, current_chat_history_key, invalidate_chat_history};
use crate::{database::Database, model::chat_message::ChatMessage};

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    content: String,
    is_user: bool,
    feedback: Option<bool>,
    created_at: i64,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = anyhow::Error;

    fn try_from(row: ChatMessageRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            content: row.content,
            is_user: row.is_user,
            feedback: row.feedback,
            created_at: u64::try_from(row.created_at)
                .context("created_at row out of u64 range")?,
        })
    }
}

pub async fn insert_chat_message(
    db: &Database,
    content: &str,
    is_user: bool,
) -> anyhow::Result<ChatMessage> {
    let row: ChatMessageRow = sqlx::query_as(
        "INSERT INTO chat_messages (content, is_user)
         VALUES ($1, $2)
         RETURNING id, content, is_user, feedback, created_at",
    )
    .bind(content)
    .bind(is_user)
    .fetch_one(db.pool())
    .await?;

    invalidate_chat_history(db.cache()).await;

    row.try_into()
}

/// Full transcript in arrival order.
pub async fn list_chat_history(db: &Database) -> anyhow::Result<Vec<ChatMessage>> {
    match current_chat_history_key(db.cache()).await {
        Some(cache_key) => {
            db.cache()
                .get_or_load_json(&cache_key, HISTORY_CACHE_TTL, || select_chat_history(db))
                .await
        }
        None => select_chat_history(db).await,
    }
}

async fn select_chat_history(db: &Database) -> anyhow::Result<Vec<ChatMessage>> {
    let rows: Vec<ChatMessageRow> = sqlx::query_as(
        "SELECT id, content, is_user, feedback, created_at
         FROM chat_messages
         ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(ChatMessage::try_from).collect()
}

/// Most recent `limit` messages, newest first.
pub async fn list_recent_chat_messages(
    db: &Database,
    limit: u32,
) -> anyhow::Result<Vec<ChatMessage>> {
    let limit_i64 = i64::from(limit.clamp(1, 200));

    let rows: Vec<ChatMessageRow> = sqlx::query_as(
        "SELECT id, content, is_user, feedback, created_at
         FROM chat_messages
         ORDER BY created_at DESC, id DESC
         LIMIT $1",
    )
    .bind(limit_i64)
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(ChatMessage::try_from).collect()
}

/// Delete the whole transcript. Returns the number of removed rows.
pub async fn clear_chat_messages(db: &Database) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM chat_messages")
        .execute(db.pool())
        .await?;

    invalidate_chat_history(db.cache()).await;

    Ok(result.rows_affected())
}

/// Store (or clear, with `None`) the feedback of one message.
/// Returns `false` when no message has that id.
pub async fn set_message_feedback(
    db: &Database,
    message_id: i64,
    is_like: Option<bool>,
) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE chat_messages SET feedback = $2 WHERE id = $1")
        .bind(message_id)
        .bind(is_like)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    invalidate_chat_history(db.cache()).await;

    Ok(true)
}
