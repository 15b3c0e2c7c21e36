use axum::{Json, extract::State};
use chatterbox_core::AppState;
use chatterbox_database::{
    impls::chat_messages::list_chat_history, model::chat_message::ChatMessage,
};
use chatterbox_utils::{parse::format_message_id, protocol::HistoryEntry};

use crate::{ApiError, RouteMeta};

pub const META: RouteMeta = RouteMeta {
    method: "GET",
    path: "/history",
    desc: "List the stored conversation in arrival order.",
};

pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let messages = list_chat_history(&state.db).await?;
    Ok(Json(messages.iter().map(history_entry).collect()))
}

fn history_entry(message: &ChatMessage) -> HistoryEntry {
    HistoryEntry {
        content: message.content.clone(),
        is_user: message.is_user,
        message_id: format_message_id(message.id),
        feedback: message.feedback.unwrap_or(false),
        there_is_feedback: message.feedback.is_some(),
    }
}
