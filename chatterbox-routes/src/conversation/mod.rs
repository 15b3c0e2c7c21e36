pub mod chat;
pub mod feedback;
pub mod history;
pub mod reset;

use chatterbox_core::AppState;
use chatterbox_database::{
    impls::chat_messages::{clear_chat_messages, insert_chat_message},
    model::chat_message::ChatMessage,
};
use chatterbox_llm::reply_or_fallback;
use chatterbox_utils::{formatting::preview, parse::format_message_id, protocol::ServerEvent};
use tracing::info;

/// Both sides of one completed exchange, as stored.
#[derive(Clone, Debug)]
pub struct Exchange {
    pub user: ChatMessage,
    pub reply: ChatMessage,
}

/// Store `text` as a user message, produce and store the reply, and announce
/// both on the real-time channel in that order.
pub async fn run_exchange(state: &AppState, text: &str) -> anyhow::Result<Exchange> {
    let user = insert_chat_message(&state.db, text, true).await?;
    state.publish(receive_event(&user));
    info!(message_id = user.id, content = %preview(text, 80), "user message stored");

    let reply_text = reply_or_fallback(state.llm.as_ref(), &state.db, text).await;
    let reply = insert_chat_message(&state.db, &reply_text, false).await?;
    state.publish(receive_event(&reply));
    info!(message_id = reply.id, "assistant reply stored");

    Ok(Exchange { user, reply })
}

/// Drop the stored transcript and tell every client to clear theirs.
pub async fn reset_transcript(state: &AppState) -> anyhow::Result<u64> {
    let removed = clear_chat_messages(&state.db).await?;
    state.publish(ServerEvent::ConversationReset);
    info!(removed, "conversation reset");
    Ok(removed)
}

fn receive_event(message: &ChatMessage) -> ServerEvent {
    ServerEvent::ReceiveMessage {
        message: message.content.clone(),
        is_user: message.is_user,
        message_id: format_message_id(message.id),
    }
}
