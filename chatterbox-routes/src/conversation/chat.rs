use axum::{Json, extract::State};
use chatterbox_core::AppState;
use chatterbox_utils::{
    formatting::normalize_user_message,
    parse::format_message_id,
    protocol::{ChatRequest, ChatResponse},
};

use super::run_exchange;
use crate::{ApiError, RouteMeta};

pub const META: RouteMeta = RouteMeta {
    method: "POST",
    path: "/chat",
    desc: "Send a message and receive the assistant reply.",
};

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Some(text) = normalize_user_message(&request.message) else {
        return Err(ApiError::bad_request("Message must not be empty"));
    };

    let exchange = run_exchange(&state, text).await?;

    Ok(Json(ChatResponse {
        response: exchange.reply.content,
        message_id: Some(format_message_id(exchange.reply.id)),
        user_message_id: Some(format_message_id(exchange.user.id)),
    }))
}
