use axum::{Json, extract::State};
use chatterbox_core::AppState;
use chatterbox_utils::{formatting::RESET_ACK, protocol::Ack};

use super::reset_transcript;
use crate::{ApiError, RouteMeta};

pub const META: RouteMeta = RouteMeta {
    method: "POST",
    path: "/reset_conversation",
    desc: "Delete the stored conversation.",
};

pub async fn reset_conversation(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    reset_transcript(&state).await?;
    Ok(Json(Ack::new(RESET_ACK)))
}
