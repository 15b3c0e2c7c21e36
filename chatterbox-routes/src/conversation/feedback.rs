use axum::{Json, extract::State};
use chatterbox_core::AppState;
use chatterbox_database::impls::chat_messages::set_message_feedback;
use chatterbox_utils::{
    formatting::FEEDBACK_ACK,
    parse::parse_message_id,
    protocol::{Ack, FeedbackRequest},
};
use tracing::info;

use crate::{ApiError, RouteMeta};

pub const META: RouteMeta = RouteMeta {
    method: "POST",
    path: "/feedback",
    desc: "Like, dislike, or clear feedback on a message.",
};

pub async fn feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Ack>, ApiError> {
    let Some(message_id) = parse_message_id(&request.message_id) else {
        return Err(ApiError::bad_request("Invalid message id"));
    };

    if !set_message_feedback(&state.db, message_id, request.is_like).await? {
        return Err(ApiError::not_found("Message not found"));
    }

    info!(message_id, is_like = ?request.is_like, "feedback recorded");
    Ok(Json(Ack::new(FEEDBACK_ACK)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::{offline_state, scratch_dir, spawn_app};

    #[tokio::test]
    async fn rejects_placeholder_ids() {
        let addr = spawn_app(offline_state(scratch_dir())).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/feedback"))
            .json(&json!({"message_id": "local-5f3c", "is_like": true}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid message id");
    }
}
