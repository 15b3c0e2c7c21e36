use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Reply of `POST /chat`. The id fields are absent on older servers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message_id: Option<String>,
}

/// Generic acknowledgement body (`{"message": "..."}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reply of `POST /upload`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    pub file_url: String,
}

/// Error body returned with any non-2xx status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /feedback`. `is_like: null` clears the feedback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    #[serde(default)]
    pub is_like: Option<bool>,
}

/// One element of `GET /history`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: String,
    pub is_user: bool,
    pub message_id: String,
    /// Like flag; only meaningful when `there_is_feedback` is set.
    #[serde(default)]
    pub feedback: bool,
    #[serde(rename = "thereIsFeedback", default)]
    pub there_is_feedback: bool,
}

impl HistoryEntry {
    /// Decode the two feedback flags into like (`Some(true)`), dislike or none.
    pub fn is_like(&self) -> Option<bool> {
        self.there_is_feedback.then_some(self.feedback)
    }
}

/// Events a client emits on the real-time channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage { message: String },
    ResetConversation,
}

/// Events the server pushes on the real-time channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage {
        message: String,
        is_user: bool,
        message_id: String,
    },
    ConversationReset,
    /// `operation` names the client event that failed; absent when the
    /// frame itself could not be understood.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<RealtimeOperation>,
    },
    /// The connection fell behind and `skipped` events were dropped.
    EventsMissed {
        skipped: u64,
    },
}

/// Client operations a server error can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeOperation {
    SendMessage,
    ResetConversation,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Number(value) => value.to_string(),
    })
}
