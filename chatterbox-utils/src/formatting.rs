/// Greeting appended after the conversation has been reset.
pub const RESET_GREETING: &str = "Conversation has been reset. How can I help you?";

/// Shown when a chat exchange fails on the client.
pub const CHAT_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Shown when a reset request fails on the client.
pub const RESET_ERROR_MESSAGE: &str =
    "An error occurred while resetting the conversation. Please try again.";

/// Shown when an upload fails on the client.
pub const UPLOAD_ERROR_MESSAGE: &str =
    "An error occurred while uploading the file. Please try again.";

/// Shown when feedback could not be recorded.
pub const FEEDBACK_ERROR_MESSAGE: &str =
    "An error occurred while saving your feedback. Please try again.";

/// Reply stored and returned when the language model cannot answer.
pub const LLM_FALLBACK_REPLY: &str =
    "I'm sorry, but I encountered an error while processing your request.";

/// Acknowledgement text of `POST /reset_conversation`.
pub const RESET_ACK: &str = "Conversation reset successfully";

/// Acknowledgement text of `POST /upload`.
pub const UPLOAD_ACK: &str = "File uploaded successfully";

/// Acknowledgement text of `POST /feedback`.
pub const FEEDBACK_ACK: &str = "Feedback recorded";

/// Transcript line recorded for an uploaded file (e.g. "File uploaded: /uploads/a.png").
pub fn file_uploaded_message(file_url: &str) -> String {
    format!("File uploaded: {}", file_url)
}

/// Collapse user input to what gets sent; `None` when nothing is left.
pub fn normalize_user_message(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Shorten content for log lines, keeping whole characters.
pub fn preview(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
