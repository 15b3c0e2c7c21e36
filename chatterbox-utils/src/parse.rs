/// Parse a server-assigned message id (decimal, strictly positive).
pub fn parse_message_id(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    value.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Render a server-assigned message id for the wire.
pub fn format_message_id(id: i64) -> String {
    id.to_string()
}

/// Interpret common truthy spellings used in environment variables.
pub fn parse_bool_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
