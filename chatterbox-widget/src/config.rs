use std::env;

use chatterbox_utils::parse::parse_bool_flag;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetConfig {
    pub base_url: String,
    /// Use the real-time channel for sending and resetting.
    pub realtime: bool,
}

impl WidgetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("CHATTERBOX_URL")
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let realtime = lookup("CHATTERBOX_REALTIME").is_none_or(|value| parse_bool_flag(&value));

        Self { base_url, realtime }
    }
}
