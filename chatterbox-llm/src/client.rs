use std::env;

use anyhow::Context as _;
use chatterbox_database::{
    Database, impls::chat_messages::list_recent_chat_messages,
    model::chat_message::ChatMessage as StoredMessage,
};
use chatterbox_utils::{formatting::LLM_FALLBACK_REPLY, parse::parse_bool_flag};
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};
use tracing::{debug, error};

const HISTORY_WINDOW: u32 = 20;

#[derive(Clone, Debug)]
pub struct LlmService {
    client: Ollama,
    model: String,
}

impl LlmService {
    pub fn from_env_optional() -> anyhow::Result<Option<Self>> {
        let enabled = env::var("OLLAMA_ENABLED")
            .ok()
            .map(|value| parse_bool_flag(&value))
            .unwrap_or(true);

        if !enabled {
            return Ok(None);
        }

        let configured = ["OLLAMA_HOST", "OLLAMA_PORT", "OLLAMA_MODEL"]
            .iter()
            .any(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));

        if !configured {
            return Ok(None);
        }

        Ok(Some(Self::from_env()?))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("OLLAMA_HOST")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1".to_owned());
        let port = match env::var("OLLAMA_PORT") {
            Ok(value) if !value.trim().is_empty() => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("OLLAMA_PORT is not a port number: {value}"))?,
            _ => 11434,
        };
        let model = env::var("OLLAMA_MODEL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "llama3.2".to_owned());

        Ok(Self::new(host, port, model))
    }

    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        Self {
            client: Ollama::new(host.into(), port),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a reply to `user_prompt`, given the stored transcript.
    pub async fn generate_reply(&self, db: &Database, user_prompt: &str) -> anyhow::Result<String> {
        let history = list_recent_chat_messages(db, HISTORY_WINDOW).await?;
        let messages = build_chat_messages(&crate::prompt::system_prompt(), &history, user_prompt);
        debug!(model = %self.model, messages = messages.len(), "sending chat request");

        let request = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(0.7));
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .context("failed to get ollama chat response")?;

        let reply = response.message.content.trim().to_owned();
        if reply.is_empty() {
            anyhow::bail!("ollama returned an empty reply");
        }

        Ok(reply)
    }
}

/// Reply from `llm`, or the apology text when it is missing or fails.
pub async fn reply_or_fallback(
    llm: Option<&LlmService>,
    db: &Database,
    user_prompt: &str,
) -> String {
    let Some(llm) = llm else {
        debug!("no LLM configured; using fallback reply");
        return LLM_FALLBACK_REPLY.to_owned();
    };

    match llm.generate_reply(db, user_prompt).await {
        Ok(reply) => reply,
        Err(source) => {
            error!(?source, model = %llm.model(), "failed to generate chat reply");
            LLM_FALLBACK_REPLY.to_owned()
        }
    }
}

/// `history` is newest first. When its newest entry is the prompt itself
/// (already persisted by the caller) it is not repeated.
fn build_chat_messages(
    system: &str,
    history: &[StoredMessage],
    user_prompt: &str,
) -> Vec<ChatMessage> {
    let skip_latest = history
        .first()
        .is_some_and(|latest| latest.is_user && latest.content == user_prompt);
    let earlier = if skip_latest { &history[1..] } else { history };

    let mut messages = Vec::with_capacity(earlier.len() + 2);
    messages.push(ChatMessage::system(system.to_owned()));

    for item in earlier.iter().rev() {
        messages.push(if item.is_user {
            ChatMessage::user(item.content.clone())
        } else {
            ChatMessage::assistant(item.content.clone())
        });
    }

    messages.push(ChatMessage::user(user_prompt.to_owned()));
    messages
}
