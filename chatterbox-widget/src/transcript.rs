use std::fmt;
use std::str::FromStr;

use chatterbox_utils::parse::{format_message_id, parse_message_id};
use uuid::Uuid;

const LOCAL_PREFIX: &str = "local-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Author {
    User,
    Bot,
}

impl Author {
    pub fn from_is_user(is_user: bool) -> Self {
        if is_user { Self::User } else { Self::Bot }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn from_is_like(is_like: bool) -> Self {
        if is_like { Self::Like } else { Self::Dislike }
    }

    pub fn is_like(self) -> bool {
        matches!(self, Self::Like)
    }
}

/// Server-assigned id, or a placeholder for a message the server has not
/// acknowledged yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageId {
    Server(i64),
    Local(Uuid),
}

impl MessageId {
    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Parse a wire id; anything that is not a server id becomes a fresh placeholder.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| Self::new_local())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => f.write_str(&format_message_id(*id)),
            Self::Local(uuid) => write!(f, "{}{}", LOCAL_PREFIX, uuid),
        }
    }
}

impl FromStr for MessageId {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        let value = raw.trim();
        if let Some(uuid) = value.strip_prefix(LOCAL_PREFIX) {
            return Ok(Self::Local(Uuid::parse_str(uuid)?));
        }

        parse_message_id(value)
            .map(Self::Server)
            .ok_or_else(|| anyhow::anyhow!("invalid message id `{value}`"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub content: String,
    pub feedback: Option<Feedback>,
}

impl Message {
    pub fn new(id: MessageId, author: Author, content: impl Into<String>) -> Self {
        Self {
            id,
            author,
            content: content.into(),
            feedback: None,
        }
    }
}

/// Ordered, append-only list of visible messages (cleared only as a whole).
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == *id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }

    /// Replace the id of one message; used once the server acknowledges it.
    pub fn assign_id(&mut self, current: &MessageId, server_id: i64) -> Option<&Message> {
        let message = self.messages.iter_mut().find(|message| message.id == *current)?;
        message.id = MessageId::Server(server_id);
        Some(message)
    }

    /// Give the oldest unacknowledged user message with `content` its server
    /// id. Returns the placeholder it replaced.
    pub fn resolve_pending(&mut self, content: &str, server_id: i64) -> Option<MessageId> {
        let message = self.messages.iter_mut().find(|message| {
            message.id.is_local() && message.author == Author::User && message.content == content
        })?;
        let previous = message.id;
        message.id = MessageId::Server(server_id);
        Some(previous)
    }

    /// Apply a click on a feedback control. Clicking the active value clears
    /// it, clicking the other value switches. Returns the new state, or `None`
    /// when no message has `id`.
    pub fn toggle_feedback(&mut self, id: &MessageId, clicked: Feedback) -> Option<Option<Feedback>> {
        let message = self.messages.iter_mut().find(|message| message.id == *id)?;
        message.feedback = if message.feedback == Some(clicked) {
            None
        } else {
            Some(clicked)
        };
        Some(message.feedback)
    }
}
