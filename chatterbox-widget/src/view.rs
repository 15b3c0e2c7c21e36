use crate::markup::{escape_html, render_markup};
use crate::transcript::{Author, Feedback, Message, MessageId};

/// A message as handed to the view: plain text plus rendered HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    pub html: String,
    pub feedback: Option<Feedback>,
}

impl From<&Message> for RenderedMessage {
    fn from(message: &Message) -> Self {
        // Only assistant replies carry markup; user text is shown verbatim.
        let html = match message.author {
            Author::Bot => render_markup(&message.content),
            Author::User => escape_html(&message.content),
        };

        Self {
            id: message.id,
            author: message.author,
            text: message.content.clone(),
            html,
            feedback: message.feedback,
        }
    }
}

/// The surface the widget draws on (a DOM, a terminal, a test recorder).
pub trait View {
    fn append_message(&mut self, message: &RenderedMessage);
    /// Redraw a message in place; `previous_id` is the id it was drawn with.
    fn update_message(&mut self, previous_id: &MessageId, message: &RenderedMessage);
    fn clear_messages(&mut self);
    fn set_typing(&mut self, visible: bool);
    fn clear_input(&mut self);
    fn scroll_to_bottom(&mut self);
}

/// Headless view that keeps what would be on screen.
#[derive(Clone, Debug, Default)]
pub struct RecordingView {
    pub messages: Vec<RenderedMessage>,
    pub typing_visible: bool,
    pub typing_shown: usize,
    pub typing_hidden: usize,
    pub input_cleared: usize,
    pub scrolls: usize,
}

impl RecordingView {
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|message| message.text.as_str()).collect()
    }
}

impl View for RecordingView {
    fn append_message(&mut self, message: &RenderedMessage) {
        self.messages.push(message.clone());
    }

    fn update_message(&mut self, previous_id: &MessageId, message: &RenderedMessage) {
        if let Some(slot) = self
            .messages
            .iter_mut()
            .find(|existing| existing.id == *previous_id)
        {
            *slot = message.clone();
        }
    }

    fn clear_messages(&mut self) {
        self.messages.clear();
    }

    fn set_typing(&mut self, visible: bool) {
        if visible {
            self.typing_shown += 1;
        } else {
            self.typing_hidden += 1;
        }
        self.typing_visible = visible;
    }

    fn clear_input(&mut self) {
        self.input_cleared += 1;
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolls += 1;
    }
}
