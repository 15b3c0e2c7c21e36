use chatterbox_utils::{
    formatting::{
        CHAT_ERROR_MESSAGE, FEEDBACK_ERROR_MESSAGE, RESET_ERROR_MESSAGE, RESET_GREETING,
        UPLOAD_ERROR_MESSAGE, file_uploaded_message, normalize_user_message, preview,
    },
    parse::parse_message_id,
    protocol::{ClientEvent, HistoryEntry, RealtimeOperation, ServerEvent},
};
use tracing::{debug, error, warn};

use crate::backend::ChatBackend;
use crate::channel::EventSender;
use crate::transcript::{Author, Feedback, Message, MessageId, Transcript};
use crate::typing::TypingIndicator;
use crate::view::{RenderedMessage, View};

/// The chat widget: owns the transcript and mirrors every change into a view.
///
/// Handlers take `&mut self`, so events are applied one at a time in the
/// order the caller delivers them.
pub struct Widget<B, V> {
    backend: B,
    view: V,
    transcript: Transcript,
    typing: TypingIndicator,
    realtime: Option<EventSender>,
    /// Real-time sends whose echo has not come back yet.
    awaiting_echo: usize,
    /// Real-time sends echoed by the server and still waiting for the reply.
    awaiting_reply: usize,
}

impl<B, V> Widget<B, V>
where
    B: ChatBackend,
    V: View,
{
    pub fn new(backend: B, view: V) -> Self {
        Self {
            backend,
            view,
            transcript: Transcript::new(),
            typing: TypingIndicator::default(),
            realtime: None,
            awaiting_echo: 0,
            awaiting_reply: 0,
        }
    }

    /// Route sends and resets through the real-time channel from now on.
    pub fn attach_realtime(&mut self, sender: EventSender) {
        self.realtime = Some(sender);
    }

    /// Stop using the real-time channel. Exchanges still waiting on it are
    /// abandoned with an apology.
    pub fn detach_realtime(&mut self) {
        self.realtime = None;
        self.abandon_realtime_exchanges();
    }

    pub fn is_realtime(&self) -> bool {
        self.realtime.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_visible()
    }

    /// Submit user input. Blank input is ignored.
    pub async fn submit(&mut self, raw: &str) {
        let Some(text) = normalize_user_message(raw) else {
            debug!("ignored blank input");
            return;
        };
        let text = text.to_owned();

        debug!(content = %preview(&text, 80), realtime = self.is_realtime(), "sending message");
        let local_id = self.append(Message::new(MessageId::new_local(), Author::User, &text));
        self.view.clear_input();
        self.begin_exchange();

        if let Some(sender) = &self.realtime {
            let event = ClientEvent::SendMessage {
                message: text.clone(),
            };
            if sender.send(event).is_ok() {
                // The reply arrives through `handle_event`.
                self.awaiting_echo += 1;
                return;
            }

            error!("real-time channel closed; falling back to HTTP");
            self.detach_realtime();
        }

        match self.backend.chat(&text).await {
            Ok(response) => {
                let acknowledged = response.user_message_id.as_deref().and_then(parse_message_id);
                if let Some(server_id) = acknowledged {
                    self.assign_server_id(&local_id, server_id);
                }
                self.end_exchange();
                let reply_id = response
                    .message_id
                    .as_deref()
                    .map_or_else(MessageId::new_local, MessageId::from_wire);
                self.append(Message::new(reply_id, Author::Bot, response.response));
            }
            Err(source) => {
                error!(?source, "chat request failed");
                self.end_exchange();
                self.append_notice(CHAT_ERROR_MESSAGE);
            }
        }
    }

    /// Ask the server to forget the conversation, then start over locally.
    pub async fn reset(&mut self) {
        debug!(realtime = self.is_realtime(), "resetting conversation");

        if let Some(sender) = &self.realtime {
            if sender.send(ClientEvent::ResetConversation).is_ok() {
                // Cleared when `conversation_reset` comes back.
                return;
            }

            error!("real-time channel closed; falling back to HTTP");
            self.detach_realtime();
        }

        match self.backend.reset().await {
            Ok(ack) => {
                debug!(message = %ack.message, "reset acknowledged");
                self.start_over();
            }
            Err(source) => {
                error!(?source, "reset request failed");
                self.append_notice(RESET_ERROR_MESSAGE);
            }
        }
    }

    pub async fn upload(&mut self, file_name: &str, bytes: Vec<u8>) {
        debug!(file_name, size = bytes.len(), "uploading file");
        self.begin_exchange();

        match self.backend.upload(file_name, bytes).await {
            Ok(response) => {
                self.end_exchange();
                self.append(Message::new(
                    MessageId::new_local(),
                    Author::User,
                    file_uploaded_message(&response.file_url),
                ));
            }
            Err(source) => {
                error!(?source, file_name, "upload failed");
                self.end_exchange();
                self.append_notice(UPLOAD_ERROR_MESSAGE);
            }
        }
    }

    /// Click on a like/dislike control of message `id`.
    pub async fn toggle_feedback(&mut self, id: &MessageId, clicked: Feedback) {
        let Some(state) = self.transcript.toggle_feedback(id, clicked) else {
            debug!(%id, "feedback for unknown message ignored");
            return;
        };
        self.redraw(id);

        let MessageId::Server(_) = id else {
            debug!(%id, "feedback on unacknowledged message kept locally");
            return;
        };

        let is_like = state.map(Feedback::is_like);
        if let Err(source) = self.backend.feedback(&id.to_string(), is_like).await {
            error!(?source, %id, "feedback request failed");
            self.append_notice(FEEDBACK_ERROR_MESSAGE);
        }
    }

    /// Replace the transcript with the server's stored conversation.
    pub async fn load_history(&mut self) {
        match self.backend.history().await {
            Ok(entries) => {
                debug!(entries = entries.len(), "history loaded");
                self.transcript.clear();
                self.view.clear_messages();
                for entry in entries {
                    self.append(message_from_history(entry));
                }
            }
            Err(source) => {
                error!(?source, "history request failed");
                self.append_notice(CHAT_ERROR_MESSAGE);
            }
        }
    }

    /// Apply one event from the real-time channel.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::ReceiveMessage {
                message,
                is_user,
                message_id,
            } => {
                let id = MessageId::from_wire(&message_id);
                if self.transcript.contains(&id) {
                    debug!(%id, "duplicate message ignored");
                    return;
                }

                if is_user {
                    self.receive_user_echo(id, message);
                } else {
                    // Replies to other clients' messages leave the indicator alone.
                    if self.awaiting_reply > 0 {
                        self.awaiting_reply -= 1;
                        self.end_exchange();
                    }
                    self.append(Message::new(id, Author::Bot, message));
                }
            }
            ServerEvent::ConversationReset => self.start_over(),
            ServerEvent::Error { message, operation } => {
                error!(%message, ?operation, "server reported a real-time error");
                match operation {
                    Some(RealtimeOperation::SendMessage) => {
                        if self.awaiting_reply > 0 {
                            self.awaiting_reply -= 1;
                        } else {
                            self.awaiting_echo = self.awaiting_echo.saturating_sub(1);
                        }
                        self.end_exchange();
                        self.append_notice(CHAT_ERROR_MESSAGE);
                    }
                    Some(RealtimeOperation::ResetConversation) => {
                        self.append_notice(RESET_ERROR_MESSAGE);
                    }
                    None => self.append_notice(CHAT_ERROR_MESSAGE),
                }
            }
            ServerEvent::EventsMissed { skipped } => {
                warn!(skipped, "real-time events were dropped by the server");
                self.abandon_realtime_exchanges();
            }
        }
    }

    fn receive_user_echo(&mut self, id: MessageId, content: String) {
        let MessageId::Server(server_id) = id else {
            self.append(Message::new(id, Author::User, content));
            return;
        };

        match self.transcript.resolve_pending(&content, server_id) {
            Some(placeholder) => {
                debug!(%placeholder, %id, "local message acknowledged");
                if self.awaiting_echo > 0 {
                    self.awaiting_echo -= 1;
                    self.awaiting_reply += 1;
                }
                self.redraw_from(&placeholder, &id);
            }
            // Sent from another client.
            None => {
                self.append(Message::new(id, Author::User, content));
            }
        }
    }

    fn start_over(&mut self) {
        self.awaiting_echo = 0;
        self.awaiting_reply = 0;
        if self.typing.reset() {
            self.view.set_typing(false);
        }
        self.transcript.clear();
        self.view.clear_messages();
        self.append(Message::new(MessageId::new_local(), Author::Bot, RESET_GREETING));
    }

    /// Give up on every real-time exchange still in flight.
    fn abandon_realtime_exchanges(&mut self) {
        let stranded = self.awaiting_echo + self.awaiting_reply;
        if stranded == 0 {
            return;
        }

        warn!(stranded, "real-time exchanges abandoned without a reply");
        self.awaiting_echo = 0;
        self.awaiting_reply = 0;
        for _ in 0..stranded {
            self.end_exchange();
        }
        self.append_notice(CHAT_ERROR_MESSAGE);
    }

    fn append(&mut self, message: Message) -> MessageId {
        let stored = self.transcript.push(message);
        let id = stored.id;
        self.view.append_message(&RenderedMessage::from(stored));
        self.view.scroll_to_bottom();
        id
    }

    fn append_notice(&mut self, text: &str) {
        self.append(Message::new(MessageId::new_local(), Author::Bot, text));
    }

    fn assign_server_id(&mut self, local_id: &MessageId, server_id: i64) {
        if self.transcript.assign_id(local_id, server_id).is_some() {
            self.redraw_from(local_id, &MessageId::Server(server_id));
        }
    }

    fn redraw(&mut self, id: &MessageId) {
        self.redraw_from(id, id);
    }

    fn redraw_from(&mut self, previous_id: &MessageId, id: &MessageId) {
        if let Some(message) = self.transcript.get(id) {
            self.view.update_message(previous_id, &RenderedMessage::from(message));
        }
    }

    fn begin_exchange(&mut self) {
        if self.typing.begin() {
            self.view.set_typing(true);
            self.view.scroll_to_bottom();
        }
    }

    fn end_exchange(&mut self) {
        if self.typing.end() {
            self.view.set_typing(false);
        }
    }
}

fn message_from_history(entry: HistoryEntry) -> Message {
    let mut message = Message::new(
        MessageId::from_wire(&entry.message_id),
        Author::from_is_user(entry.is_user),
        entry.content.clone(),
    );
    message.feedback = entry.is_like().map(Feedback::from_is_like);
    message
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chatterbox_utils::formatting::{
        CHAT_ERROR_MESSAGE, FEEDBACK_ERROR_MESSAGE, RESET_ERROR_MESSAGE, RESET_GREETING,
        UPLOAD_ERROR_MESSAGE,
    };
    use chatterbox_utils::protocol::{
        Ack, ChatResponse, ClientEvent, HistoryEntry, RealtimeOperation, ServerEvent,
        UploadResponse,
    };
    use tokio::sync::mpsc;

    use super::Widget;
    use crate::backend::ChatBackend;
    use crate::transcript::{Author, Feedback, MessageId};
    use crate::view::RecordingView;

    /// Scripted backend: each call pops the next canned outcome.
    #[derive(Default)]
    struct FakeBackend {
        chat: Mutex<VecDeque<anyhow::Result<ChatResponse>>>,
        reset_ok: Mutex<VecDeque<bool>>,
        upload: Mutex<VecDeque<anyhow::Result<UploadResponse>>>,
        history: Mutex<VecDeque<Vec<HistoryEntry>>>,
        feedback_calls: Mutex<Vec<(String, Option<bool>)>>,
        feedback_fails: Mutex<bool>,
        chat_calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            let backend = Self::default();
            backend.chat.lock().unwrap().push_back(Ok(ChatResponse {
                response: reply.to_owned(),
                message_id: Some("2".to_owned()),
                user_message_id: Some("1".to_owned()),
            }));
            backend
        }
    }

    impl ChatBackend for FakeBackend {
        async fn chat(&self, message: &str) -> anyhow::Result<ChatResponse> {
            self.chat_calls.lock().unwrap().push(message.to_owned());
            self.chat
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted chat reply")))
        }

        async fn reset(&self) -> anyhow::Result<Ack> {
            match self.reset_ok.lock().unwrap().pop_front() {
                Some(true) => Ok(Ack::new("Conversation reset successfully")),
                _ => Err(anyhow::anyhow!("reset refused")),
            }
        }

        async fn upload(&self, _file_name: &str, _bytes: Vec<u8>) -> anyhow::Result<UploadResponse> {
            self.upload
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted upload")))
        }

        async fn feedback(&self, message_id: &str, is_like: Option<bool>) -> anyhow::Result<Ack> {
            self.feedback_calls
                .lock()
                .unwrap()
                .push((message_id.to_owned(), is_like));
            if *self.feedback_fails.lock().unwrap() {
                anyhow::bail!("feedback store unavailable");
            }
            Ok(Ack::new("Feedback recorded"))
        }

        async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
            self.history
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no scripted history"))
        }
    }

    fn widget(backend: FakeBackend) -> Widget<FakeBackend, RecordingView> {
        Widget::new(backend, RecordingView::default())
    }

    #[tokio::test]
    async fn sending_appends_one_user_message_and_the_reply() {
        let mut widget = widget(FakeBackend::replying("Hi! How can I help?"));

        widget.submit("  hello  ").await;

        let view = widget.view();
        assert_eq!(view.texts(), vec!["hello", "Hi! How can I help?"]);
        assert_eq!(view.input_cleared, 1);
        assert_eq!(view.messages[0].author, Author::User);
        assert_eq!(view.messages[0].id, MessageId::Server(1));
        assert_eq!(view.messages[1].id, MessageId::Server(2));
        assert_eq!(view.typing_shown, 1);
        assert_eq!(view.typing_hidden, 1);
        assert!(!view.typing_visible);
        assert_eq!(*widget.backend.chat_calls.lock().unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let mut widget = widget(FakeBackend::default());

        widget.submit("").await;
        widget.submit("  \n\t ").await;

        let view = widget.view();
        assert!(view.messages.is_empty());
        assert_eq!(view.input_cleared, 0);
        assert_eq!(view.typing_shown, 0);
        assert!(widget.backend.chat_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_send_hides_typing_and_apologizes() {
        let mut widget = widget(FakeBackend::default());

        widget.submit("hello").await;

        let view = widget.view();
        assert_eq!(view.texts(), vec!["hello", CHAT_ERROR_MESSAGE]);
        assert_eq!(view.messages[1].author, Author::Bot);
        assert_eq!(view.typing_shown, 1);
        assert_eq!(view.typing_hidden, 1);
        assert!(!widget.is_typing());
    }

    #[tokio::test]
    async fn reset_clears_and_greets_once() {
        let backend = FakeBackend::replying("reply");
        backend.reset_ok.lock().unwrap().push_back(true);
        let mut widget = widget(backend);

        widget.submit("hello").await;
        widget.reset().await;

        assert_eq!(widget.view().texts(), vec![RESET_GREETING]);
        assert_eq!(widget.transcript().len(), 1);
    }

    #[tokio::test]
    async fn failed_reset_keeps_transcript() {
        let mut widget = widget(FakeBackend::replying("reply"));

        widget.submit("hello").await;
        widget.reset().await;

        assert_eq!(widget.view().texts(), vec!["hello", "reply", RESET_ERROR_MESSAGE]);
    }

    #[tokio::test]
    async fn upload_confirms_with_file_url() {
        let backend = FakeBackend::default();
        backend.upload.lock().unwrap().push_back(Ok(UploadResponse {
            message: "File uploaded successfully".to_owned(),
            file_url: "/uploads/notes.txt".to_owned(),
        }));
        backend
            .upload
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!("too big")));
        let mut widget = widget(backend);

        widget.upload("notes.txt", b"text".to_vec()).await;
        widget.upload("huge.pdf", vec![0; 8]).await;

        let view = widget.view();
        assert_eq!(
            view.texts(),
            vec!["File uploaded: /uploads/notes.txt", UPLOAD_ERROR_MESSAGE]
        );
        assert_eq!(view.messages[0].author, Author::User);
        assert_eq!(view.typing_shown, 2);
        assert_eq!(view.typing_hidden, 2);
    }

    #[tokio::test]
    async fn feedback_toggles_one_message_and_reports_state() {
        let mut widget = widget(FakeBackend::replying("reply"));
        widget.submit("hello").await;
        let reply_id = MessageId::Server(2);
        let user_id = MessageId::Server(1);

        widget.toggle_feedback(&reply_id, Feedback::Like).await;
        widget.toggle_feedback(&reply_id, Feedback::Dislike).await;
        widget.toggle_feedback(&reply_id, Feedback::Dislike).await;

        assert_eq!(widget.transcript().get(&reply_id).unwrap().feedback, None);
        assert_eq!(widget.transcript().get(&user_id).unwrap().feedback, None);
        assert_eq!(
            *widget.backend.feedback_calls.lock().unwrap(),
            vec![
                ("2".to_owned(), Some(true)),
                ("2".to_owned(), Some(false)),
                ("2".to_owned(), None),
            ]
        );

        widget.toggle_feedback(&reply_id, Feedback::Like).await;
        assert_eq!(widget.view().messages[1].feedback, Some(Feedback::Like));
        assert_eq!(widget.view().messages[0].feedback, None);
    }

    #[tokio::test]
    async fn feedback_on_placeholder_stays_local() {
        let mut widget = widget(FakeBackend::default());
        widget.handle_event(ServerEvent::ConversationReset);
        let greeting_id = widget.view().messages[0].id;

        widget.toggle_feedback(&greeting_id, Feedback::Like).await;

        assert_eq!(widget.view().messages[0].feedback, Some(Feedback::Like));
        assert!(widget.backend.feedback_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_replaces_transcript_in_order() {
        let backend = FakeBackend::default();
        backend.history.lock().unwrap().push_back(vec![
            HistoryEntry {
                content: "hi".to_owned(),
                is_user: true,
                message_id: "3".to_owned(),
                feedback: false,
                there_is_feedback: false,
            },
            HistoryEntry {
                content: "**hello**".to_owned(),
                is_user: false,
                message_id: "4".to_owned(),
                feedback: false,
                there_is_feedback: true,
            },
        ]);
        let mut widget = widget(backend);

        widget.load_history().await;

        let view = widget.view();
        assert_eq!(view.texts(), vec!["hi", "**hello**"]);
        assert_eq!(view.messages[1].html, "<p><strong>hello</strong></p>");
        assert_eq!(view.messages[1].feedback, Some(Feedback::Dislike));
    }

    #[tokio::test]
    async fn realtime_exchange_resolves_echo_and_appends_reply() {
        let (sender, mut outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        assert!(widget.is_typing());
        assert_eq!(
            outgoing.try_recv().unwrap(),
            ClientEvent::SendMessage {
                message: "hello".to_owned()
            }
        );

        widget.handle_event(ServerEvent::ReceiveMessage {
            message: "hello".to_owned(),
            is_user: true,
            message_id: "7".to_owned(),
        });
        assert!(widget.is_typing());
        assert_eq!(widget.view().texts(), vec!["hello"]);
        assert_eq!(widget.view().messages[0].id, MessageId::Server(7));

        widget.handle_event(ServerEvent::ReceiveMessage {
            message: "hi!".to_owned(),
            is_user: false,
            message_id: "8".to_owned(),
        });

        let view = widget.view();
        assert_eq!(view.texts(), vec!["hello", "hi!"]);
        assert_eq!(view.typing_shown, 1);
        assert_eq!(view.typing_hidden, 1);
        assert!(widget.backend.chat_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn realtime_events_from_other_clients_are_appended_once() {
        let mut widget = widget(FakeBackend::default());
        let event = ServerEvent::ReceiveMessage {
            message: "from another tab".to_owned(),
            is_user: true,
            message_id: "11".to_owned(),
        };

        widget.handle_event(event.clone());
        widget.handle_event(event);

        assert_eq!(widget.view().texts(), vec!["from another tab"]);
        assert_eq!(widget.view().typing_hidden, 0);
    }

    #[tokio::test]
    async fn realtime_reset_waits_for_server_confirmation() {
        let (sender, mut outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        widget.reset().await;
        assert_eq!(widget.view().texts(), vec!["hello"]);
        assert!(matches!(outgoing.try_recv(), Ok(ClientEvent::SendMessage { .. })));
        assert_eq!(outgoing.try_recv().unwrap(), ClientEvent::ResetConversation);

        widget.handle_event(ServerEvent::ConversationReset);

        let view = widget.view();
        assert_eq!(view.texts(), vec![RESET_GREETING]);
        assert!(!view.typing_visible);
        assert_eq!(view.typing_hidden, 1);
    }

    #[tokio::test]
    async fn closed_channel_falls_back_to_http() {
        let (sender, outgoing) = mpsc::unbounded_channel();
        drop(outgoing);
        let mut widget = widget(FakeBackend::replying("over http"));
        widget.attach_realtime(sender);

        widget.submit("hello").await;

        assert!(!widget.is_realtime());
        assert_eq!(widget.view().texts(), vec!["hello", "over http"]);
        assert_eq!(widget.view().typing_hidden, 1);
    }

    #[tokio::test]
    async fn server_error_event_ends_exchange_with_apology() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        widget.handle_event(ServerEvent::Error {
            message: "Failed to process your message.".to_owned(),
            operation: Some(RealtimeOperation::SendMessage),
        });

        assert_eq!(widget.view().texts(), vec!["hello", CHAT_ERROR_MESSAGE]);
        assert!(!widget.is_typing());
        assert_eq!(widget.view().typing_hidden, 1);
    }

    fn receive(message: &str, is_user: bool, message_id: &str) -> ServerEvent {
        ServerEvent::ReceiveMessage {
            message: message.to_owned(),
            is_user,
            message_id: message_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn another_clients_exchange_leaves_typing_alone() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        widget.handle_event(receive("from another tab", true, "20"));
        widget.handle_event(receive("answer for the other tab", false, "21"));

        assert!(widget.is_typing());
        assert_eq!(widget.view().typing_hidden, 0);

        widget.handle_event(receive("hello", true, "22"));
        widget.handle_event(receive("hi!", false, "23"));

        let view = widget.view();
        assert!(!widget.is_typing());
        assert_eq!(view.typing_shown, 1);
        assert_eq!(view.typing_hidden, 1);
        assert_eq!(
            view.texts(),
            vec!["hello", "from another tab", "answer for the other tab", "hi!"]
        );
        assert_eq!(view.messages[0].id, MessageId::Server(22));
    }

    #[tokio::test]
    async fn failed_realtime_reset_apologizes_without_ending_the_exchange() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        widget.reset().await;
        widget.handle_event(ServerEvent::Error {
            message: "Failed to reset the conversation.".to_owned(),
            operation: Some(RealtimeOperation::ResetConversation),
        });

        assert_eq!(widget.view().texts(), vec!["hello", RESET_ERROR_MESSAGE]);
        assert!(widget.is_typing());

        widget.handle_event(receive("hello", true, "5"));
        widget.handle_event(receive("reply", false, "6"));
        assert!(!widget.is_typing());
        assert_eq!(widget.view().typing_hidden, 1);
    }

    #[tokio::test]
    async fn losing_the_channel_ends_pending_exchanges_with_an_apology() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("first").await;
        widget.submit("second").await;
        widget.handle_event(receive("first", true, "1"));
        widget.detach_realtime();

        let view = widget.view();
        assert!(!widget.is_realtime());
        assert!(!widget.is_typing());
        assert!(!view.typing_visible);
        assert_eq!(view.typing_hidden, 1);
        assert_eq!(view.texts(), vec!["first", "second", CHAT_ERROR_MESSAGE]);

        // A late reply after detaching does not touch the indicator again.
        widget.handle_event(receive("late", false, "2"));
        assert_eq!(widget.view().typing_hidden, 1);
    }

    #[tokio::test]
    async fn detaching_an_idle_channel_is_silent() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.detach_realtime();

        assert!(widget.view().messages.is_empty());
        assert_eq!(widget.view().typing_hidden, 0);
    }

    #[tokio::test]
    async fn missed_events_abandon_pending_exchanges() {
        let (sender, _outgoing) = mpsc::unbounded_channel();
        let mut widget = widget(FakeBackend::default());
        widget.attach_realtime(sender);

        widget.submit("hello").await;
        widget.handle_event(ServerEvent::EventsMissed { skipped: 4 });

        assert!(!widget.is_typing());
        assert!(widget.is_realtime());
        assert_eq!(widget.view().texts(), vec!["hello", CHAT_ERROR_MESSAGE]);
    }

    #[tokio::test]
    async fn failed_feedback_apologizes_and_keeps_local_toggle() {
        let backend = FakeBackend::replying("reply");
        *backend.feedback_fails.lock().unwrap() = true;
        let mut widget = widget(backend);
        widget.submit("hello").await;
        let reply_id = MessageId::Server(2);

        widget.toggle_feedback(&reply_id, Feedback::Like).await;

        assert_eq!(
            widget.transcript().get(&reply_id).unwrap().feedback,
            Some(Feedback::Like)
        );
        assert_eq!(widget.view().messages[1].feedback, Some(Feedback::Like));
        assert_eq!(
            widget.view().texts(),
            vec!["hello", "reply", FEEDBACK_ERROR_MESSAGE]
        );
        assert_eq!(
            *widget.backend.feedback_calls.lock().unwrap(),
            vec![("2".to_owned(), Some(true))]
        );
    }

    #[tokio::test]
    async fn failed_history_load_keeps_transcript_and_apologizes() {
        let mut widget = widget(FakeBackend::replying("reply"));
        widget.submit("hello").await;

        widget.load_history().await;

        assert_eq!(
            widget.view().texts(),
            vec!["hello", "reply", CHAT_ERROR_MESSAGE]
        );
        assert_eq!(widget.transcript().len(), 3);
    }
}
