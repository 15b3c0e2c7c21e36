//! Client side of Chatterbox: a chat widget that keeps the visible
//! transcript, talks to the server over HTTP or the real-time channel, and
//! draws through a [`View`].

pub mod backend;
pub mod channel;
pub mod config;
pub mod markup;
pub mod transcript;
pub mod typing;
pub mod view;
pub mod widget;

pub use backend::{ChatBackend, HttpBackend};
pub use channel::{RealtimeChannel, realtime_url};
pub use config::WidgetConfig;
pub use transcript::{Author, Feedback, Message, MessageId, Transcript};
pub use view::{RecordingView, RenderedMessage, View};
pub use widget::Widget;
