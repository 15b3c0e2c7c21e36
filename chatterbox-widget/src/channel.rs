use anyhow::Context as _;
use chatterbox_utils::protocol::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Sending half of the real-time channel, as held by the widget.
pub type EventSender = mpsc::UnboundedSender<ClientEvent>;

/// Receiving half: server events in arrival order.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// WebSocket connection to `/ws`, split into an outgoing queue and an
/// incoming queue serviced by two background tasks.
#[derive(Debug)]
pub struct RealtimeChannel {
    outbox: EventSender,
    inbox: EventReceiver,
}

impl RealtimeChannel {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to open real-time channel at {url}"))?;
        info!(%url, "real-time channel connected");

        let (mut sink, mut stream) = socket.split();
        let (outbox, mut outgoing) = mpsc::unbounded_channel::<ClientEvent>();
        let (incoming, inbox) = mpsc::unbounded_channel::<ServerEvent>();

        tokio::spawn(async move {
            while let Some(event) = outgoing.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(source) => {
                        error!(?source, "failed to encode real-time event");
                        continue;
                    }
                };

                if let Err(source) = sink.send(Message::Text(payload)).await {
                    warn!(?source, "real-time send failed; closing writer");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if incoming.send(event).is_err() {
                                break;
                            }
                        }
                        Err(source) => warn!(?source, "ignored malformed real-time event"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(source) => {
                        warn!(?source, "real-time channel read failed");
                        break;
                    }
                }
            }
            debug!("real-time reader finished");
        });

        Ok(Self { outbox, inbox })
    }

    pub fn sender(&self) -> EventSender {
        self.outbox.clone()
    }

    pub fn send(&self, event: ClientEvent) -> anyhow::Result<()> {
        self.outbox
            .send(event)
            .map_err(|_| anyhow::anyhow!("real-time channel is closed"))
    }

    /// Next server event; `None` once the connection is gone.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.inbox.recv().await
    }

    pub fn into_parts(self) -> (EventSender, EventReceiver) {
        (self.outbox, self.inbox)
    }
}

/// Derive the `/ws` URL from the HTTP base URL (`http` → `ws`, `https` → `wss`).
/// A path prefix on the base is kept; query and fragment are dropped.
pub fn realtime_url(base_url: &str) -> anyhow::Result<String> {
    let mut url =
        Url::parse(base_url.trim()).with_context(|| format!("invalid base URL: {base_url}"))?;

    let ws_scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("unsupported URL scheme `{other}`"),
    };
    url.set_scheme(ws_scheme)
        .map_err(|()| anyhow::anyhow!("cannot switch {base_url} to `{ws_scheme}`"))?;
    url.set_query(None);
    url.set_fragment(None);

    if !url.path().ends_with('/') {
        let prefix = format!("{}/", url.path());
        url.set_path(&prefix);
    }

    let url = url.join("ws").context("failed to derive the real-time URL")?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use chatterbox_utils::protocol::{ClientEvent, ServerEvent};
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::{accept_async, tungstenite::Message};

    use super::{RealtimeChannel, realtime_url};

    #[test]
    fn derives_socket_urls() {
        assert_eq!(realtime_url("http://127.0.0.1:5000/").unwrap(), "ws://127.0.0.1:5000/ws");
        assert_eq!(realtime_url("https://chat.example").unwrap(), "wss://chat.example/ws");
        assert_eq!(
            realtime_url("http://host:8080/chat/?session=1#top").unwrap(),
            "ws://host:8080/chat/ws"
        );
        assert_eq!(realtime_url("https://host/chat").unwrap(), "wss://host/chat/ws");
        assert!(realtime_url("ftp://host").is_err());
        assert!(realtime_url("localhost:5000").is_err());
        assert!(realtime_url("not a url").is_err());
    }

    /// One-connection server that answers `send_message` with an echo and a reply.
    async fn spawn_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(tcp).await.unwrap();

            while let Some(Ok(frame)) = socket.next().await {
                let Message::Text(text) = frame else {
                    continue;
                };
                let replies = match serde_json::from_str::<ClientEvent>(&text).unwrap() {
                    ClientEvent::SendMessage { message } => vec![
                        ServerEvent::ReceiveMessage {
                            message: message.clone(),
                            is_user: true,
                            message_id: "1".to_owned(),
                        },
                        ServerEvent::ReceiveMessage {
                            message: format!("echo: {message}"),
                            is_user: false,
                            message_id: "2".to_owned(),
                        },
                    ],
                    ClientEvent::ResetConversation => vec![ServerEvent::ConversationReset],
                };

                for reply in replies {
                    let payload = serde_json::to_string(&reply).unwrap();
                    socket.send(Message::Text(payload)).await.unwrap();
                }
            }
        });

        format!("ws://{addr}/ws")
    }

    #[tokio::test]
    async fn sends_client_events_and_yields_server_events() {
        let url = spawn_echo_server().await;
        let mut channel = RealtimeChannel::connect(&url).await.unwrap();

        channel
            .send(ClientEvent::SendMessage {
                message: "ping".to_owned(),
            })
            .unwrap();

        assert_eq!(
            channel.next_event().await,
            Some(ServerEvent::ReceiveMessage {
                message: "ping".to_owned(),
                is_user: true,
                message_id: "1".to_owned(),
            })
        );
        assert_eq!(
            channel.next_event().await,
            Some(ServerEvent::ReceiveMessage {
                message: "echo: ping".to_owned(),
                is_user: false,
                message_id: "2".to_owned(),
            })
        );

        channel.send(ClientEvent::ResetConversation).unwrap();
        assert_eq!(channel.next_event().await, Some(ServerEvent::ConversationReset));
    }
}
