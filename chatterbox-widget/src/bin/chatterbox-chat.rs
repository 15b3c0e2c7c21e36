//! Terminal front end for the chat widget.
//!
//! Plain lines are sent as messages. Commands: `/reset`, `/history`,
//! `/upload <path>`, `/like <id>`, `/dislike <id>`, `/quit`.

use std::path::Path;

use anyhow::Context as _;
use chatterbox_utils::protocol::ServerEvent;
use chatterbox_widget::channel::EventReceiver;
use chatterbox_widget::{
    Author, Feedback, HttpBackend, MessageId, RealtimeChannel, RenderedMessage, View, Widget,
    WidgetConfig, realtime_url,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Prints transcript changes to stdout.
#[derive(Default)]
struct TerminalView;

impl TerminalView {
    fn print(&self, prefix: &str, message: &RenderedMessage) {
        let who = match message.author {
            Author::User => "you",
            Author::Bot => "bot",
        };
        let feedback = match message.feedback {
            Some(Feedback::Like) => " [+]",
            Some(Feedback::Dislike) => " [-]",
            None => "",
        };
        println!("{prefix}[{}] {who}: {}{feedback}", message.id, message.text);
    }
}

impl View for TerminalView {
    fn append_message(&mut self, message: &RenderedMessage) {
        self.print("", message);
    }

    fn update_message(&mut self, _previous_id: &MessageId, message: &RenderedMessage) {
        self.print("~ ", message);
    }

    fn clear_messages(&mut self) {
        println!("---- transcript cleared ----");
    }

    fn set_typing(&mut self, visible: bool) {
        if visible {
            println!("(bot is typing…)");
        }
    }

    fn clear_input(&mut self) {}

    fn scroll_to_bottom(&mut self) {}
}

enum Command<'a> {
    Send(&'a str),
    Reset,
    History,
    Upload(&'a str),
    Feedback(&'a str, Feedback),
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Command::Send(line);
    };

    let (name, argument) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "reset" => Command::Reset,
        "history" => Command::History,
        "upload" if !argument.is_empty() => Command::Upload(argument),
        "like" if !argument.is_empty() => Command::Feedback(argument, Feedback::Like),
        "dislike" if !argument.is_empty() => Command::Feedback(argument, Feedback::Dislike),
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(trimmed),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::WARN)
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let config = WidgetConfig::from_env();

    let mut widget = Widget::new(HttpBackend::new(config.base_url.clone()), TerminalView);

    let mut events = None;
    if config.realtime {
        let url = realtime_url(&config.base_url)?;
        match RealtimeChannel::connect(&url).await {
            Ok(channel) => {
                let (sender, receiver) = channel.into_parts();
                widget.attach_realtime(sender);
                events = Some(receiver);
            }
            Err(err) => warn!(?err, "real-time channel unavailable; using HTTP only"),
        }
    }

    widget.load_history().await;
    info!(base_url = %config.base_url, realtime = widget.is_realtime(), "chat ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut channel_closed = false;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Command::Send(text) => widget.submit(text).await,
                    Command::Reset => widget.reset().await,
                    Command::History => widget.load_history().await,
                    Command::Upload(path) => match read_upload(Path::new(path)).await {
                        Ok((name, bytes)) => widget.upload(&name, bytes).await,
                        Err(err) => eprintln!("{err:#}"),
                    },
                    Command::Feedback(raw_id, clicked) => match raw_id.parse::<MessageId>() {
                        Ok(id) => widget.toggle_feedback(&id, clicked).await,
                        Err(err) => eprintln!("{err:#}"),
                    },
                    Command::Quit => break,
                    Command::Unknown(input) => eprintln!("unknown command: {input}"),
                }
            }
            event = next_event(&mut events) => match event {
                Some(event) => {
                    let missed = matches!(event, ServerEvent::EventsMissed { .. });
                    widget.handle_event(event);
                    if missed {
                        widget.load_history().await;
                    }
                }
                None => channel_closed = true,
            },
        }

        if channel_closed {
            warn!("real-time channel closed; using HTTP only");
            events = None;
            channel_closed = false;
            widget.detach_realtime();
        }
    }

    Ok(())
}

async fn next_event(events: &mut Option<EventReceiver>) -> Option<ServerEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn read_upload(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?
        .to_owned();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((name, bytes))
}
