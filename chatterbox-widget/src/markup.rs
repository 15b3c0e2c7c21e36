//! Markdown rendering for assistant replies. Raw HTML in the source is shown
//! as text, never passed through.

use pulldown_cmark::{CowStr, Event, Options, Parser, html};

/// Escape plain text for display (user messages).
pub fn escape_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    html::push_html(&mut out, std::iter::once(Event::Text(CowStr::Borrowed(source))));
    out
}

pub fn render_markup(source: &str) -> String {
    let events = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        // Single newlines in replies are meant as line breaks.
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, events);
    out.truncate(out.trim_end().len());
    out
}
