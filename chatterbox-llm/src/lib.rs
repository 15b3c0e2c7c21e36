mod client;
pub mod prompt;

pub use client::{LlmService, reply_or_fallback};
