pub mod chat_messages;
