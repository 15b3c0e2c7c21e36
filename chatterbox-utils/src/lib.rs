/// User-facing message texts shared by the server and the widget.
pub mod formatting;
/// Pure parser helpers.
pub mod parse;
/// Wire types for the HTTP endpoints and the real-time channel.
pub mod protocol;
/// Upload filename validation and sanitizing.
pub mod upload;
