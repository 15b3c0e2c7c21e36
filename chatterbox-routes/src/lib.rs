pub mod conversation;
pub mod error;
pub mod files;
pub mod realtime;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use chatterbox_core::AppState;
use chatterbox_utils::upload::UPLOADS_ROUTE;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use error::ApiError;

pub struct RouteMeta {
    pub method: &'static str,
    pub path: &'static str,
    pub desc: &'static str,
}

pub const ROUTES: &[RouteMeta] = &[
    conversation::chat::META,
    conversation::reset::META,
    conversation::history::META,
    conversation::feedback::META,
    files::upload::META,
    files::UPLOADS_META,
    realtime::channel::META,
];

/// Build the application router. Request bodies are capped at the upload limit.
pub fn router(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes;
    let uploads = ServeDir::new(&state.uploads.dir);

    Router::new()
        .route(conversation::chat::META.path, post(conversation::chat::chat))
        .route(
            conversation::reset::META.path,
            post(conversation::reset::reset_conversation),
        )
        .route(
            conversation::history::META.path,
            get(conversation::history::history),
        )
        .route(
            conversation::feedback::META.path,
            post(conversation::feedback::feedback),
        )
        .route(files::upload::META.path, post(files::upload::upload))
        .route(realtime::channel::META.path, get(realtime::channel::channel))
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
