use std::path::Path;

use anyhow::Context as _;
use axum::{
    Json,
    extract::{Multipart, State},
};
use chatterbox_core::AppState;
use chatterbox_database::impls::chat_messages::insert_chat_message;
use chatterbox_utils::{
    formatting::{UPLOAD_ACK, file_uploaded_message},
    protocol::UploadResponse,
    upload::{allowed_file, secure_filename, upload_url},
};
use tracing::info;

use crate::{ApiError, RouteMeta};

pub const META: RouteMeta = RouteMeta {
    method: "POST",
    path: "/upload",
    desc: "Upload a file (multipart field `file`).",
};

const FILE_FIELD: &str = "file";

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let filename = checked_filename(&original_name)?;
        let bytes = field.bytes().await?;

        store_upload(&state.uploads.dir, &filename, &bytes).await?;

        let file_url = upload_url(&filename);
        insert_chat_message(&state.db, &file_uploaded_message(&file_url), true).await?;
        info!(%file_url, size = bytes.len(), "file uploaded");

        return Ok(Json(UploadResponse {
            message: UPLOAD_ACK.to_owned(),
            file_url,
        }));
    }

    Err(ApiError::bad_request("No file part"))
}

fn checked_filename(original_name: &str) -> Result<String, ApiError> {
    if original_name.trim().is_empty() {
        return Err(ApiError::bad_request("No selected file"));
    }

    if !allowed_file(original_name) {
        return Err(ApiError::bad_request("File type not allowed"));
    }

    secure_filename(original_name)
        .filter(|name| allowed_file(name))
        .ok_or_else(|| ApiError::bad_request("File type not allowed"))
}

async fn store_upload(dir: &Path, filename: &str, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create upload directory {}", dir.display()))?;

    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write upload {}", path.display()))?;

    Ok(())
}
