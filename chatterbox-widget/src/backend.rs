use std::future::Future;

use anyhow::Context as _;
use chatterbox_utils::protocol::{
    Ack, ChatRequest, ChatResponse, ErrorResponse, FeedbackRequest, HistoryEntry, UploadResponse,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Request/response side of the chat server.
pub trait ChatBackend {
    fn chat(&self, message: &str) -> impl Future<Output = anyhow::Result<ChatResponse>> + Send;

    fn reset(&self) -> impl Future<Output = anyhow::Result<Ack>> + Send;

    fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = anyhow::Result<UploadResponse>> + Send;

    fn feedback(
        &self,
        message_id: &str,
        is_like: Option<bool>,
    ) -> impl Future<Output = anyhow::Result<Ack>> + Send;

    fn history(&self) -> impl Future<Output = anyhow::Result<Vec<HistoryEntry>>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ChatBackend for HttpBackend {
    async fn chat(&self, message: &str) -> anyhow::Result<ChatResponse> {
        debug!(url = %self.url("/chat"), "sending chat request");
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest {
                message: message.to_owned(),
            })
            .send()
            .await
            .context("POST /chat failed")?;
        decode(response).await
    }

    async fn reset(&self) -> anyhow::Result<Ack> {
        let response = self
            .client
            .post(self.url("/reset_conversation"))
            .send()
            .await
            .context("POST /reset_conversation failed")?;
        decode(response).await
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> anyhow::Result<UploadResponse> {
        let part = Part::bytes(bytes).file_name(file_name.to_owned());
        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .context("POST /upload failed")?;
        decode(response).await
    }

    async fn feedback(&self, message_id: &str, is_like: Option<bool>) -> anyhow::Result<Ack> {
        let response = self
            .client
            .post(self.url("/feedback"))
            .json(&FeedbackRequest {
                message_id: message_id.to_owned(),
                is_like,
            })
            .send()
            .await
            .context("POST /feedback failed")?;
        decode(response).await
    }

    async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let response = self
            .client
            .get(self.url("/history"))
            .send()
            .await
            .context("GET /history failed")?;
        decode(response).await
    }
}

async fn decode<T>(response: reqwest::Response) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let url = response.url().path().to_owned();

    if !status.is_success() {
        let detail = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => "no error detail".to_owned(),
        };
        anyhow::bail!("{url} returned HTTP {status}: {detail}");
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("malformed response from {url}"))
}
