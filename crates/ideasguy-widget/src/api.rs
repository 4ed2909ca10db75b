use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{Character, ChatReply, ChatTurnRequest, ModelOption};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with status {status}")]
    Status { status: u16 },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The four backend calls the widget makes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat(&self, request: &ChatTurnRequest) -> Result<ChatReply, ApiError>;

    async fn list_characters(&self) -> Result<Vec<Character>, ApiError>;

    async fn get_character(&self, id: &str) -> Result<Character, ApiError>;

    async fn list_models(&self) -> Result<Vec<ModelOption>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
}

impl HttpChatApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|error| ApiError::InvalidUrl(format!("{base_url}: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }
}

/// Non-success statuses fail before the body is read.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn chat(&self, request: &ChatTurnRequest) -> Result<ChatReply, ApiError> {
        let url = self.endpoint(&["api", "chat"])?;
        debug!(%url, "POST");
        let response = self.client.post(url).json(request).send().await?;
        read_json(response).await
    }

    async fn list_characters(&self) -> Result<Vec<Character>, ApiError> {
        self.get_json(&["api", "characters"]).await
    }

    async fn get_character(&self, id: &str) -> Result<Character, ApiError> {
        self.get_json(&["api", "characters", id]).await
    }

    async fn list_models(&self) -> Result<Vec<ModelOption>, ApiError> {
        self.get_json(&["api", "models"]).await
    }
}
