use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{GenerationRequest, ModelProvider};

/// Talks to a vLLM server through its OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct VllmProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl VllmProvider {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            model,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Value,
}

#[async_trait]
impl ModelProvider for VllmProvider {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String> {
        let model = request.model.as_deref().unwrap_or(self.model.as_str());

        let mut messages = vec![CompletionMessage {
            role: "system",
            content: &request.system_prompt,
        }];
        messages.extend(request.messages.iter().map(|message| CompletionMessage {
            role: message.role.as_str(),
            content: &message.content,
        }));

        let payload = ChatCompletionRequest {
            model,
            messages,
            max_tokens: request.max_new_tokens,
            temperature: request.temperature,
        };

        debug!(%model, "vllm chat completion");

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletionResponse>()
            .await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| extract_message_content(&choice.message.content))
            .ok_or_else(|| anyhow::anyhow!("model returned no choices"))?;

        Ok(content.trim().to_owned())
    }
}

fn extract_message_content(content: &Value) -> Option<String> {
    if let Some(text) = content.as_str() {
        return Some(text.to_owned());
    }

    let array = content.as_array()?;
    let joined = array
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
