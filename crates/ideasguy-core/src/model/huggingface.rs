use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompt::build_prompt;

use super::{GenerationRequest, ModelProvider};

/// Plain text-generation against the Hugging Face inference API (or a
/// self-hosted text-generation-inference server exposing the same route).
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    api_url: String,
    api_token: Option<String>,
    model: String,
}

impl HuggingFaceProvider {
    pub fn new(api_url: String, api_token: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_token,
            model,
        }
    }
}

#[derive(Debug, Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: TextGenerationParameters,
}

#[derive(Debug, Serialize)]
struct TextGenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[async_trait]
impl ModelProvider for HuggingFaceProvider {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String> {
        let model = request.model.as_deref().unwrap_or(self.model.as_str());
        let prompt = build_prompt(&request.system_prompt, &request.messages);

        let payload = TextGenerationRequest {
            inputs: &prompt,
            parameters: TextGenerationParameters {
                max_new_tokens: request.max_new_tokens,
                temperature: request.temperature,
                do_sample: true,
                return_full_text: false,
            },
        };

        debug!(%model, prompt_len = prompt.len(), "huggingface text generation");

        let mut builder = self
            .client
            .post(format!("{}/{model}", self.api_url))
            .json(&payload);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let outputs = builder
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GeneratedText>>()
            .await?;

        let text = outputs
            .into_iter()
            .next()
            .map(|output| output.generated_text)
            .ok_or_else(|| anyhow::anyhow!("model returned no generations"))?;

        Ok(text.trim().to_owned())
    }
}
