mod huggingface;
mod stub;
mod vllm;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::types::ChatMessage;

pub use huggingface::HuggingFaceProvider;
pub use stub::{STUB_REPLY, StubProvider};
pub use vllm::VllmProvider;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    /// Overrides the provider's configured model when set.
    pub model: Option<String>,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String>;
}

/// Providers keyed by their lowercase name, plus the one used when a chat
/// request does not pick one.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ModelProvider>>,
    default: String,
}

impl ProviderRegistry {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default: default.into().to_lowercase(),
        }
    }

    pub fn with_provider(mut self, name: &str, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.insert(name.to_lowercase(), provider);
        self
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(&name.to_lowercase()).cloned()
    }

    pub fn resolve(&self, requested: Option<&str>) -> anyhow::Result<Arc<dyn ModelProvider>> {
        let name = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default.as_str());
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("unknown model provider: {name}"))
    }
}
