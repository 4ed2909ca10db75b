use async_trait::async_trait;

use super::{GenerationRequest, ModelProvider};

pub const STUB_REPLY: &str = "Okay, picture this: a fridge that tweets your leftovers, a subscription for socks that never match, and an app that rates your ideas before you pitch them. Boom.";

/// Deterministic provider for tests and offline demos.
#[derive(Debug, Default)]
pub struct StubProvider;

#[async_trait]
impl ModelProvider for StubProvider {
    async fn generate(&self, _request: GenerationRequest) -> anyhow::Result<String> {
        Ok(STUB_REPLY.to_owned())
    }
}
