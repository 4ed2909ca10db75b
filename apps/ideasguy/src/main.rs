use std::sync::Arc;

use ideasguy_core::{
    characters::CharacterLibrary,
    config::AppConfig,
    http::{self, AppState},
    model::{HuggingFaceProvider, ProviderRegistry, StubProvider, VllmProvider},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let providers = build_providers(&config);
    let characters = CharacterLibrary::new(config.characters_dir.clone());

    if !config.characters_dir.exists() {
        warn!(
            dir = %config.characters_dir.display(),
            "CHARACTERS_DIR does not exist; /api/characters will be empty"
        );
    }
    if !config.static_dir.join("index.html").exists() {
        warn!(
            dir = %config.static_dir.display(),
            "no index.html in STATIC_DIR; serving fallback page at /"
        );
    }

    let http_bind = config.http_bind;
    let app = http::router(AppState {
        config: Arc::new(config),
        characters,
        providers,
    });
    let listener = TcpListener::bind(http_bind).await?;
    info!("Ideas Guy HTTP API listening on {}", http_bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

fn build_providers(config: &AppConfig) -> ProviderRegistry {
    let default = match config.model_provider.to_lowercase().as_str() {
        "stub" => {
            warn!("MODEL_PROVIDER=stub; replies are canned");
            "stub"
        }
        "huggingface" => {
            if config.hf_api_token.is_none() {
                warn!("HF_API_TOKEN not set; Hugging Face requests may be rate limited");
            }
            info!(model = %config.hf_model_name, "using Hugging Face model provider");
            "huggingface"
        }
        "vllm" => {
            info!(
                base_url = %config.vllm_base_url,
                model = %config.vllm_model,
                "using vLLM model provider"
            );
            "vllm"
        }
        other => {
            warn!(
                provider = %other,
                "unknown MODEL_PROVIDER value; valid values are huggingface|vllm|stub; falling back to stub"
            );
            "stub"
        }
    };

    ProviderRegistry::new(default)
        .with_provider("stub", Arc::new(StubProvider))
        .with_provider(
            "huggingface",
            Arc::new(HuggingFaceProvider::new(
                config.hf_api_url.clone(),
                config.hf_api_token.clone(),
                config.hf_model_name.clone(),
            )),
        )
        .with_provider(
            "vllm",
            Arc::new(VllmProvider::new(
                config.vllm_base_url.clone(),
                config.vllm_api_key.clone(),
                config.vllm_model.clone(),
            )),
        )
}
