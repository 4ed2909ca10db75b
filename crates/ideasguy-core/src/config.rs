use std::{env, net::SocketAddr, path::PathBuf};

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: SocketAddr,
    pub model_provider: String,
    pub hf_model_name: String,
    pub hf_api_url: String,
    pub hf_api_token: Option<String>,
    pub vllm_base_url: String,
    pub vllm_api_key: Option<String>,
    pub vllm_model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub enable_cors: bool,
    pub static_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub characters_dir: PathBuf,
    pub system_prompt_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_owned());
        let http_bind = env::var("HTTP_BIND").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let http_bind = http_bind.parse()?;

        Ok(Self {
            http_bind,
            model_provider: env::var("MODEL_PROVIDER").unwrap_or_else(|_| "huggingface".to_owned()),
            hf_model_name: env::var("HF_MODEL_NAME").unwrap_or_else(|_| "distilgpt2".to_owned()),
            hf_api_url: env::var("HF_API_URL")
                .unwrap_or_else(|_| "https://api-inference.huggingface.co/models".to_owned()),
            hf_api_token: env::var("HF_API_TOKEN").ok(),
            vllm_base_url: env::var("VLLM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/v1".to_owned()),
            vllm_api_key: env::var("VLLM_API_KEY").ok(),
            vllm_model: env::var("VLLM_MODEL")
                .unwrap_or_else(|_| "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_owned()),
            max_new_tokens: env_parse("MAX_NEW_TOKENS", 128),
            temperature: env_parse("TEMPERATURE", 0.9),
            enable_cors: env_bool("ENABLE_CORS", true),
            static_dir: env_path("STATIC_DIR", "static"),
            assets_dir: env_path("ASSETS_DIR", "assets"),
            characters_dir: env_path("CHARACTERS_DIR", "characters"),
            system_prompt_path: env_path("SYSTEM_PROMPT_PATH", "persona/ideas_guy.system.md"),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            model_provider: "stub".to_owned(),
            hf_model_name: "distilgpt2".to_owned(),
            hf_api_url: "https://api-inference.huggingface.co/models".to_owned(),
            hf_api_token: None,
            vllm_base_url: "http://localhost:8000/v1".to_owned(),
            vllm_api_key: None,
            vllm_model: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_owned(),
            max_new_tokens: 128,
            temperature: 0.9,
            enable_cors: true,
            static_dir: PathBuf::from("static"),
            assets_dir: PathBuf::from("assets"),
            characters_dir: PathBuf::from("characters"),
            system_prompt_path: PathBuf::from("persona/ideas_guy.system.md"),
        }
    }
}

/// Static application metadata reported by `/config`.
#[derive(Debug, Clone, Serialize)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "Ideas Guy Chatbot",
            version: env!("CARGO_PKG_VERSION"),
            description: "Satirical 'ideas guy' personality chatbot",
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
