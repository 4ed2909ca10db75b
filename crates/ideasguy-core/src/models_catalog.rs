use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelOption {
    pub id: String,
    pub name: String,
    /// `vllm`, `huggingface` or `stub`.
    pub provider: String,
    #[serde(default)]
    pub note: String,
}

impl ModelOption {
    fn new(id: &str, name: &str, provider: &str, note: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            provider: provider.to_owned(),
            note: note.to_owned(),
        }
    }
}

pub fn recommended_models() -> Vec<ModelOption> {
    vec![
        // vLLM needs a separately running OpenAI-compatible server.
        ModelOption::new(
            "TinyLlama/TinyLlama-1.1B-Chat-v1.0",
            "TinyLlama 1.1B Chat",
            "vllm",
            "Small instruct model; good for demos",
        ),
        ModelOption::new(
            "Qwen/Qwen2.5-0.5B-Instruct",
            "Qwen2.5 0.5B Instruct",
            "vllm",
            "Very small instruct model",
        ),
        ModelOption::new(
            "microsoft/DialoGPT-small",
            "DialoGPT Small (HF)",
            "huggingface",
            "Dialogue-ish; simple text-generation",
        ),
        ModelOption::new("distilgpt2", "DistilGPT-2 (HF)", "huggingface", "Tiny baseline"),
        ModelOption::new("stub", "Stub Replies", "stub", "Fast, deterministic"),
    ]
}
