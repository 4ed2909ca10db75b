use std::path::Path;

use tracing::debug;

use crate::types::{ChatMessage, ChatRole};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the satirical 'Ideas Guy': overconfident, rapid-fire ideas, but ultimately helpful and safe.";

/// Reads the persona prompt, falling back to the built-in Ideas Guy prompt
/// when the file is missing or unreadable.
pub async fn load_system_prompt(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents.trim().to_owned(),
        Err(error) => {
            debug!(path = %path.display(), ?error, "system prompt file unavailable; using default");
            DEFAULT_SYSTEM_PROMPT.to_owned()
        }
    }
}

/// Flattens a conversation into a completion prompt that ends on an open
/// `Assistant:` turn.
pub fn build_prompt(system_prompt: &str, messages: &[ChatMessage]) -> String {
    let preface =
        format!("System:\n{system_prompt}\n\nConversation (continue as the Assistant):\n");

    let mut lines = messages
        .iter()
        .map(|message| {
            let label = match message.role {
                ChatRole::User => "User",
                ChatRole::System | ChatRole::Assistant => "Assistant",
            };
            format!("{label}: {}", message.content.trim())
        })
        .collect::<Vec<_>>();

    if !lines.last().is_some_and(|line| line.starts_with("Assistant:")) {
        lines.push("Assistant:".to_owned());
    }

    preface + &lines.join("\n")
}
